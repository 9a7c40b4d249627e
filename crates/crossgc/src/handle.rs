//! Host reference handles and per-object bridge bookkeeping.
//!
//! A [`Handle`] is an opaque host-VM object reference tagged with its current
//! reference kind. Every bridged object owns exactly one
//! [`ReferenceControlBlock`], the mutable bookkeeping the bridge rewrites
//! during a pass and the managed side reads back afterwards.

use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

/// Host-VM reference kinds.
///
/// `Global` references root the object for the host collector. `Weak`
/// references are visible to but not rooted by it and can be invalidated by a
/// collection. `Local` references are call-frame scoped (temporary peers hold
/// one until the cross edges are wired). `Invalid` marks a handle whose
/// referent the host collector has reclaimed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleKind {
    /// Rooted host reference.
    Global,
    /// Non-rooting host reference, may be invalidated by collection.
    Weak,
    /// Call-frame scoped host reference.
    Local,
    /// The referent was reclaimed; the raw bits are kept for diagnostics only.
    Invalid,
}

/// Opaque host object reference value.
///
/// The bits are meaningful only to the [`HostObjectGateway`] that produced
/// them; the bridge never interprets them.
///
/// [`HostObjectGateway`]: crate::HostObjectGateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawObject(u64);

impl RawObject {
    /// Wraps a raw host reference value.
    #[must_use]
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    /// The raw host reference value.
    #[must_use]
    pub const fn bits(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RawObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// An opaque host object reference paired with its current kind tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Handle {
    raw: RawObject,
    kind: HandleKind,
}

impl Handle {
    /// Creates a handle from a raw reference and its kind.
    #[must_use]
    pub const fn new(raw: RawObject, kind: HandleKind) -> Self {
        Self { raw, kind }
    }

    /// The underlying raw host reference.
    #[must_use]
    pub const fn raw(self) -> RawObject {
        self.raw
    }

    /// The current reference kind.
    #[must_use]
    pub const fn kind(self) -> HandleKind {
        self.kind
    }
}

/// Mutable bookkeeping for one bridged object.
///
/// Owned jointly (via [`Arc`]) by the managed side and the snapshots it
/// submits. During a pass the running bridge pass is the exclusive mutator;
/// the managed side must not touch the block until the pass-finished callback
/// returns the snapshot.
pub struct ReferenceControlBlock {
    state: Mutex<ControlState>,
}

pub(crate) struct ControlState {
    /// The object's host handle. Global between passes, Weak mid-pass,
    /// Invalid once the host collector has reclaimed the object.
    pub(crate) handle: Handle,
    /// Number of synthetic edges injected into this object during the
    /// current pass. Reset to zero when the edges are cleared.
    pub(crate) refs_added: u32,
    /// Set when the host collector reclaimed the object.
    pub(crate) collected: bool,
}

impl ReferenceControlBlock {
    /// Creates a control block for an object currently held by a global
    /// reference, the state every bridged object is in between passes.
    #[must_use]
    pub fn new_global(raw: RawObject) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(ControlState {
                handle: Handle::new(raw, HandleKind::Global),
                refs_added: 0,
                collected: false,
            }),
        })
    }

    /// The current handle (raw reference + kind).
    #[must_use]
    pub fn handle(&self) -> Handle {
        self.state.lock().handle
    }

    /// The current handle kind.
    #[must_use]
    pub fn kind(&self) -> HandleKind {
        self.state.lock().handle.kind()
    }

    /// Number of synthetic edges injected during the current pass.
    #[must_use]
    pub fn refs_added(&self) -> u32 {
        self.state.lock().refs_added
    }

    /// Whether the host collector reclaimed this object.
    #[must_use]
    pub fn collected(&self) -> bool {
        self.state.lock().collected
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, ControlState> {
        self.state.lock()
    }
}

impl fmt::Debug for ReferenceControlBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ReferenceControlBlock")
            .field("handle", &state.handle)
            .field("refs_added", &state.refs_added)
            .field("collected", &state.collected)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{Handle, HandleKind, RawObject, ReferenceControlBlock};

    #[test]
    fn test_raw_object_round_trip() {
        let raw = RawObject::from_bits(0xdead_beef);
        assert_eq!(raw.bits(), 0xdead_beef);
        assert_eq!(format!("{raw}"), "0xdeadbeef");
    }

    #[test]
    fn test_new_control_block_is_global() {
        let block = ReferenceControlBlock::new_global(RawObject::from_bits(7));
        assert_eq!(block.kind(), HandleKind::Global);
        assert_eq!(block.refs_added(), 0);
        assert!(!block.collected());
    }

    #[test]
    fn test_handle_accessors() {
        let handle = Handle::new(RawObject::from_bits(42), HandleKind::Weak);
        assert_eq!(handle.raw().bits(), 42);
        assert_eq!(handle.kind(), HandleKind::Weak);
    }
}
