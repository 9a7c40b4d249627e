//! The capability surface over the host VM object model.
//!
//! [`HostObjectGateway`] is the trait seam the bridge drives: single-object
//! reference management, placeholder creation, method probing, and the forced
//! collection entry point. The bridge owns the *call pattern* — which probe
//! runs, in what order, and how results are cached — while the gateway owns
//! the host-specific mechanics.

use std::collections::HashMap;
use std::error::Error;
use std::fmt;

use crate::handle::RawObject;
use crate::logging;

/// Conventional instance method wiring one synthetic reference.
pub const ADD_REFERENCE_METHOD: &str = "addReference";
/// Signature of [`ADD_REFERENCE_METHOD`].
pub const ADD_REFERENCE_SIGNATURE: &str = "(Ljava/lang/Object;)V";
/// Conventional instance method dropping all synthetic references.
pub const CLEAR_REFERENCES_METHOD: &str = "clearReferences";
/// Signature of [`CLEAR_REFERENCES_METHOD`].
pub const CLEAR_REFERENCES_SIGNATURE: &str = "()V";

/// Identifies a host runtime class, for capability caching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassId(u64);

impl ClassId {
    /// Wraps a raw class identity value.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw class identity value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// How synthetic references are wired for a given runtime class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerCapability {
    /// The class implements the known fast-peer interface; call its
    /// dedicated entry points directly.
    FastInterface,
    /// Both conventional methods resolve by name and signature; invoke them.
    ReflectiveFallback,
    /// Neither path resolves; edges from objects of this class are dropped.
    Unsupported,
}

/// Gateway start-up failure.
///
/// Raised when the one-shot initialization cannot resolve what the bridge
/// cannot run without (most importantly the placeholder constructor). The
/// coordinator treats this as fatal.
#[derive(Debug)]
pub struct GatewayInitError {
    message: String,
}

impl GatewayInitError {
    /// Creates an initialization error with a diagnostic message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for GatewayInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gateway initialization failed: {}", self.message)
    }
}

impl Error for GatewayInitError {}

/// The host collector's forced-collection entry point failed.
///
/// Never fatal: the pass continues and treats the outcome as unknown.
#[derive(Debug)]
pub struct HostCollectError {
    message: String,
}

impl HostCollectError {
    /// Creates a collection error with a diagnostic message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for HostCollectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "host collection failed: {}", self.message)
    }
}

impl Error for HostCollectError {}

/// Thin capability surface over the host VM object model.
///
/// A gateway is constructed *on* the bridge worker thread and never leaves
/// it — host environment handles are thread-affine, and the factory-closure
/// construction in [`BridgeCoordinator::spawn`] makes that a compile-time
/// property rather than a runtime discipline.
///
/// Reference-management methods mirror the host's semantics: upgrading a weak
/// reference yields `None` once the referent has been collected, and every
/// reference created must eventually be deleted through the matching
/// `delete_*` call.
///
/// [`BridgeCoordinator::spawn`]: crate::BridgeCoordinator::spawn
pub trait HostObjectGateway {
    /// One-shot start-up resolution: the placeholder constructor and the
    /// fast-peer interface. Called once before the first pass; failure is
    /// fatal to the bridge.
    fn initialize(&mut self) -> Result<(), GatewayInitError>;

    /// Creates a global reference from a weak one, or `None` if the referent
    /// was collected.
    fn upgrade_weak(&mut self, weak: RawObject) -> Option<RawObject>;

    /// Creates a weak reference from a global one.
    fn downgrade_global(&mut self, global: RawObject) -> RawObject;

    /// Drops a global reference.
    fn delete_global(&mut self, global: RawObject);

    /// Drops a weak reference.
    fn delete_weak(&mut self, weak: RawObject);

    /// Drops a local reference.
    fn delete_local(&mut self, local: RawObject);

    /// Instantiates the empty-component placeholder type, returning a local
    /// reference.
    fn create_placeholder(&mut self) -> RawObject;

    /// The runtime class of an object.
    fn object_class(&mut self, object: RawObject) -> ClassId;

    /// Human-readable class name, for diagnostics only.
    fn class_name(&mut self, class: ClassId) -> String;

    /// Whether the class implements the fast-peer interface.
    fn implements_fast_peer(&mut self, class: ClassId) -> bool;

    /// Whether an instance method with this name and signature resolves on
    /// the class.
    fn resolves_method(&mut self, class: ClassId, name: &str, signature: &str) -> bool;

    /// Adds a synthetic reference through the fast-peer interface.
    fn fast_add_reference(&mut self, from: RawObject, to: RawObject);

    /// Adds a synthetic reference through the conventional method.
    fn invoke_add_reference(&mut self, from: RawObject, to: RawObject);

    /// Clears synthetic references through the fast-peer interface.
    fn fast_clear_references(&mut self, object: RawObject);

    /// Clears synthetic references through the conventional method.
    fn invoke_clear_references(&mut self, object: RawObject);

    /// Triggers one forced host collection.
    ///
    /// # Errors
    ///
    /// Returns an error when the host collector raised one; the caller logs
    /// it and continues with the collection outcome unknown.
    fn collect(&mut self) -> Result<(), HostCollectError>;
}

/// Per-class probe results, resolved once and reused for every object of the
/// class in every subsequent pass.
#[derive(Debug, Default)]
pub struct CapabilityCache {
    classes: HashMap<ClassId, PeerCapability>,
}

impl CapabilityCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The capability for `class`, probing the gateway on first sight.
    ///
    /// The probe order is fixed: the fast-peer interface wins when present;
    /// otherwise the class qualifies for the reflective fallback only if
    /// *both* conventional methods resolve — an edge the bridge could add but
    /// never clear would leave permanent synthetic references on survivors.
    pub fn resolve<G>(&mut self, gateway: &mut G, class: ClassId) -> PeerCapability
    where
        G: HostObjectGateway + ?Sized,
    {
        if let Some(&capability) = self.classes.get(&class) {
            return capability;
        }
        let capability = if gateway.implements_fast_peer(class) {
            PeerCapability::FastInterface
        } else if gateway.resolves_method(class, ADD_REFERENCE_METHOD, ADD_REFERENCE_SIGNATURE)
            && gateway.resolves_method(class, CLEAR_REFERENCES_METHOD, CLEAR_REFERENCES_SIGNATURE)
        {
            PeerCapability::ReflectiveFallback
        } else {
            PeerCapability::Unsupported
        };
        logging::class_probed(class, capability);
        self.classes.insert(class, capability);
        capability
    }

    /// Number of classes probed so far.
    #[must_use]
    pub fn probed_classes(&self) -> usize {
        self.classes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::{CapabilityCache, PeerCapability};
    use crate::testing::MockHost;

    #[test]
    fn test_fast_peer_wins_over_conventional_methods() {
        let mut host = MockHost::new();
        let mut cache = CapabilityCache::new();
        let class = host.fast_peer_class();
        assert_eq!(
            cache.resolve(&mut host, class),
            PeerCapability::FastInterface
        );
    }

    #[test]
    fn test_conventional_class_uses_reflective_fallback() {
        let mut host = MockHost::new();
        let mut cache = CapabilityCache::new();
        let class = host.conventional_class();
        assert_eq!(
            cache.resolve(&mut host, class),
            PeerCapability::ReflectiveFallback
        );
    }

    #[test]
    fn test_add_only_class_is_unsupported() {
        let mut host = MockHost::new();
        let mut cache = CapabilityCache::new();
        let class = host.register_class("AddOnlyPeer", false, true, false);
        assert_eq!(cache.resolve(&mut host, class), PeerCapability::Unsupported);
    }

    #[test]
    fn test_probe_runs_once_per_class() {
        let mut host = MockHost::new();
        let mut cache = CapabilityCache::new();
        let class = host.conventional_class();
        cache.resolve(&mut host, class);
        cache.resolve(&mut host, class);
        cache.resolve(&mut host, class);
        assert_eq!(host.probe_count(class), 1);
        assert_eq!(cache.probed_classes(), 1);
    }
}
