//! An in-memory host VM for exercising the bridge without a real one.
//!
//! [`MockHost`] models exactly what the bridge can observe through the
//! gateway: a table of objects with per-kind reference counts, per-class
//! method capabilities, and a forced collection with *stipulated* outcomes —
//! an object survives a collection if it is rooted (global or local
//! reference) or explicitly retained, mirroring "something on the host side
//! still holds it". Semantically interesting calls are recorded for trace
//! assertions.

use std::collections::HashMap;

use crate::gateway::{
    ClassId, GatewayInitError, HostCollectError, HostObjectGateway, ADD_REFERENCE_METHOD,
    ADD_REFERENCE_SIGNATURE, CLEAR_REFERENCES_METHOD, CLEAR_REFERENCES_SIGNATURE,
};
use crate::handle::{HandleKind, RawObject};

/// Which dispatch path served a recorded call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallPath {
    /// The fast-peer interface entry point.
    Fast,
    /// The conventionally-named instance method.
    Reflective,
}

/// One recorded gateway call. Object fields are mock object identities, not
/// handle bits, so assertions survive handle churn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostCall {
    /// A temporary peer was instantiated.
    CreatePlaceholder {
        /// Identity of the new placeholder object.
        object: u64,
    },
    /// A synthetic reference was wired.
    AddReference {
        /// Source object identity.
        from: u64,
        /// Destination object identity.
        to: u64,
        /// Dispatch path used.
        via: CallPath,
    },
    /// Synthetic references were cleared.
    ClearReferences {
        /// Target object identity.
        object: u64,
        /// Dispatch path used.
        via: CallPath,
    },
    /// The forced collection entry point ran.
    Collect,
}

struct ClassSpec {
    name: String,
    fast_peer: bool,
    has_add: bool,
    has_clear: bool,
}

struct MockObject {
    class: ClassId,
    global: u32,
    weak: u32,
    local: u32,
    retained: bool,
    freed: bool,
    edges: Vec<u64>,
}

struct HandleEntry {
    object: u64,
    kind: HandleKind,
    live: bool,
}

/// In-memory host VM implementing [`HostObjectGateway`].
pub struct MockHost {
    next_id: u64,
    classes: HashMap<u64, ClassSpec>,
    objects: HashMap<u64, MockObject>,
    handles: HashMap<u64, HandleEntry>,
    calls: Vec<HostCall>,
    probe_counts: HashMap<u64, usize>,
    collect_error: Option<String>,
    placeholder_available: bool,
    initialized: bool,
    fast_class: ClassId,
    conventional_class: ClassId,
    plain_class: ClassId,
    placeholder_class: ClassId,
}

impl Default for MockHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MockHost {
    /// Creates a host with the three stock peer classes plus the placeholder
    /// class pre-registered.
    #[must_use]
    pub fn new() -> Self {
        let mut host = Self {
            next_id: 1,
            classes: HashMap::new(),
            objects: HashMap::new(),
            handles: HashMap::new(),
            calls: Vec::new(),
            probe_counts: HashMap::new(),
            collect_error: None,
            placeholder_available: true,
            initialized: false,
            fast_class: ClassId::new(0),
            conventional_class: ClassId::new(0),
            plain_class: ClassId::new(0),
            placeholder_class: ClassId::new(0),
        };
        host.fast_class = host.register_class("FastPeer", true, true, true);
        host.conventional_class = host.register_class("ConventionalPeer", false, true, true);
        host.plain_class = host.register_class("PlainObject", false, false, false);
        host.placeholder_class = host.register_class("EmptyComponentPeer", false, true, true);
        host
    }

    /// Registers a class with the given method capabilities.
    pub fn register_class(
        &mut self,
        name: &str,
        fast_peer: bool,
        has_add: bool,
        has_clear: bool,
    ) -> ClassId {
        let id = self.allocate_id();
        self.classes.insert(
            id,
            ClassSpec {
                name: name.to_owned(),
                fast_peer,
                has_add,
                has_clear,
            },
        );
        ClassId::new(id)
    }

    /// The stock class implementing the fast-peer interface.
    #[must_use]
    pub fn fast_peer_class(&self) -> ClassId {
        self.fast_class
    }

    /// The stock class exposing only the conventional methods.
    #[must_use]
    pub fn conventional_class(&self) -> ClassId {
        self.conventional_class
    }

    /// The stock class with no reference methods at all.
    #[must_use]
    pub fn plain_class(&self) -> ClassId {
        self.plain_class
    }

    /// Creates a host object of `class` held by one global reference — the
    /// state a bridged peer is in between passes.
    pub fn new_peer(&mut self, class: ClassId) -> RawObject {
        let object = self.allocate_id();
        self.objects.insert(
            object,
            MockObject {
                class,
                global: 1,
                weak: 0,
                local: 0,
                retained: false,
                freed: false,
                edges: Vec::new(),
            },
        );
        self.new_handle(object, HandleKind::Global)
    }

    /// Marks an object as surviving future collections regardless of
    /// bridge-visible roots (something else on the host side holds it).
    pub fn retain(&mut self, handle: RawObject) {
        let object = self.object_of(handle);
        self.objects.get_mut(&object).expect("unknown object").retained = true;
    }

    /// The mock object identity behind a handle.
    #[must_use]
    pub fn object_of(&self, handle: RawObject) -> u64 {
        self.handles
            .get(&handle.bits())
            .unwrap_or_else(|| panic!("unknown handle {handle}"))
            .object
    }

    /// Whether the object was reclaimed by a collection.
    #[must_use]
    pub fn is_freed(&self, object: u64) -> bool {
        self.objects.get(&object).expect("unknown object").freed
    }

    /// Synthetic edges currently recorded on an object.
    #[must_use]
    pub fn edges(&self, object: u64) -> &[u64] {
        &self.objects.get(&object).expect("unknown object").edges
    }

    /// `(global, weak, local)` reference counts of an object.
    #[must_use]
    pub fn ref_counts(&self, object: u64) -> (u32, u32, u32) {
        let object = self.objects.get(&object).expect("unknown object");
        (object.global, object.weak, object.local)
    }

    /// Number of live handles of any kind.
    #[must_use]
    pub fn live_handle_count(&self) -> usize {
        self.handles.values().filter(|entry| entry.live).count()
    }

    /// Everything recorded so far.
    #[must_use]
    pub fn calls(&self) -> &[HostCall] {
        &self.calls
    }

    /// Recorded `(from, to)` pairs of wired references, in call order.
    #[must_use]
    pub fn add_reference_calls(&self) -> Vec<(u64, u64)> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                HostCall::AddReference { from, to, .. } => Some((*from, *to)),
                _ => None,
            })
            .collect()
    }

    /// Recorded clear-references targets, in call order.
    #[must_use]
    pub fn clear_references_calls(&self) -> Vec<u64> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                HostCall::ClearReferences { object, .. } => Some(*object),
                _ => None,
            })
            .collect()
    }

    /// How many times the class was probed for the fast-peer interface.
    #[must_use]
    pub fn probe_count(&self, class: ClassId) -> usize {
        self.probe_counts.get(&class.get()).copied().unwrap_or(0)
    }

    /// Makes the next forced collection fail with `message`.
    pub fn fail_next_collect(&mut self, message: &str) {
        self.collect_error = Some(message.to_owned());
    }

    /// Simulates a host missing the placeholder constructor; initialization
    /// will fail.
    pub fn remove_placeholder_constructor(&mut self) {
        self.placeholder_available = false;
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn new_handle(&mut self, object: u64, kind: HandleKind) -> RawObject {
        let bits = self.allocate_id();
        self.handles.insert(
            bits,
            HandleEntry {
                object,
                kind,
                live: true,
            },
        );
        RawObject::from_bits(bits)
    }

    fn live_entry(&self, handle: RawObject, expected: HandleKind) -> &HandleEntry {
        let entry = self
            .handles
            .get(&handle.bits())
            .unwrap_or_else(|| panic!("unknown handle {handle}"));
        assert!(entry.live, "use of dead handle {handle}");
        assert_eq!(entry.kind, expected, "handle {handle} has the wrong kind");
        entry
    }

    fn kill_handle(&mut self, handle: RawObject, expected: HandleKind) -> u64 {
        let object = self.live_entry(handle, expected).object;
        self.handles.get_mut(&handle.bits()).expect("unknown handle").live = false;
        let counts = self.objects.get_mut(&object).expect("unknown object");
        match expected {
            HandleKind::Global => counts.global -= 1,
            HandleKind::Weak => counts.weak -= 1,
            HandleKind::Local => counts.local -= 1,
            HandleKind::Invalid => unreachable!("invalid handles are never deleted"),
        }
        object
    }

    fn object_behind(&self, handle: RawObject) -> u64 {
        let entry = self
            .handles
            .get(&handle.bits())
            .unwrap_or_else(|| panic!("unknown handle {handle}"));
        assert!(entry.live, "use of dead handle {handle}");
        entry.object
    }
}

impl HostObjectGateway for MockHost {
    fn initialize(&mut self) -> Result<(), GatewayInitError> {
        if !self.placeholder_available {
            return Err(GatewayInitError::new(
                "empty-component placeholder constructor not found",
            ));
        }
        self.initialized = true;
        Ok(())
    }

    fn upgrade_weak(&mut self, weak: RawObject) -> Option<RawObject> {
        let object = self.live_entry(weak, HandleKind::Weak).object;
        if self.objects.get(&object).expect("unknown object").freed {
            return None;
        }
        self.objects.get_mut(&object).expect("unknown object").global += 1;
        Some(self.new_handle(object, HandleKind::Global))
    }

    fn downgrade_global(&mut self, global: RawObject) -> RawObject {
        let object = self.live_entry(global, HandleKind::Global).object;
        self.objects.get_mut(&object).expect("unknown object").weak += 1;
        self.new_handle(object, HandleKind::Weak)
    }

    fn delete_global(&mut self, global: RawObject) {
        self.kill_handle(global, HandleKind::Global);
    }

    fn delete_weak(&mut self, weak: RawObject) {
        self.kill_handle(weak, HandleKind::Weak);
    }

    fn delete_local(&mut self, local: RawObject) {
        self.kill_handle(local, HandleKind::Local);
    }

    fn create_placeholder(&mut self) -> RawObject {
        assert!(self.initialized, "create_placeholder before initialize");
        let object = self.allocate_id();
        let class = self.placeholder_class;
        self.objects.insert(
            object,
            MockObject {
                class,
                global: 0,
                weak: 0,
                local: 1,
                retained: false,
                freed: false,
                edges: Vec::new(),
            },
        );
        self.calls.push(HostCall::CreatePlaceholder { object });
        self.new_handle(object, HandleKind::Local)
    }

    fn object_class(&mut self, object: RawObject) -> ClassId {
        let object = self.object_behind(object);
        self.objects.get(&object).expect("unknown object").class
    }

    fn class_name(&mut self, class: ClassId) -> String {
        self.classes
            .get(&class.get())
            .map_or_else(|| format!("<class {:#x}>", class.get()), |spec| spec.name.clone())
    }

    fn implements_fast_peer(&mut self, class: ClassId) -> bool {
        *self.probe_counts.entry(class.get()).or_insert(0) += 1;
        self.classes.get(&class.get()).is_some_and(|spec| spec.fast_peer)
    }

    fn resolves_method(&mut self, class: ClassId, name: &str, signature: &str) -> bool {
        let Some(spec) = self.classes.get(&class.get()) else {
            return false;
        };
        match (name, signature) {
            (ADD_REFERENCE_METHOD, ADD_REFERENCE_SIGNATURE) => spec.has_add,
            (CLEAR_REFERENCES_METHOD, CLEAR_REFERENCES_SIGNATURE) => spec.has_clear,
            _ => false,
        }
    }

    fn fast_add_reference(&mut self, from: RawObject, to: RawObject) {
        let from = self.object_behind(from);
        let to = self.object_behind(to);
        self.objects.get_mut(&from).expect("unknown object").edges.push(to);
        self.calls.push(HostCall::AddReference {
            from,
            to,
            via: CallPath::Fast,
        });
    }

    fn invoke_add_reference(&mut self, from: RawObject, to: RawObject) {
        let from = self.object_behind(from);
        let to = self.object_behind(to);
        self.objects.get_mut(&from).expect("unknown object").edges.push(to);
        self.calls.push(HostCall::AddReference {
            from,
            to,
            via: CallPath::Reflective,
        });
    }

    fn fast_clear_references(&mut self, object: RawObject) {
        let object = self.object_behind(object);
        self.objects.get_mut(&object).expect("unknown object").edges.clear();
        self.calls.push(HostCall::ClearReferences {
            object,
            via: CallPath::Fast,
        });
    }

    fn invoke_clear_references(&mut self, object: RawObject) {
        let object = self.object_behind(object);
        self.objects.get_mut(&object).expect("unknown object").edges.clear();
        self.calls.push(HostCall::ClearReferences {
            object,
            via: CallPath::Reflective,
        });
    }

    fn collect(&mut self) -> Result<(), HostCollectError> {
        self.calls.push(HostCall::Collect);
        if let Some(message) = self.collect_error.take() {
            return Err(HostCollectError::new(message));
        }
        for object in self.objects.values_mut() {
            if !object.retained && object.global == 0 && object.local == 0 {
                object.freed = true;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{HostObjectGateway, MockHost};

    #[test]
    fn test_unrooted_object_is_freed_by_collect() {
        let mut host = MockHost::new();
        let peer = host.new_peer(host.conventional_class());
        let object = host.object_of(peer);
        let weak = host.downgrade_global(peer);
        host.delete_global(peer);
        host.collect().unwrap();
        assert!(host.is_freed(object));
        assert!(host.upgrade_weak(weak).is_none());
    }

    #[test]
    fn test_retained_object_survives_collect() {
        let mut host = MockHost::new();
        let peer = host.new_peer(host.conventional_class());
        host.retain(peer);
        let object = host.object_of(peer);
        let weak = host.downgrade_global(peer);
        host.delete_global(peer);
        host.collect().unwrap();
        assert!(!host.is_freed(object));
        assert!(host.upgrade_weak(weak).is_some());
    }

    #[test]
    #[should_panic(expected = "use of dead handle")]
    fn test_dead_handle_use_is_rejected() {
        let mut host = MockHost::new();
        let peer = host.new_peer(host.conventional_class());
        host.delete_global(peer);
        let _ = host.downgrade_global(peer);
    }

    #[test]
    fn test_placeholder_requires_initialization() {
        let mut host = MockHost::new();
        host.initialize().unwrap();
        let peer = host.create_placeholder();
        let object = host.object_of(peer);
        assert_eq!(host.ref_counts(object), (0, 0, 1));
        host.delete_local(peer);
        assert_eq!(host.ref_counts(object), (0, 0, 0));
    }

    #[test]
    fn test_missing_placeholder_fails_initialization() {
        let mut host = MockHost::new();
        host.remove_placeholder_constructor();
        assert!(host.initialize().is_err());
    }

    #[test]
    fn test_handle_kinds_are_tracked() {
        let mut host = MockHost::new();
        let peer = host.new_peer(host.fast_peer_class());
        let weak = host.downgrade_global(peer);
        let object = host.object_of(weak);
        assert_eq!(host.ref_counts(object), (1, 1, 0));
        host.delete_global(peer);
        host.retain(weak);
        host.collect().unwrap();
        let global = host.upgrade_weak(weak).unwrap();
        host.delete_weak(weak);
        assert_eq!(host.ref_counts(object), (1, 0, 0));
        host.delete_global(global);
    }
}
