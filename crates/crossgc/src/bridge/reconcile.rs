//! Pass phase three: reconcile host collection results into the handle graph.
//!
//! Every weak reference is promoted back to global; a promotion that yields
//! nothing means the host collector reclaimed the object. The ring wiring
//! from the prepare phase guarantees a component lives or dies as a unit, so
//! a split verdict within one component is a fatal consistency violation.

use crate::bridge::PassSummary;
use crate::gateway::{CapabilityCache, HostObjectGateway, PeerCapability};
use crate::graph::{ObjectNode, Snapshot};
use crate::handle::{Handle, HandleKind};
use crate::{logging, stats};

pub(crate) struct ReferenceReconciler<'a, G: HostObjectGateway + ?Sized> {
    gateway: &'a mut G,
    capabilities: &'a mut CapabilityCache,
}

impl<'a, G: HostObjectGateway + ?Sized> ReferenceReconciler<'a, G> {
    pub(crate) fn new(gateway: &'a mut G, capabilities: &'a mut CapabilityCache) -> Self {
        Self {
            gateway,
            capabilities,
        }
    }

    pub(crate) fn run(mut self, snapshot: &Snapshot, summary: &mut PassSummary) {
        // Promote everything first, then judge components: survival of a
        // member must not be observed before its peers have been tested.
        for component in snapshot.components() {
            for &member in component.members() {
                self.take_global_ref(&snapshot.nodes()[member]);
            }
        }

        for (index, component) in snapshot.components().iter().enumerate() {
            let members = component.members();
            let alive = members
                .iter()
                .filter(|&&member| !snapshot.nodes()[member].control().collected())
                .count();
            assert!(
                alive == 0 || alive == members.len(),
                "strongly connected component {index} has a split survival verdict \
                 ({alive} of {} members alive)",
                members.len(),
            );
            summary.objects_tested += members.len();
            if alive > 0 {
                summary.objects_resurrected += alive;
                for &member in members {
                    self.clear_references_if_needed(&snapshot.nodes()[member]);
                }
            }
        }
    }

    /// Promotes a node's weak reference back to global, or classifies the
    /// object as collected when the referent is gone.
    ///
    /// # Panics
    ///
    /// Panics if the node's handle is not Weak: reconciliation only runs
    /// against the demoted graph the prepare phase produced.
    fn take_global_ref(&mut self, node: &ObjectNode) {
        let mut state = node.control().lock();
        assert_eq!(
            state.handle.kind(),
            HandleKind::Weak,
            "object {} entered reconciliation with a {:?} handle; expected Weak",
            node.managed(),
            state.handle.kind(),
        );
        let weak = state.handle.raw();
        match self.gateway.upgrade_weak(weak) {
            Some(global) => {
                logging::weak_promoted(weak, global);
                stats::record_global_created();
                state.handle = Handle::new(global, HandleKind::Global);
            }
            None => {
                logging::weak_dead(weak);
                state.collected = true;
                // Raw bits kept for diagnostics; the reference itself is gone.
                state.handle = Handle::new(weak, HandleKind::Invalid);
            }
        }
        self.gateway.delete_weak(weak);
        logging::weak_dropped(weak);
        stats::record_weak_deleted();
    }

    /// Clears the synthetic references injected into a surviving object.
    ///
    /// # Panics
    ///
    /// Panics if the handle is not Global — survivors are promoted before
    /// components are judged, so anything else is a bookkeeping corruption.
    fn clear_references_if_needed(&mut self, node: &ObjectNode) {
        let mut state = node.control().lock();
        assert_eq!(
            state.handle.kind(),
            HandleKind::Global,
            "object {} reached clear-references with a {:?} handle; expected Global",
            node.managed(),
            state.handle.kind(),
        );
        if state.refs_added == 0 {
            return;
        }
        let raw = state.handle.raw();
        let class = self.gateway.object_class(raw);
        match self.capabilities.resolve(self.gateway, class) {
            PeerCapability::FastInterface => self.gateway.fast_clear_references(raw),
            PeerCapability::ReflectiveFallback => self.gateway.invoke_clear_references(raw),
            PeerCapability::Unsupported => {
                let name = self.gateway.class_name(class);
                logging::edge_dropped(&name, "clear_references");
            }
        }
        state.refs_added = 0;
    }
}
