//! Pass phase one: reshape the snapshot into host-collectible form.
//!
//! During host collection an SCC has to behave like a single object. A
//! multi-member component is doctored into one by wiring a ring of synthetic
//! references through its members; an empty component gets a temporary peer
//! so cross edges have an attachment point. Once every edge is wired, all
//! global references are demoted to weak so the host collector sees true
//! reachability without the bridge's own retention.

use std::collections::HashMap;

use crate::bridge::PassSummary;
use crate::gateway::{CapabilityCache, HostObjectGateway, PeerCapability};
use crate::graph::{ObjectNode, Snapshot};
use crate::handle::{Handle, HandleKind, RawObject};
use crate::{logging, stats};

/// The side of a cross edge: either the component's first real member or, for
/// an empty component, its temporary peer.
enum CrossReferenceTarget<'snap> {
    Member(&'snap ObjectNode),
    Peer(RawObject),
}

impl CrossReferenceTarget<'_> {
    fn raw(&self) -> RawObject {
        match self {
            CrossReferenceTarget::Member(node) => node.control().handle().raw(),
            CrossReferenceTarget::Peer(peer) => *peer,
        }
    }

    /// Temporary peers need no bookkeeping; the whole object is discarded at
    /// the end of the pass.
    fn mark_refs_added(&self) {
        if let CrossReferenceTarget::Member(node) = self {
            node.control().lock().refs_added += 1;
        }
    }
}

pub(crate) struct ReferencePreparer<'a, G: HostObjectGateway + ?Sized> {
    gateway: &'a mut G,
    capabilities: &'a mut CapabilityCache,
    temporary_peers: HashMap<usize, RawObject>,
}

impl<'a, G: HostObjectGateway + ?Sized> ReferencePreparer<'a, G> {
    pub(crate) fn new(gateway: &'a mut G, capabilities: &'a mut CapabilityCache) -> Self {
        Self {
            gateway,
            capabilities,
            temporary_peers: HashMap::new(),
        }
    }

    pub(crate) fn run(mut self, snapshot: &Snapshot, summary: &mut PassSummary) {
        for (index, component) in snapshot.components().iter().enumerate() {
            match component.member_count() {
                0 => {
                    let peer = self.gateway.create_placeholder();
                    logging::peer_created(index, peer);
                    stats::record_temporary_peer();
                    self.temporary_peers.insert(index, peer);
                    summary.temporary_peers += 1;
                }
                1 => {} // already atomic under the host collector
                _ => self.add_circular_references(snapshot, component.members(), summary),
            }
        }

        for xref in snapshot.cross_references() {
            let from = self.target(snapshot, xref.source());
            let to = self.target(snapshot, xref.destination());
            if self.add_reference(from.raw(), to.raw(), summary) {
                from.mark_refs_added();
            }
        }

        // Cross edges are wired; the peers' local references can go.
        for (_, peer) in self.temporary_peers.drain() {
            self.gateway.delete_local(peer);
            logging::peer_released(peer);
        }

        for component in snapshot.components() {
            for &member in component.members() {
                self.take_weak_ref(&snapshot.nodes()[member]);
            }
        }
    }

    /// Wires the full ring `m_i -> m_(i+1 mod n)` so the host collector must
    /// treat the members as mutually reachable.
    fn add_circular_references(
        &mut self,
        snapshot: &Snapshot,
        members: &[usize],
        summary: &mut PassSummary,
    ) {
        for (position, &member) in members.iter().enumerate() {
            let from = &snapshot.nodes()[member];
            let to = &snapshot.nodes()[members[(position + 1) % members.len()]];
            let from_raw = from.control().handle().raw();
            let to_raw = to.control().handle().raw();
            if self.add_reference(from_raw, to_raw, summary) {
                from.control().lock().refs_added += 1;
            }
        }
    }

    fn target<'snap>(
        &self,
        snapshot: &'snap Snapshot,
        component_index: usize,
    ) -> CrossReferenceTarget<'snap> {
        let component = &snapshot.components()[component_index];
        if let Some(&first) = component.members().first() {
            CrossReferenceTarget::Member(&snapshot.nodes()[first])
        } else {
            let peer = self
                .temporary_peers
                .get(&component_index)
                .copied()
                .unwrap_or_else(|| {
                    panic!("no temporary peer recorded for empty component {component_index}")
                });
            CrossReferenceTarget::Peer(peer)
        }
    }

    /// Injects one synthetic reference, probing the source class for the
    /// applicable path. A dropped edge is recoverable: the component may end
    /// up under-linked on the host side, but bookkeeping stays consistent.
    fn add_reference(&mut self, from: RawObject, to: RawObject, summary: &mut PassSummary) -> bool {
        let class = self.gateway.object_class(from);
        match self.capabilities.resolve(self.gateway, class) {
            PeerCapability::FastInterface => self.gateway.fast_add_reference(from, to),
            PeerCapability::ReflectiveFallback => self.gateway.invoke_add_reference(from, to),
            PeerCapability::Unsupported => {
                let name = self.gateway.class_name(class);
                logging::edge_dropped(&name, "add_reference");
                stats::record_edge_dropped();
                summary.edges_dropped += 1;
                return false;
            }
        }
        stats::record_edge_added();
        summary.edges_added += 1;
        true
    }

    /// Demotes a node's global reference to a weak one.
    ///
    /// # Panics
    ///
    /// Panics if the node's handle is not Global — the algorithm owns every
    /// kind transition, so any other kind here means the handle graph is no
    /// longer interpretable.
    fn take_weak_ref(&mut self, node: &ObjectNode) {
        let mut state = node.control().lock();
        assert_eq!(
            state.handle.kind(),
            HandleKind::Global,
            "object {} entered demotion with a {:?} handle; expected Global",
            node.managed(),
            state.handle.kind(),
        );
        let global = state.handle.raw();
        let weak = self.gateway.downgrade_global(global);
        logging::weak_created(global, weak);
        stats::record_weak_created();
        state.handle = Handle::new(weak, HandleKind::Weak);
        self.gateway.delete_global(global);
        logging::global_dropped(global);
        stats::record_global_deleted();
    }
}
