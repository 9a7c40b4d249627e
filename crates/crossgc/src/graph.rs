//! The SCC/cross-reference snapshot consumed by one bridge pass.
//!
//! All object nodes live in one contiguous array owned by the snapshot;
//! components and cross references address them by index, so the only cycles
//! in the input are logical index-graph cycles, never ownership cycles.

use std::fmt;
use std::sync::Arc;

use crate::handle::ReferenceControlBlock;

/// Opaque managed-side object identity (a managed GC-handle value).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ManagedId(u64);

impl ManagedId {
    /// Wraps a managed GC-handle value.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw managed GC-handle value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ManagedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// One bridged object: a managed identity paired with its control block.
///
/// Created by the managed collector before a pass starts. The bridge never
/// allocates nodes; it only rewrites their control blocks.
#[derive(Debug, Clone)]
pub struct ObjectNode {
    managed: ManagedId,
    control: Arc<ReferenceControlBlock>,
}

impl ObjectNode {
    /// Pairs a managed identity with its control block.
    #[must_use]
    pub fn new(managed: ManagedId, control: Arc<ReferenceControlBlock>) -> Self {
        Self { managed, control }
    }

    /// The managed-side identity.
    #[must_use]
    pub fn managed(&self) -> ManagedId {
        self.managed
    }

    /// The object's control block.
    #[must_use]
    pub fn control(&self) -> &ReferenceControlBlock {
        &self.control
    }
}

/// A strongly connected component of the managed object graph.
///
/// Members are indices into the snapshot's node array. After reconciliation
/// all members must agree unanimously on survival; a split verdict is fatal.
#[derive(Debug, Clone)]
pub struct Component {
    members: Vec<usize>,
}

impl Component {
    /// Builds a component from node indices.
    #[must_use]
    pub fn new(members: Vec<usize>) -> Self {
        Self { members }
    }

    /// Node indices of the members.
    #[must_use]
    pub fn members(&self) -> &[usize] {
        &self.members
    }

    /// Number of members.
    #[must_use]
    pub fn member_count(&self) -> usize {
        self.members.len()
    }
}

/// An edge between components: some object in `source`'s component references
/// some object in `destination`'s component through the managed heap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrossReference {
    source: usize,
    destination: usize,
}

impl CrossReference {
    /// Builds a cross reference from component indices.
    #[must_use]
    pub const fn new(source: usize, destination: usize) -> Self {
        Self {
            source,
            destination,
        }
    }

    /// Index of the source component.
    #[must_use]
    pub const fn source(self) -> usize {
        self.source
    }

    /// Index of the destination component.
    #[must_use]
    pub const fn destination(self) -> usize {
        self.destination
    }
}

/// One managed mark phase's view of the cross-heap graph.
///
/// Produced by the managed collector, consumed by exactly one bridge pass.
/// Ownership moves into the bridge on submit and moves back through the
/// pass-finished callback; a snapshot superseded before processing is dropped.
#[derive(Debug)]
pub struct Snapshot {
    nodes: Vec<ObjectNode>,
    components: Vec<Component>,
    cross_references: Vec<CrossReference>,
}

impl Snapshot {
    /// Assembles a snapshot from its parts.
    #[must_use]
    pub fn new(
        nodes: Vec<ObjectNode>,
        components: Vec<Component>,
        cross_references: Vec<CrossReference>,
    ) -> Self {
        Self {
            nodes,
            components,
            cross_references,
        }
    }

    /// All bridged objects, in managed enumeration order.
    #[must_use]
    pub fn nodes(&self) -> &[ObjectNode] {
        &self.nodes
    }

    /// The strongly connected components.
    #[must_use]
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// The component-to-component edges.
    #[must_use]
    pub fn cross_references(&self) -> &[CrossReference] {
        &self.cross_references
    }

    /// Validates structural integrity before a pass touches any handle.
    ///
    /// # Panics
    ///
    /// Panics on a malformed snapshot: a member index out of range, a node
    /// claimed by two components, or a cross reference naming a component
    /// that does not exist. The bridge cannot interpret such a graph and the
    /// process must not continue with it.
    pub(crate) fn validate(&self) {
        let mut claimed = vec![false; self.nodes.len()];
        for (index, component) in self.components.iter().enumerate() {
            for &member in component.members() {
                assert!(
                    member < self.nodes.len(),
                    "component {index} references node {member} but the snapshot has {} nodes",
                    self.nodes.len(),
                );
                assert!(
                    !claimed[member],
                    "node {member} is a member of more than one component",
                );
                claimed[member] = true;
            }
        }
        for (index, xref) in self.cross_references.iter().enumerate() {
            assert!(
                xref.source() < self.components.len() && xref.destination() < self.components.len(),
                "cross reference {index} ({} -> {}) names a component out of range ({} components)",
                xref.source(),
                xref.destination(),
                self.components.len(),
            );
        }
    }
}
