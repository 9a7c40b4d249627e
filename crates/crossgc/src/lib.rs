//! A cross-heap garbage collection bridge.
//!
//! `crossgc` lets two independent, otherwise-unaware collectors — a
//! managed-runtime collector and a host VM's object collector — reclaim
//! object cycles that span both heaps. Neither collector can see edges that
//! cross the boundary; without coordination, cross-heap cycles leak forever.
//!
//! # How it works
//!
//! Once per mark phase the managed collector submits a [`Snapshot`]: its
//! strongly-connected components and the edges between them. A single
//! background pass then
//!
//! 1. **prepares** the graph — each multi-member component is wired into a
//!    ring of synthetic host references so the host collector must treat it
//!    as one object, empty components get a temporary placeholder peer, and
//!    every global reference is demoted to weak;
//! 2. **triggers** one forced host collection;
//! 3. **reconciles** the outcome — weak references are promoted back,
//!    survival is classified per object, each component is checked for a
//!    unanimous verdict, and synthetic references are cleared from survivors.
//!
//! The managed side observes results through the [`ReferenceControlBlock`]s
//! it shares with the bridge and through the pass-finished callback.
//!
//! # Quick start
//!
//! ```
//! use crossgc::testing::MockHost;
//! use crossgc::{
//!     CapabilityCache, Component, ManagedId, ObjectNode, ReferenceControlBlock, Snapshot,
//! };
//!
//! # use crossgc::HostObjectGateway;
//! let mut host = MockHost::new();
//! host.initialize().unwrap();
//! let peer = host.new_peer(host.conventional_class());
//! host.retain(peer); // something on the host side still holds it
//!
//! let control = ReferenceControlBlock::new_global(peer);
//! let snapshot = Snapshot::new(
//!     vec![ObjectNode::new(ManagedId::new(1), control.clone())],
//!     vec![Component::new(vec![0])],
//!     vec![],
//! );
//!
//! let summary = crossgc::run_pass(&mut host, &mut CapabilityCache::new(), &snapshot);
//! assert_eq!(summary.objects_resurrected, 1);
//! assert!(!control.collected());
//! ```
//!
//! In production the managed collector talks to [`BridgeCoordinator`]
//! instead, which owns a dedicated worker thread and a coalescing single-slot
//! mailbox.
//!
//! # Crash-only error handling
//!
//! A state the bridge can no longer interpret consistently — a malformed
//! snapshot, an unexpected handle kind, a split survival verdict inside one
//! component — has no safe recovery path: the bridge panics with a
//! diagnostic, and the coordinator worker turns any pass panic into a
//! process abort. Host-side misses (an object without reference methods, a
//! failing forced collection) are logged and degrade to a dropped edge or an
//! unknown outcome.

#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

mod bridge;
mod coordinator;
mod gateway;
mod graph;
mod handle;

pub mod logging;
pub mod stats;
pub mod testing;

pub use bridge::{run_pass, PassSummary};
pub use coordinator::{BridgeCoordinator, CollectorHooks};
pub use gateway::{
    CapabilityCache, ClassId, GatewayInitError, HostCollectError, HostObjectGateway,
    PeerCapability, ADD_REFERENCE_METHOD, ADD_REFERENCE_SIGNATURE, CLEAR_REFERENCES_METHOD,
    CLEAR_REFERENCES_SIGNATURE,
};
pub use graph::{Component, CrossReference, ManagedId, ObjectNode, Snapshot};
pub use handle::{Handle, HandleKind, RawObject, ReferenceControlBlock};
