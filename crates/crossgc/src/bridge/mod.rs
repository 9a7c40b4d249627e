//! One bridge pass: prepare, trigger, reconcile.

mod prepare;
mod reconcile;

use crate::gateway::{CapabilityCache, HostObjectGateway};
use crate::graph::Snapshot;
use crate::{logging, stats};

use prepare::ReferencePreparer;
use reconcile::ReferenceReconciler;

/// What one pass did, delivered to the pass-finished hook and logged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    /// Objects whose survival was tested.
    pub objects_tested: usize,
    /// Objects that survived the host collection.
    pub objects_resurrected: usize,
    /// Temporary peers created for empty components.
    pub temporary_peers: usize,
    /// Synthetic references wired (ring and cross edges).
    pub edges_added: usize,
    /// Synthetic references dropped for lack of an applicable method.
    pub edges_dropped: usize,
}

/// Runs one synchronous bridge pass over a snapshot.
///
/// This is the whole algorithm: validate the snapshot, reshape it into
/// host-collectible form, force one host collection, and reconcile the
/// results into the control blocks. The [`BridgeCoordinator`] worker is a
/// loop over this function; embedders that manage their own threading can
/// call it directly, provided passes never overlap and the gateway was
/// initialized on the calling thread.
///
/// # Panics
///
/// Panics on the fatal conditions the bridge cannot continue past: a
/// malformed snapshot, a control block holding an unexpected handle kind, or
/// a split survival verdict within one component.
///
/// [`BridgeCoordinator`]: crate::BridgeCoordinator
pub fn run_pass<G>(
    gateway: &mut G,
    capabilities: &mut CapabilityCache,
    snapshot: &Snapshot,
) -> PassSummary
where
    G: HostObjectGateway + ?Sized,
{
    snapshot.validate();
    let mut summary = PassSummary::default();
    ReferencePreparer::new(gateway, capabilities).run(snapshot, &mut summary);
    trigger_collection(gateway);
    ReferenceReconciler::new(gateway, capabilities).run(snapshot, &mut summary);
    logging::pass_summary(summary.objects_tested, summary.objects_resurrected);
    stats::record_pass(summary.objects_tested, summary.objects_resurrected);
    summary
}

/// Forces one host collection. A host-side error is logged and swallowed:
/// the outcome is unknown, and reconciliation simply finds every weak
/// reference still resolvable.
fn trigger_collection<G: HostObjectGateway + ?Sized>(gateway: &mut G) {
    if let Err(err) = gateway.collect() {
        tracing::warn!(
            target: "crossgc::bridge",
            error = %err,
            "forced host collection failed; continuing with outcome unknown"
        );
    }
}
