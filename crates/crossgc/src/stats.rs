//! Process-wide bridge operation counters.
//!
//! Monotonic totals of the reference operations the bridge has performed
//! since process start. Unlike a runtime that owns every host reference in
//! the process, the bridge only sees its own transitions, so these are
//! operation counts rather than live-reference gauges.

use std::sync::atomic::{AtomicU64, Ordering};

static WEAK_REFS_CREATED: AtomicU64 = AtomicU64::new(0);
static WEAK_REFS_DELETED: AtomicU64 = AtomicU64::new(0);
static GLOBAL_REFS_CREATED: AtomicU64 = AtomicU64::new(0);
static GLOBAL_REFS_DELETED: AtomicU64 = AtomicU64::new(0);
static TEMPORARY_PEERS_CREATED: AtomicU64 = AtomicU64::new(0);
static EDGES_ADDED: AtomicU64 = AtomicU64::new(0);
static EDGES_DROPPED: AtomicU64 = AtomicU64::new(0);
static PASSES_COMPLETED: AtomicU64 = AtomicU64::new(0);
static OBJECTS_TESTED: AtomicU64 = AtomicU64::new(0);
static OBJECTS_RESURRECTED: AtomicU64 = AtomicU64::new(0);

/// Totals of all bridge operations since process start.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BridgeStats {
    /// Weak references created by Global→Weak demotions.
    pub weak_refs_created: u64,
    /// Weak references deleted (after promotion or invalidation).
    pub weak_refs_deleted: u64,
    /// Global references created by Weak→Global promotions.
    pub global_refs_created: u64,
    /// Global references deleted by demotions.
    pub global_refs_deleted: u64,
    /// Temporary peers created for empty components.
    pub temporary_peers_created: u64,
    /// Synthetic references wired (ring and cross edges).
    pub edges_added: u64,
    /// Synthetic references dropped for lack of an applicable method.
    pub edges_dropped: u64,
    /// Bridge passes completed.
    pub passes_completed: u64,
    /// Objects tested for survival across all passes.
    pub objects_tested: u64,
    /// Objects that survived host collection across all passes.
    pub objects_resurrected: u64,
}

/// Reads the current totals.
#[must_use]
pub fn snapshot() -> BridgeStats {
    BridgeStats {
        weak_refs_created: WEAK_REFS_CREATED.load(Ordering::Relaxed),
        weak_refs_deleted: WEAK_REFS_DELETED.load(Ordering::Relaxed),
        global_refs_created: GLOBAL_REFS_CREATED.load(Ordering::Relaxed),
        global_refs_deleted: GLOBAL_REFS_DELETED.load(Ordering::Relaxed),
        temporary_peers_created: TEMPORARY_PEERS_CREATED.load(Ordering::Relaxed),
        edges_added: EDGES_ADDED.load(Ordering::Relaxed),
        edges_dropped: EDGES_DROPPED.load(Ordering::Relaxed),
        passes_completed: PASSES_COMPLETED.load(Ordering::Relaxed),
        objects_tested: OBJECTS_TESTED.load(Ordering::Relaxed),
        objects_resurrected: OBJECTS_RESURRECTED.load(Ordering::Relaxed),
    }
}

pub(crate) fn record_weak_created() {
    WEAK_REFS_CREATED.fetch_add(1, Ordering::Relaxed);
}

pub(crate) fn record_weak_deleted() {
    WEAK_REFS_DELETED.fetch_add(1, Ordering::Relaxed);
}

pub(crate) fn record_global_created() {
    GLOBAL_REFS_CREATED.fetch_add(1, Ordering::Relaxed);
}

pub(crate) fn record_global_deleted() {
    GLOBAL_REFS_DELETED.fetch_add(1, Ordering::Relaxed);
}

pub(crate) fn record_temporary_peer() {
    TEMPORARY_PEERS_CREATED.fetch_add(1, Ordering::Relaxed);
}

pub(crate) fn record_edge_added() {
    EDGES_ADDED.fetch_add(1, Ordering::Relaxed);
}

pub(crate) fn record_edge_dropped() {
    EDGES_DROPPED.fetch_add(1, Ordering::Relaxed);
}

pub(crate) fn record_pass(tested: usize, resurrected: usize) {
    PASSES_COMPLETED.fetch_add(1, Ordering::Relaxed);
    OBJECTS_TESTED.fetch_add(tested as u64, Ordering::Relaxed);
    OBJECTS_RESURRECTED.fetch_add(resurrected as u64, Ordering::Relaxed);
}

#[cfg(test)]
mod tests {
    use super::{record_pass, snapshot};

    #[test]
    fn test_pass_counters_are_monotonic() {
        let before = snapshot();
        record_pass(4, 2);
        let after = snapshot();
        assert!(after.passes_completed >= before.passes_completed + 1);
        assert!(after.objects_tested >= before.objects_tested + 4);
        assert!(after.objects_resurrected >= before.objects_resurrected + 2);
    }
}
