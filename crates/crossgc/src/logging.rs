//! Log-category gating for reference-transition spew.
//!
//! Every reference state transition the bridge performs can be logged, but
//! the full stream is torrential on large heaps, so emission is gated by a
//! runtime category bitmask in addition to whatever filtering the installed
//! `tracing` subscriber applies. Categories come from
//! [`set_log_categories`] or, on first use, from the `CROSSGC_LOG`
//! environment variable (comma-separated names, e.g. `refs,bridge`).

use std::sync::atomic::{AtomicU32, Ordering};

use crate::gateway::{ClassId, PeerCapability};
use crate::handle::RawObject;

/// Bitmask of log categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogCategories(u32);

impl LogCategories {
    /// Nothing is logged.
    pub const NONE: Self = Self(0);
    /// Reference state transitions (create/drop/promote/demote) and probe
    /// results.
    pub const REFS: Self = Self(1);
    /// Pass lifecycle: submissions, coalescing, summaries.
    pub const BRIDGE: Self = Self(1 << 1);
    /// Temporary peer creation and release.
    pub const PEERS: Self = Self(1 << 2);
    /// Everything.
    pub const ALL: Self = Self(u32::MAX);

    /// Whether every category in `other` is enabled in `self`.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Union of two category sets.
    #[must_use]
    pub const fn with(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    fn from_names(names: &str) -> Self {
        let mut categories = Self::NONE;
        for name in names.split(',') {
            categories = match name.trim() {
                "refs" | "gref" => categories.with(Self::REFS),
                "bridge" | "gc" => categories.with(Self::BRIDGE),
                "peers" => categories.with(Self::PEERS),
                "all" => categories.with(Self::ALL),
                _ => categories,
            };
        }
        categories
    }
}

/// Sentinel: categories not yet resolved from the environment.
const UNSET: u32 = u32::MAX - 1;

static CATEGORIES: AtomicU32 = AtomicU32::new(UNSET);

/// Replaces the active log categories.
pub fn set_log_categories(categories: LogCategories) {
    CATEGORIES.store(categories.0, Ordering::Relaxed);
}

/// The active log categories, resolving `CROSSGC_LOG` on first use.
#[must_use]
pub fn log_categories() -> LogCategories {
    let bits = CATEGORIES.load(Ordering::Relaxed);
    if bits != UNSET {
        return LogCategories(bits);
    }
    let parsed = std::env::var("CROSSGC_LOG")
        .map(|names| LogCategories::from_names(&names))
        .unwrap_or(LogCategories::NONE);
    // First store wins; concurrent resolvers parse the same environment.
    let _ = CATEGORIES.compare_exchange(UNSET, parsed.0, Ordering::Relaxed, Ordering::Relaxed);
    LogCategories(CATEGORIES.load(Ordering::Relaxed))
}

fn enabled(categories: LogCategories) -> bool {
    log_categories().contains(categories)
}

pub(crate) fn weak_created(global: RawObject, weak: RawObject) {
    if enabled(LogCategories::REFS) {
        tracing::debug!(
            target: "crossgc::refs",
            global = global.bits(),
            weak = weak.bits(),
            "demoted global reference to weak"
        );
    }
}

pub(crate) fn global_dropped(global: RawObject) {
    if enabled(LogCategories::REFS) {
        tracing::debug!(target: "crossgc::refs", global = global.bits(), "dropped global reference");
    }
}

pub(crate) fn weak_promoted(weak: RawObject, global: RawObject) {
    if enabled(LogCategories::REFS) {
        tracing::debug!(
            target: "crossgc::refs",
            weak = weak.bits(),
            global = global.bits(),
            "promoted weak reference back to global"
        );
    }
}

pub(crate) fn weak_dropped(weak: RawObject) {
    if enabled(LogCategories::REFS) {
        tracing::debug!(target: "crossgc::refs", weak = weak.bits(), "dropped weak reference");
    }
}

pub(crate) fn weak_dead(weak: RawObject) {
    if enabled(LogCategories::REFS) {
        tracing::debug!(
            target: "crossgc::refs",
            weak = weak.bits(),
            "weak reference invalidated by host collection"
        );
    }
}

pub(crate) fn class_probed(class: ClassId, capability: PeerCapability) {
    if enabled(LogCategories::REFS) {
        tracing::debug!(
            target: "crossgc::refs",
            class = class.get(),
            ?capability,
            "probed runtime class"
        );
    }
}

pub(crate) fn edge_dropped(class_name: &str, operation: &str) {
    tracing::warn!(
        target: "crossgc::refs",
        class = class_name,
        operation,
        "no applicable method on target class; edge dropped"
    );
}

pub(crate) fn peer_created(component: usize, peer: RawObject) {
    if enabled(LogCategories::PEERS) {
        tracing::debug!(
            target: "crossgc::peers",
            component,
            peer = peer.bits(),
            "created temporary peer for empty component"
        );
    }
}

pub(crate) fn peer_released(peer: RawObject) {
    if enabled(LogCategories::PEERS) {
        tracing::debug!(target: "crossgc::peers", peer = peer.bits(), "released temporary peer");
    }
}

pub(crate) fn snapshot_superseded(components: usize) {
    if enabled(LogCategories::BRIDGE) {
        tracing::debug!(
            target: "crossgc::bridge",
            components,
            "pending snapshot superseded before processing"
        );
    }
}

pub(crate) fn submission_dropped_disabled() {
    if enabled(LogCategories::BRIDGE) {
        tracing::debug!(target: "crossgc::bridge", "bridge disabled; snapshot dropped");
    }
}

pub(crate) fn pass_summary(tested: usize, resurrected: usize) {
    if enabled(LogCategories::BRIDGE) {
        tracing::info!(
            target: "crossgc::bridge",
            tested,
            resurrected,
            "pass summary: {tested} objects tested - resurrecting {resurrected}"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::LogCategories;

    #[test]
    fn test_category_parsing() {
        let categories = LogCategories::from_names("refs, peers");
        assert!(categories.contains(LogCategories::REFS));
        assert!(categories.contains(LogCategories::PEERS));
        assert!(!categories.contains(LogCategories::BRIDGE));
    }

    #[test]
    fn test_all_contains_every_category() {
        assert!(LogCategories::ALL.contains(LogCategories::REFS));
        assert!(LogCategories::ALL.contains(LogCategories::BRIDGE));
        assert!(LogCategories::ALL.contains(LogCategories::PEERS));
    }

    #[test]
    fn test_unknown_names_are_ignored() {
        assert_eq!(LogCategories::from_names("bogus"), LogCategories::NONE);
    }
}
