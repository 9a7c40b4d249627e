//! The background worker that serializes bridge passes.
//!
//! The managed collector hands snapshots to [`BridgeCoordinator::submit`],
//! which writes a single-slot overwrite mailbox (last writer wins) and
//! signals the worker. The worker runs exactly one pass at a time for the
//! lifetime of the process; there is no cancellation and no shutdown.
//!
//! Coalescing is a contract, not an accident: a snapshot only reflects the
//! managed collector's most recent mark phase, so a submission that arrives
//! before the previous one was picked up makes the previous one meaningless.
//! The superseded snapshot is dropped, its control blocks untouched.

use std::panic::{self, AssertUnwindSafe};
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use parking_lot::{Condvar, Mutex, RwLock};

use crate::bridge::{run_pass, PassSummary};
use crate::gateway::{CapabilityCache, HostObjectGateway};
use crate::graph::Snapshot;
use crate::logging;

/// Callbacks supplied by the managed collector, invoked around each pass on
/// the worker thread.
pub trait CollectorHooks: Send + 'static {
    /// Invoked before the prepare phase touches any handle.
    fn pass_started(&self) {}

    /// Invoked after reconciliation completes, returning snapshot ownership.
    /// The managed collector may resume using the updated handle graph once
    /// this fires.
    fn pass_finished(&self, snapshot: Snapshot, summary: PassSummary);
}

/// Discards completion notifications. Useful when only the control-block
/// side effects matter.
impl CollectorHooks for () {
    fn pass_finished(&self, _snapshot: Snapshot, _summary: PassSummary) {}
}

struct CoordinatorShared {
    /// Single-slot mailbox; `submit` overwrites, the worker takes.
    slot: Mutex<Option<Snapshot>>,
    wakeup: Condvar,
    /// Held in writer mode for the duration of a pass; `await_quiescence`
    /// is a momentary read acquisition.
    pass_lock: RwLock<()>,
    disabled: AtomicBool,
}

/// Handle to the bridge worker.
///
/// Cheap to clone-share via the methods on `&self`; all methods are safe
/// from any thread. The worker thread itself runs until process exit.
pub struct BridgeCoordinator {
    shared: Arc<CoordinatorShared>,
}

impl BridgeCoordinator {
    /// Spawns the bridge worker.
    ///
    /// The gateway is constructed *on* the worker thread by `make_gateway`
    /// and initialized there once, so host environment handles never cross
    /// threads. Gateway initialization failure is fatal: nothing can proceed
    /// without the placeholder constructor, and the worker aborts the
    /// process with a diagnostic.
    ///
    /// # Panics
    ///
    /// Panics if the worker thread cannot be spawned.
    pub fn spawn<G, H, F>(make_gateway: F, hooks: H) -> Self
    where
        G: HostObjectGateway + 'static,
        H: CollectorHooks,
        F: FnOnce() -> G + Send + 'static,
    {
        let shared = Arc::new(CoordinatorShared {
            slot: Mutex::new(None),
            wakeup: Condvar::new(),
            pass_lock: RwLock::new(()),
            disabled: AtomicBool::new(false),
        });
        let worker_shared = Arc::clone(&shared);
        thread::Builder::new()
            .name("crossgc-bridge".into())
            .spawn(move || worker_main(&worker_shared, make_gateway, &hooks))
            .expect("failed to spawn the bridge worker thread");
        Self { shared }
    }

    /// Hands a snapshot to the worker. Never blocks on pass completion.
    ///
    /// If a previous submission is still waiting in the mailbox it is
    /// superseded: dropped unprocessed, with a log line. Submissions made
    /// while the bridge is disabled are dropped.
    pub fn submit(&self, snapshot: Snapshot) {
        if self.shared.disabled.load(Ordering::Relaxed) {
            logging::submission_dropped_disabled();
            return;
        }
        let mut slot = self.shared.slot.lock();
        if let Some(stale) = slot.replace(snapshot) {
            logging::snapshot_superseded(stale.components().len());
        }
        self.shared.wakeup.notify_one();
    }

    /// Blocks until no pass is currently in progress.
    ///
    /// Makes no promise that any particular snapshot has been processed —
    /// only that the worker is not mid-pass at the moment this returns.
    pub fn await_quiescence(&self) {
        drop(self.shared.pass_lock.read());
    }

    /// Permanently disables the bridge: subsequent submissions are dropped.
    /// A snapshot already in the mailbox still runs.
    pub fn disable(&self) {
        self.shared.disabled.store(true, Ordering::Relaxed);
    }

    /// Whether [`disable`](Self::disable) has been called.
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.shared.disabled.load(Ordering::Relaxed)
    }
}

fn worker_main<G, H, F>(shared: &CoordinatorShared, make_gateway: F, hooks: &H)
where
    G: HostObjectGateway,
    H: CollectorHooks,
    F: FnOnce() -> G,
{
    let mut gateway = make_gateway();
    if let Err(err) = gateway.initialize() {
        tracing::error!(target: "crossgc::bridge", error = %err, "cannot start bridge");
        process::abort();
    }
    let mut capabilities = CapabilityCache::new();

    loop {
        let snapshot = {
            let mut slot = shared.slot.lock();
            loop {
                match slot.take() {
                    Some(snapshot) => break snapshot,
                    None => shared.wakeup.wait(&mut slot),
                }
            }
        };

        let _pass = shared.pass_lock.write();
        // Crash-only: a panic mid-pass leaves control blocks in a state the
        // bridge can no longer interpret, so the whole process goes down,
        // not just this thread.
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            hooks.pass_started();
            let summary = run_pass(&mut gateway, &mut capabilities, &snapshot);
            hooks.pass_finished(snapshot, summary);
        }));
        if outcome.is_err() {
            process::abort();
        }
    }
}
