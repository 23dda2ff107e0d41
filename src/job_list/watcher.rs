use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::{CancellationToken, DropGuard};
use uuid::Uuid;

use super::JobList;
use super::bulk::{BulkOp, run_bulk};
use crate::client::ExecutionClient;
use crate::error::AggregateError;
use crate::snapshot::Snapshot;
use crate::state_machine::Job;

/// What a watcher hands to its callback after every poll cycle.
#[derive(Debug)]
pub struct WatchUpdate {
    /// 1-based poll cycle counter.
    pub cycle: u64,
    /// Last-known snapshots in list order; never-synced members are absent.
    pub snapshots: Vec<Arc<Snapshot>>,
    /// Members whose sync failed this cycle, if any.
    pub failures: Option<AggregateError>,
}

impl WatchUpdate {
    pub fn status_breakdown(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for snap in &self.snapshots {
            *counts.entry(snap.status.to_string()).or_insert(0) += 1;
        }
        counts
    }
}

/// Handle on a background polling task.
///
/// Dropping the handle cancels the task; [`Watcher::join`] waits for it.
pub struct Watcher {
    id: Uuid,
    cancel: CancellationToken,
    /// Cancelled by the task itself on exit, including by panic.
    finished: CancellationToken,
    handle: JoinHandle<()>,
    _guard: DropGuard,
}

impl Watcher {
    fn spawn<C, F>(jobs: Vec<Arc<Job<C>>>, max_concurrency: usize, interval: Duration, on_update: F) -> Self
    where
        C: ExecutionClient,
        F: FnMut(&WatchUpdate) + Send + 'static,
    {
        let id = Uuid::new_v4();
        let cancel = CancellationToken::new();
        tracing::info!(watch_id = %id, members = jobs.len(), ?interval, "Watcher started");
        let finished = CancellationToken::new();
        let done = finished.clone().drop_guard();
        let loop_cancel = cancel.clone();
        let handle = tokio::spawn(async move {
            let _done = done;
            poll_loop(id, jobs, max_concurrency, interval, loop_cancel, on_update).await;
        });
        Self {
            id,
            _guard: cancel.clone().drop_guard(),
            cancel,
            finished,
            handle,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn is_active(&self) -> bool {
        !self.finished.is_cancelled()
    }

    /// Ask the task to stop. Already-issued requests run to completion.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Wait for the task to exit, whether it converged or was stopped.
    pub async fn join(self) {
        let id = self.id;
        if let Err(err) = self.handle.await {
            tracing::error!(watch_id = %id, error = %err, "Watcher task failed");
        }
    }
}

async fn poll_loop<C, F>(
    watch_id: Uuid,
    jobs: Vec<Arc<Job<C>>>,
    max_concurrency: usize,
    interval: Duration,
    cancel: CancellationToken,
    mut on_update: F,
) where
    C: ExecutionClient,
    F: FnMut(&WatchUpdate) + Send + 'static,
{
    let mut cycle = 0u64;
    loop {
        if cancel.is_cancelled() {
            break;
        }
        cycle += 1;
        let outcome = run_bulk(&jobs, max_concurrency, BulkOp::Sync).await;
        if cancel.is_cancelled() {
            break;
        }

        let update = WatchUpdate {
            cycle,
            snapshots: jobs.iter().filter_map(|job| job.snapshot()).collect(),
            failures: outcome.into_result().err(),
        };
        if let Some(failures) = &update.failures {
            tracing::warn!(%watch_id, cycle, failed = failures.failed.len(), "Poll cycle had failures");
        }
        on_update(&update);

        if jobs.iter().all(|job| job.is_terminal()) {
            tracing::info!(%watch_id, cycle, "All executions terminal, watcher done");
            return;
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = sleep(interval) => {}
        }
    }
    tracing::info!(%watch_id, cycle, "Watcher stopped");
}

impl<C: ExecutionClient> JobList<C> {
    /// Start polling every member in the background until all are terminal.
    ///
    /// `on_update` runs on the watcher task after each cycle. Returns false
    /// and does nothing if this list already has an active watcher. Must be
    /// called from within a tokio runtime.
    pub fn watch<F>(&self, interval: Duration, on_update: F) -> bool
    where
        F: FnMut(&WatchUpdate) + Send + 'static,
    {
        let mut slot = self.lock_watcher();
        if slot.as_ref().is_some_and(Watcher::is_active) {
            tracing::debug!("Watch requested while already watching");
            return false;
        }
        *slot = Some(Watcher::spawn(
            self.jobs.clone(),
            self.options.max_concurrency,
            interval,
            on_update,
        ));
        true
    }
}

impl<C> JobList<C> {
    /// Cancel the active watcher and wait for its task to exit. Once this
    /// returns, `on_update` will not be called again. No-op when idle.
    pub async fn stop_watching(&self) {
        let watcher = self.lock_watcher().take();
        if let Some(watcher) = watcher {
            watcher.stop();
            watcher.join().await;
        }
    }

    /// Wait for the active watcher to finish on its own. The watcher stays
    /// in place, so a concurrent [`stop_watching`](Self::stop_watching) still
    /// reaches it.
    pub async fn wait_watching(&self) {
        let finished = self
            .lock_watcher()
            .as_ref()
            .map(|watcher| watcher.finished.clone());
        if let Some(finished) = finished {
            finished.cancelled().await;
        }
    }

    pub fn watch_id(&self) -> Option<Uuid> {
        self.lock_watcher().as_ref().map(Watcher::id)
    }
}
