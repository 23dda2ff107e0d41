use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use chrono::Duration as ChronoDuration;
use tokio::time::sleep;

use super::retry::RetryConfig;
use super::status::{Action, Status};
use crate::client::ExecutionClient;
use crate::error::JobError;
use crate::progress::ProgressReport;
use crate::snapshot::Snapshot;

/// Local handle on one remote execution.
///
/// Holds the most recent [`Snapshot`] behind a lock; every sync swaps in a
/// whole new `Arc<Snapshot>`, so a reader sees either the old record or the
/// new one, never a mix.
pub struct Job<C> {
    id: String,
    client: Arc<C>,
    retry: RetryConfig,
    snapshot: RwLock<Option<Arc<Snapshot>>>,
}

impl<C> std::fmt::Debug for Job<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.id)
            .field("snapshot", &self.snapshot())
            .finish()
    }
}

impl<C> Job<C> {
    /// Unsynced handle; no network call.
    pub fn from_id(id: impl Into<String>, client: Arc<C>) -> Self {
        Self {
            id: id.into(),
            client,
            retry: RetryConfig::default(),
            snapshot: RwLock::new(None),
        }
    }

    /// Handle seeded with a snapshot the caller already has; no network call.
    pub fn from_snapshot(snapshot: Snapshot, client: Arc<C>) -> Self {
        Self {
            id: snapshot.id.clone(),
            client,
            retry: RetryConfig::default(),
            snapshot: RwLock::new(Some(Arc::new(snapshot))),
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Independent handle on the same execution, seeded with this one's
    /// current snapshot. Later syncs on either handle don't affect the other.
    pub(crate) fn detached(&self) -> Self {
        Self {
            id: self.id.clone(),
            client: Arc::clone(&self.client),
            retry: self.retry,
            snapshot: RwLock::new(self.snapshot()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn status(&self) -> Result<Status, JobError> {
        self.snapshot()
            .map(|snap| snap.status.clone())
            .ok_or_else(|| JobError::NotSynced(self.id.clone()))
    }

    /// False until a terminal snapshot has been seen.
    pub fn is_terminal(&self) -> bool {
        self.snapshot().is_some_and(|snap| snap.is_terminal())
    }

    pub fn progress(&self) -> Option<ProgressReport> {
        self.snapshot().map(|snap| snap.progress())
    }

    pub fn running_time(&self) -> Option<ChronoDuration> {
        self.snapshot()?.running_time()
    }

    /// Swap in `incoming` unless it would move a terminal execution somewhere
    /// else, in which case the held snapshot stays.
    fn accept(&self, incoming: Snapshot) -> Arc<Snapshot> {
        let mut slot = self.snapshot.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(current) = slot.as_ref() {
            if current.is_terminal() && !Status::can_transition(&current.status, &incoming.status) {
                tracing::warn!(
                    execution_id = %self.id,
                    held = %current.status,
                    reported = %incoming.status,
                    "Ignoring snapshot that leaves a terminal state"
                );
                return Arc::clone(current);
            }
        }
        let incoming = Arc::new(incoming);
        *slot = Some(Arc::clone(&incoming));
        incoming
    }
}

impl<C: ExecutionClient> Job<C> {
    /// Fetch the latest snapshot and adopt it.
    pub async fn sync(&self) -> Result<Arc<Snapshot>, JobError> {
        let fetched = self
            .retry
            .run("get", &self.id, || self.client.get_execution(&self.id))
            .await
            .map_err(|e| JobError::from_client(&self.id, e, None))?;
        let snap = self.accept(fetched);
        tracing::debug!(execution_id = %self.id, status = %snap.status, "Synced execution");
        Ok(snap)
    }

    /// Approve a quoted execution, then re-sync to adopt the remote's answer.
    pub async fn confirm(&self) -> Result<Arc<Snapshot>, JobError> {
        self.act(Action::Confirm).await
    }

    /// Cancel a quoted or running execution, then re-sync.
    pub async fn cancel(&self) -> Result<Arc<Snapshot>, JobError> {
        self.act(Action::Cancel).await
    }

    async fn act(&self, action: Action) -> Result<Arc<Snapshot>, JobError> {
        let status = self.status()?;
        if !status.permits(action) {
            return Err(JobError::InvalidState {
                id: self.id.clone(),
                action,
                status,
            });
        }

        let client = &self.client;
        let id = self.id.as_str();
        let operation = action.to_string();
        self.retry
            .run(&operation, id, || async move {
                match action {
                    Action::Confirm => client.confirm_execution(id).await,
                    Action::Cancel => client.cancel_execution(id).await,
                }
            })
            .await
            .map_err(|e| JobError::from_client(id, e, Some((action, status.clone()))))?;

        tracing::info!(execution_id = %id, %action, from = %status, "Action accepted");
        self.sync().await
    }

    /// Poll until the execution is terminal, calling `on_update` after every
    /// sync. Returns the terminal snapshot.
    pub async fn watch<F>(&self, interval: Duration, mut on_update: F) -> Result<Arc<Snapshot>, JobError>
    where
        F: FnMut(&Snapshot),
    {
        loop {
            let snap = self.sync().await?;
            on_update(&snap);
            if snap.is_terminal() {
                return Ok(snap);
            }
            sleep(interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::{Failure, MockClient, fast_retry};

    fn job(id: &str, client: &Arc<MockClient>) -> Job<MockClient> {
        Job::from_id(id, Arc::clone(client)).with_retry(fast_retry())
    }

    #[test]
    fn from_id_is_unsynced() {
        let client = Arc::new(MockClient::new());
        let job = job("a", &client);
        assert_eq!(job.id(), "a");
        assert!(job.snapshot().is_none());
        assert!(!job.is_terminal());
        assert!(matches!(job.status(), Err(JobError::NotSynced(id)) if id == "a"));
        assert_eq!(client.get_calls("a"), 0);
    }

    #[test]
    fn from_snapshot_is_seeded() {
        let client = Arc::new(MockClient::new());
        let job = Job::from_snapshot(Snapshot::new("b", Status::Running), client);
        assert_eq!(job.id(), "b");
        assert_eq!(job.status().unwrap(), Status::Running);
    }

    #[tokio::test]
    async fn detached_handle_syncs_independently() {
        let client = Arc::new(MockClient::new().with_execution("a", Status::Failed));
        let original = Job::from_snapshot(Snapshot::new("a", Status::Running), Arc::clone(&client))
            .with_retry(fast_retry());
        let copy = original.detached();
        assert_eq!(copy.status().unwrap(), Status::Running);

        copy.sync().await.unwrap();
        assert_eq!(copy.status().unwrap(), Status::Failed);
        assert_eq!(original.status().unwrap(), Status::Running);
    }

    #[tokio::test]
    async fn sync_adopts_remote_snapshot() {
        let client = Arc::new(MockClient::new().with_execution("a", Status::Running));
        let job = job("a", &client);
        let snap = job.sync().await.unwrap();
        assert_eq!(snap.status, Status::Running);
        assert_eq!(job.status().unwrap(), Status::Running);
    }

    #[tokio::test]
    async fn sync_reports_not_found_without_retrying() {
        let client = Arc::new(MockClient::new());
        let job = job("ghost", &client);
        assert!(matches!(job.sync().await, Err(JobError::NotFound(_))));
        assert_eq!(client.get_calls("ghost"), 1);
    }

    #[tokio::test]
    async fn sync_retries_transient_failures() {
        let client = Arc::new(
            MockClient::new()
                .with_execution("a", Status::Running)
                .flaky("a", 2),
        );
        let job = job("a", &client);
        assert_eq!(job.sync().await.unwrap().status, Status::Running);
        assert_eq!(client.get_calls("a"), 3);
    }

    #[tokio::test]
    async fn sync_gives_up_after_budget() {
        let client = Arc::new(
            MockClient::new()
                .with_execution("a", Status::Running)
                .failing("a", Failure::Network),
        );
        let job = job("a", &client);
        assert!(matches!(job.sync().await, Err(JobError::Network { .. })));
        assert_eq!(client.get_calls("a"), 3);
    }

    #[tokio::test]
    async fn confirm_moves_quoted_to_running() {
        let client = Arc::new(MockClient::new().with_execution("a", Status::Quoted));
        let job = job("a", &client);
        job.sync().await.unwrap();

        let snap = job.confirm().await.unwrap();
        assert_eq!(snap.status, Status::Running);
        assert_eq!(client.confirm_calls(), 1);
    }

    #[tokio::test]
    async fn confirm_requires_quoted_and_skips_remote_call() {
        for status in [
            Status::Running,
            Status::Succeeded,
            Status::Failed,
            Status::Cancelled,
        ] {
            let client = Arc::new(MockClient::new().with_execution("a", status.clone()));
            let job = Job::from_snapshot(Snapshot::new("a", status.clone()), Arc::clone(&client));
            let err = job.confirm().await.unwrap_err();
            assert!(
                matches!(&err, JobError::InvalidState { action: Action::Confirm, status: s, .. } if *s == status),
                "{err:?}"
            );
            assert_eq!(client.confirm_calls(), 0);
        }
    }

    #[tokio::test]
    async fn confirm_before_sync_is_not_synced() {
        let client = Arc::new(MockClient::new().with_execution("a", Status::Quoted));
        let job = job("a", &client);
        assert!(matches!(job.confirm().await, Err(JobError::NotSynced(_))));
        assert_eq!(client.confirm_calls(), 0);
    }

    #[tokio::test]
    async fn cancel_running_execution() {
        let client = Arc::new(MockClient::new().with_execution("a", Status::Running));
        let job = Job::from_snapshot(Snapshot::new("a", Status::Running), Arc::clone(&client));
        let snap = job.cancel().await.unwrap();
        assert_eq!(snap.status, Status::Cancelled);
        assert_eq!(client.cancel_calls(), 1);
    }

    #[tokio::test]
    async fn remote_rejection_is_invalid_state() {
        // The remote already finished the execution; the local view is stale.
        let client = Arc::new(MockClient::new().with_execution("a", Status::Succeeded));
        let job = Job::from_snapshot(Snapshot::new("a", Status::Running), Arc::clone(&client))
            .with_retry(fast_retry());
        let err = job.cancel().await.unwrap_err();
        assert!(matches!(err, JobError::InvalidState { action: Action::Cancel, .. }));
        assert_eq!(client.cancel_calls(), 1);
    }

    #[tokio::test]
    async fn terminal_status_is_absorbing() {
        let client = Arc::new(MockClient::new().with_execution("a", Status::Running));
        let job = Job::from_snapshot(Snapshot::new("a", Status::Succeeded), Arc::clone(&client))
            .with_retry(fast_retry());

        let snap = job.sync().await.unwrap();
        assert_eq!(snap.status, Status::Succeeded);
        assert_eq!(job.status().unwrap(), Status::Succeeded);
        assert!(matches!(job.confirm().await, Err(JobError::InvalidState { .. })));
        assert!(matches!(job.cancel().await, Err(JobError::InvalidState { .. })));
        assert_eq!(client.confirm_calls() + client.cancel_calls(), 0);
    }

    #[tokio::test]
    async fn watch_returns_terminal_snapshot() {
        let client = Arc::new(MockClient::new().with_timeline(
            "a",
            &[Status::Quoted, Status::Running, Status::Running, Status::Succeeded],
        ));
        let job = job("a", &client);
        let mut seen = Vec::new();
        let last = job
            .watch(Duration::from_millis(1), |snap| seen.push(snap.status.clone()))
            .await
            .unwrap();
        assert_eq!(last.status, Status::Succeeded);
        assert_eq!(
            seen,
            vec![Status::Quoted, Status::Running, Status::Running, Status::Succeeded]
        );
    }
}
