use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use super::JobList;
use crate::client::ExecutionClient;
use crate::error::{AggregateError, JobError};
use crate::state_machine::Job;

#[derive(Debug, Clone, Copy)]
pub(super) enum BulkOp {
    Sync,
    Confirm,
    Cancel,
}

/// Per-member results of one bulk pass, in list order.
#[derive(Debug, Default)]
pub(super) struct BulkOutcome {
    pub succeeded: Vec<String>,
    pub failed: Vec<(String, JobError)>,
}

impl BulkOutcome {
    pub fn into_result(self) -> Result<(), AggregateError> {
        if self.failed.is_empty() {
            return Ok(());
        }
        Err(AggregateError {
            succeeded: self.succeeded,
            failed: self.failed.into_iter().collect(),
        })
    }
}

impl<C: ExecutionClient> JobList<C> {
    /// Refresh every member, at most `max_concurrency` at a time.
    ///
    /// Members that synced keep their new snapshot even when others fail.
    pub async fn sync_all(&self) -> Result<(), AggregateError> {
        run_bulk(&self.jobs, self.options.max_concurrency, BulkOp::Sync)
            .await
            .into_result()
    }

    /// Confirm every member. Members not in `Quoted` fail locally with
    /// [`JobError::InvalidState`] and never reach the remote.
    pub async fn confirm_all(&self) -> Result<(), AggregateError> {
        run_bulk(&self.jobs, self.options.max_concurrency, BulkOp::Confirm)
            .await
            .into_result()
    }

    pub async fn cancel_all(&self) -> Result<(), AggregateError> {
        run_bulk(&self.jobs, self.options.max_concurrency, BulkOp::Cancel)
            .await
            .into_result()
    }
}

/// Run `op` on every job, bounded by a semaphore, and wait for all of them.
pub(super) async fn run_bulk<C: ExecutionClient>(
    jobs: &[Arc<Job<C>>],
    max_concurrency: usize,
    op: BulkOp,
) -> BulkOutcome {
    let semaphore = Arc::new(Semaphore::new(max_concurrency.clamp(1, Semaphore::MAX_PERMITS)));
    let mut join_set = JoinSet::new();
    let mut task_members = HashMap::new();

    for (index, job) in jobs.iter().enumerate() {
        let job = Arc::clone(job);
        let semaphore = Arc::clone(&semaphore);
        let id = job.id().to_string();
        let handle = join_set.spawn(async move {
            // The semaphore is never closed, so acquisition only waits.
            let _permit = semaphore.acquire_owned().await.ok();
            let result = match op {
                BulkOp::Sync => job.sync().await,
                BulkOp::Confirm => job.confirm().await,
                BulkOp::Cancel => job.cancel().await,
            };
            result.map(drop)
        });
        task_members.insert(handle.id(), (index, id));
    }

    let mut succeeded = Vec::new();
    let mut failed = Vec::new();
    while let Some(joined) = join_set.join_next_with_id().await {
        let (task_id, result) = match joined {
            Ok((task_id, result)) => (task_id, result),
            Err(join_err) => {
                tracing::error!(?op, error = %join_err, "Bulk task aborted");
                let message = join_err.to_string();
                let task_id = join_err.id();
                let Some((_, id)) = task_members.get(&task_id) else {
                    continue;
                };
                let err = JobError::Remote {
                    id: id.clone(),
                    message,
                };
                (task_id, Err(err))
            }
        };
        let Some((index, id)) = task_members.remove(&task_id) else {
            continue;
        };
        match result {
            Ok(()) => succeeded.push((index, id)),
            Err(err) => {
                tracing::warn!(?op, execution_id = %id, error = %err, "Bulk member failed");
                failed.push((index, id, err));
            }
        }
    }

    succeeded.sort_by_key(|(index, _)| *index);
    failed.sort_by_key(|(index, _, _)| *index);
    tracing::debug!(
        ?op,
        succeeded = succeeded.len(),
        failed = failed.len(),
        "Bulk pass finished"
    );

    BulkOutcome {
        succeeded: succeeded.into_iter().map(|(_, id)| id).collect(),
        failed: failed.into_iter().map(|(_, id, err)| (id, err)).collect(),
    }
}
