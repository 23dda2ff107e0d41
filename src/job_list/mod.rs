//! Ordered, deduplicated collections of [`Job`]s.
//!
//! A [`JobList`] is what callers work with for batched submissions: build it
//! from ids, snapshots or a remote listing, narrow it with a [`JobFilter`],
//! then sync, confirm or cancel every member concurrently, or hand it to a
//! [`Watcher`] that polls until every execution is terminal.

mod bulk;
mod filter;
mod summary;
mod watcher;

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::Semaphore;

pub use filter::JobFilter;
pub use summary::JobSummary;
pub use watcher::{WatchUpdate, Watcher};

use crate::client::{ExecutionClient, ListCriteria, Pagination};
use crate::config::TrackerConfig;
use crate::error::JobError;
use crate::snapshot::Snapshot;
use crate::state_machine::{Job, RetryConfig};

/// Knobs shared by every member of a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobListOptions {
    /// Remote calls in flight at once during bulk operations.
    pub max_concurrency: usize,
    pub retry: RetryConfig,
}

impl Default for JobListOptions {
    fn default() -> Self {
        Self {
            max_concurrency: 10,
            retry: RetryConfig::default(),
        }
    }
}

impl JobListOptions {
    pub fn from_config(config: &TrackerConfig) -> Self {
        Self {
            max_concurrency: config.max_concurrency.clamp(1, Semaphore::MAX_PERMITS),
            retry: config.retry(),
        }
    }
}

pub struct JobList<C> {
    jobs: Vec<Arc<Job<C>>>,
    options: JobListOptions,
    watcher: Mutex<Option<Watcher>>,
}

impl<C> JobList<C> {
    /// Build from ids; duplicates are dropped, first occurrence wins.
    pub fn from_ids<I, S>(ids: I, client: Arc<C>, options: JobListOptions) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let jobs = ids.into_iter().map(|id| {
            Arc::new(Job::from_id(id, Arc::clone(&client)).with_retry(options.retry))
        });
        Self::from_shared(jobs, options)
    }

    /// Build from snapshots the caller already holds; no network calls.
    pub fn from_snapshots<I>(snapshots: I, client: Arc<C>, options: JobListOptions) -> Self
    where
        I: IntoIterator<Item = Snapshot>,
    {
        let jobs = snapshots.into_iter().map(|snap| {
            Arc::new(Job::from_snapshot(snap, Arc::clone(&client)).with_retry(options.retry))
        });
        Self::from_shared(jobs, options)
    }

    fn from_shared(jobs: impl IntoIterator<Item = Arc<Job<C>>>, options: JobListOptions) -> Self {
        let mut seen = HashSet::new();
        let jobs = jobs
            .into_iter()
            .filter(|job| seen.insert(job.id().to_string()))
            .collect();
        Self {
            jobs,
            options,
            watcher: Mutex::new(None),
        }
    }

    /// A new list with the members `filter` accepts, each a fresh job seeded
    /// from the member's current snapshot. The source list is left untouched
    /// by anything later done to the new one.
    pub fn filter(&self, filter: &JobFilter<C>) -> JobList<C> {
        let jobs = self
            .jobs
            .iter()
            .filter(|job| filter.matches(job))
            .map(|job| Arc::new(job.detached()));
        Self::from_shared(jobs, self.options)
    }

    pub fn options(&self) -> JobListOptions {
        self.options
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Arc<Job<C>>> {
        self.jobs.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Job<C>>> {
        self.jobs.iter()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.jobs.iter().map(|job| job.id()).collect()
    }

    /// Last-known snapshots in list order; unsynced members are skipped.
    pub fn snapshots(&self) -> Vec<Arc<Snapshot>> {
        self.jobs.iter().filter_map(|job| job.snapshot()).collect()
    }

    /// True when every member has a terminal snapshot (vacuously for an
    /// empty list).
    pub fn all_terminal(&self) -> bool {
        self.jobs.iter().all(|job| job.is_terminal())
    }

    /// Count of members per last-known status. Unsynced members are not
    /// counted.
    pub fn status_breakdown(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for snap in self.snapshots() {
            *counts.entry(snap.status.to_string()).or_insert(0) += 1;
        }
        counts
    }

    /// One flat row per member, for tabular output.
    pub fn summaries(&self) -> Vec<JobSummary> {
        self.jobs.iter().map(|job| JobSummary::from_job(job)).collect()
    }

    pub fn is_watching(&self) -> bool {
        self.lock_watcher().as_ref().is_some_and(Watcher::is_active)
    }

    fn lock_watcher(&self) -> MutexGuard<'_, Option<Watcher>> {
        self.watcher.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<C: ExecutionClient> JobList<C> {
    /// Fetch executions matching `criteria`, walking pages until the listing
    /// is exhausted or `pagination.max_pages` is reached.
    pub async fn list(
        client: Arc<C>,
        criteria: &ListCriteria,
        pagination: Pagination,
        options: JobListOptions,
    ) -> Result<Self, JobError> {
        let page_size = pagination.page_size.max(1);
        let mut page = pagination.page;
        let mut pages_fetched = 0u32;
        let mut snapshots: Vec<Snapshot> = Vec::new();

        loop {
            let result = options
                .retry
                .run("list", "*", || client.list_executions(criteria, page, page_size))
                .await
                .map_err(|e| JobError::from_client("*", e, None))?;
            pages_fetched += 1;

            let received = result.data.len();
            snapshots.extend(result.data);
            tracing::debug!(page, received, count = result.count, "Fetched execution page");

            let more_remaining = result.count > u64::from(page_size)
                && received >= page_size as usize
                && (snapshots.len() as u64) < result.count;
            let page_limit_hit = pagination.max_pages.is_some_and(|max| pages_fetched >= max);
            if !more_remaining || page_limit_hit {
                break;
            }
            page += 1;
        }

        Ok(Self::from_snapshots(snapshots, client, options))
    }
}
