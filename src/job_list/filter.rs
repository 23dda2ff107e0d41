use serde_json::Value;

use crate::snapshot::Snapshot;
use crate::state_machine::{Job, Status};

type Criterion<C> = Box<dyn Fn(&Job<C>) -> bool + Send + Sync>;

/// Conjunction of criteria applied to the members of a
/// [`JobList`](super::JobList).
///
/// Snapshot-based criteria reject members that have never been synced. An
/// empty filter accepts everything.
///
/// ```ignore
/// let pending = jobs.filter(
///     &JobFilter::new()
///         .status(Status::Quoted)
///         .tool_key("deeporigin.docking"),
/// );
/// ```
pub struct JobFilter<C> {
    criteria: Vec<Criterion<C>>,
}

impl<C> Default for JobFilter<C> {
    fn default() -> Self {
        Self {
            criteria: Vec::new(),
        }
    }
}

impl<C> JobFilter<C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    pub fn matches(&self, job: &Job<C>) -> bool {
        self.criteria.iter().all(|criterion| criterion(job))
    }
}

impl<C: 'static> JobFilter<C> {
    pub fn status(self, status: Status) -> Self {
        self.on_snapshot(move |snap| snap.status == status)
    }

    pub fn tool_key(self, key: impl Into<String>) -> Self {
        let key = key.into();
        self.on_snapshot(move |snap| snap.tool.key == key)
    }

    pub fn tool_version(self, version: impl Into<String>) -> Self {
        let version = version.into();
        self.on_snapshot(move |snap| snap.tool.version == version)
    }

    /// Exact match on a remote attribute; a missing attribute never matches.
    /// Wire fields such as `executionId` or `approveAmount` are attributes.
    pub fn attr(self, key: impl Into<String>, value: Value) -> Self {
        let key = key.into();
        self.on_snapshot(move |snap| snap.attribute(&key) == Some(&value))
    }

    /// Arbitrary predicate over the whole job, for anything the named
    /// criteria don't cover.
    pub fn predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Job<C>) -> bool + Send + Sync + 'static,
    {
        self.criteria.push(Box::new(predicate));
        self
    }

    fn on_snapshot<F>(mut self, test: F) -> Self
    where
        F: Fn(&Snapshot) -> bool + Send + Sync + 'static,
    {
        self.criteria
            .push(Box::new(move |job: &Job<C>| job.snapshot().is_some_and(|snap| test(&snap))));
        self
    }
}
