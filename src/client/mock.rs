use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::{ClientError, ExecutionClient, ExecutionPage, ListCriteria};
use crate::snapshot::Snapshot;
use crate::state_machine::{RetryConfig, Status};

/// Retry settings that keep backoff out of test wall-clock time.
pub(crate) fn fast_retry() -> RetryConfig {
    RetryConfig {
        max_attempts: 3,
        base_delay_ms: 1,
        attempt_timeout_ms: 1000,
    }
}

/// How a scripted execution misbehaves.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Failure {
    Network,
    NotFound,
}

/// In-memory execution API driven by per-id status timelines.
#[derive(Default)]
pub(crate) struct MockClient {
    inner: Mutex<Inner>,
    latency: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

#[derive(Default)]
struct Inner {
    current: HashMap<String, Snapshot>,
    timelines: HashMap<String, VecDeque<Status>>,
    failures: HashMap<String, Failure>,
    flaky: HashMap<String, u32>,
    listing: Vec<Snapshot>,
    list_count: Option<u64>,
    get_calls: HashMap<String, usize>,
    confirm_calls: usize,
    cancel_calls: usize,
    list_calls: usize,
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_execution(self, id: &str, status: Status) -> Self {
        self.lock()
            .current
            .insert(id.to_string(), Snapshot::new(id, status).with_tool("k", "v1"));
        self
    }

    /// Each `get_execution` advances one step; the last status sticks.
    pub fn with_timeline(self, id: &str, statuses: &[Status]) -> Self {
        let first = statuses.first().cloned().unwrap_or(Status::Quoted);
        let this = self.with_execution(id, first);
        this.lock()
            .timelines
            .insert(id.to_string(), statuses.iter().cloned().collect());
        this
    }

    pub fn failing(self, id: &str, failure: Failure) -> Self {
        self.lock().failures.insert(id.to_string(), failure);
        self
    }

    /// Fail the next `times` reads of `id` with a transient error.
    pub fn flaky(self, id: &str, times: u32) -> Self {
        self.lock().flaky.insert(id.to_string(), times);
        self
    }

    pub fn with_listing(self, snapshots: Vec<Snapshot>, count: Option<u64>) -> Self {
        {
            let mut inner = self.lock();
            inner.listing = snapshots;
            inner.list_count = count;
        }
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn get_calls(&self, id: &str) -> usize {
        self.lock().get_calls.get(id).copied().unwrap_or(0)
    }

    pub fn confirm_calls(&self) -> usize {
        self.lock().confirm_calls
    }

    pub fn cancel_calls(&self) -> usize {
        self.lock().cancel_calls
    }

    pub fn list_calls(&self) -> usize {
        self.lock().list_calls
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Overwrite the remote status of `id` behind the tracker's back.
    pub fn set_status(&self, id: &str, status: Status) {
        let mut inner = self.lock();
        inner.timelines.remove(id);
        if let Some(snap) = inner.current.get_mut(id) {
            snap.status = status;
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap()
    }

    async fn enter(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    fn leave(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    fn check_failure(inner: &Inner, id: &str) -> Result<(), ClientError> {
        match inner.failures.get(id) {
            Some(Failure::Network) => Err(ClientError::Network(format!("{id}: connection reset"))),
            Some(Failure::NotFound) => Err(ClientError::NotFound(id.to_string())),
            None => Ok(()),
        }
    }

    fn apply_action(&self, id: &str, allowed: fn(&Status) -> bool, next: Status) -> Result<(), ClientError> {
        let mut inner = self.lock();
        Self::check_failure(&inner, id)?;
        inner.timelines.remove(id);
        let snap = inner
            .current
            .get_mut(id)
            .ok_or_else(|| ClientError::NotFound(id.to_string()))?;
        if !allowed(&snap.status) {
            return Err(ClientError::InvalidState(format!("{id} is {}", snap.status)));
        }
        snap.status = next;
        Ok(())
    }
}

impl ExecutionClient for MockClient {
    async fn get_execution(&self, id: &str) -> Result<Snapshot, ClientError> {
        self.enter().await;
        let result = {
            let mut inner = self.lock();
            *inner.get_calls.entry(id.to_string()).or_insert(0) += 1;
            match Self::check_failure(&inner, id) {
                Err(e) => Err(e),
                Ok(()) => {
                    let remaining = inner.flaky.get(id).copied().unwrap_or(0);
                    if remaining > 0 {
                        inner.flaky.insert(id.to_string(), remaining - 1);
                        Err(ClientError::Network(format!("{id}: flaky")))
                    } else {
                        let next = inner.timelines.get_mut(id).and_then(|timeline| {
                            let status = timeline.front().cloned();
                            if timeline.len() > 1 {
                                timeline.pop_front();
                            }
                            status
                        });
                        match inner.current.get_mut(id) {
                            Some(snap) => {
                                if let Some(status) = next {
                                    snap.status = status;
                                }
                                Ok(snap.clone())
                            }
                            None => Err(ClientError::NotFound(id.to_string())),
                        }
                    }
                }
            }
        };
        self.leave();
        result
    }

    async fn list_executions(
        &self,
        _criteria: &ListCriteria,
        page: u32,
        page_size: u32,
    ) -> Result<ExecutionPage, ClientError> {
        let mut inner = self.lock();
        inner.list_calls += 1;
        let start = (page as usize) * (page_size as usize);
        let data: Vec<Snapshot> = inner
            .listing
            .iter()
            .skip(start)
            .take(page_size as usize)
            .cloned()
            .collect();
        let count = inner.list_count.unwrap_or(inner.listing.len() as u64);
        Ok(ExecutionPage { count, data })
    }

    async fn confirm_execution(&self, id: &str) -> Result<(), ClientError> {
        self.enter().await;
        let result = {
            self.lock().confirm_calls += 1;
            self.apply_action(id, Status::can_confirm, Status::Running)
        };
        self.leave();
        result
    }

    async fn cancel_execution(&self, id: &str) -> Result<(), ClientError> {
        self.enter().await;
        let result = {
            self.lock().cancel_calls += 1;
            self.apply_action(id, Status::can_cancel, Status::Cancelled)
        };
        self.leave();
        result
    }
}
