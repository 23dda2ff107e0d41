//! Client-side lifecycle tracking for remote compute executions.
//!
//! A [`Job`] mirrors one remote execution: it syncs snapshots, enforces the
//! status state machine locally before confirming or cancelling, and can poll
//! until the execution is terminal. A [`JobList`] does the same for batches,
//! with bounded concurrency, partial-failure reporting and a cancellable
//! background [`Watcher`].

pub mod client;
pub mod config;
pub mod error;
pub mod job_list;
pub mod progress;
pub mod snapshot;
pub mod state_machine;

pub use client::{ClientError, ExecutionClient, HttpExecutionClient, ListCriteria, Pagination};
pub use config::TrackerConfig;
pub use error::{AggregateError, JobError};
pub use job_list::{JobFilter, JobList, JobListOptions, JobSummary, WatchUpdate, Watcher};
pub use progress::ProgressReport;
pub use snapshot::{Snapshot, Tool};
pub use state_machine::{Action, Job, RetryConfig, Status};
