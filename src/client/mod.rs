//! Remote-call boundary for the execution API.
//!
//! Everything the tracker knows about remote executions comes through
//! [`ExecutionClient`]. [`HttpExecutionClient`] is the production
//! implementation; tests use an in-memory scripted client.

pub mod error;
pub mod http;
pub mod types;

#[cfg(test)]
pub(crate) mod mock;

use std::future::Future;

pub use error::ClientError;
pub use http::HttpExecutionClient;
pub use types::{ExecutionPage, ListCriteria, Pagination};

use crate::snapshot::Snapshot;

/// Operations the tracker needs from the remote platform.
///
/// Implementations must be shareable across tasks: bulk operations call them
/// concurrently from a `JoinSet`.
pub trait ExecutionClient: Send + Sync + 'static {
    fn get_execution(&self, id: &str) -> impl Future<Output = Result<Snapshot, ClientError>> + Send;

    fn list_executions(
        &self,
        criteria: &ListCriteria,
        page: u32,
        page_size: u32,
    ) -> impl Future<Output = Result<ExecutionPage, ClientError>> + Send;

    fn confirm_execution(&self, id: &str) -> impl Future<Output = Result<(), ClientError>> + Send;

    fn cancel_execution(&self, id: &str) -> impl Future<Output = Result<(), ClientError>> + Send;
}
