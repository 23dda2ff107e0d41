use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

use crate::client::ClientError;
use crate::state_machine::{Action, Status};

#[derive(Debug, Error)]
pub enum JobError {
    #[error("Execution not found: {0}")]
    NotFound(String),

    #[error("Cannot {action} execution {id} in the '{status}' state")]
    InvalidState {
        id: String,
        action: Action,
        status: Status,
    },

    #[error("Network error on execution {id}: {message}")]
    Network { id: String, message: String },

    #[error("Execution {0} has not been synced yet")]
    NotSynced(String),

    #[error("Remote error on execution {id}: {message}")]
    Remote { id: String, message: String },
}

impl JobError {
    /// Attach the execution id and classify a transport error.
    ///
    /// `action` is what the caller tried to do; a remote-side rejection of it
    /// becomes [`JobError::InvalidState`] with the status last seen locally.
    pub fn from_client(id: &str, err: ClientError, rejected: Option<(Action, Status)>) -> Self {
        match err {
            ClientError::NotFound(_) => JobError::NotFound(id.to_string()),
            ClientError::InvalidState(message) => match rejected {
                Some((action, status)) => JobError::InvalidState {
                    id: id.to_string(),
                    action,
                    status,
                },
                None => JobError::Remote {
                    id: id.to_string(),
                    message,
                },
            },
            ClientError::Network(_) | ClientError::Timeout(_) => JobError::Network {
                id: id.to_string(),
                message: err.to_string(),
            },
            ClientError::Api { .. } | ClientError::Decode(_) => JobError::Remote {
                id: id.to_string(),
                message: err.to_string(),
            },
        }
    }
}

/// Outcome of a bulk operation in which at least one member failed.
///
/// Successful members keep whatever the operation did to them; `succeeded`
/// lists them so callers can act on partial completion.
#[derive(Debug, Default)]
pub struct AggregateError {
    pub succeeded: Vec<String>,
    pub failed: BTreeMap<String, JobError>,
}

impl AggregateError {
    pub fn get(&self, id: &str) -> Option<&JobError> {
        self.failed.get(id)
    }

    pub fn failed_ids(&self) -> impl Iterator<Item = &str> {
        self.failed.keys().map(String::as_str)
    }
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} executions failed",
            self.failed.len(),
            self.failed.len() + self.succeeded.len()
        )?;
        for (id, err) in &self.failed {
            write!(f, "; {id}: {err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for AggregateError {}
