use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::state_machine::{Job, Status};

/// Flat, serializable view of one member of a list.
///
/// Unsynced members produce a row with only `id` set.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSummary {
    pub id: String,
    pub status: Option<Status>,
    pub tool_key: Option<String>,
    pub tool_version: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub approve_amount: Option<f64>,
    pub run_minutes: Option<i64>,
}

impl JobSummary {
    pub fn from_job<C>(job: &Job<C>) -> Self {
        let Some(snap) = job.snapshot() else {
            return Self {
                id: job.id().to_string(),
                ..Default::default()
            };
        };
        Self {
            id: snap.id.clone(),
            status: Some(snap.status.clone()),
            tool_key: non_empty(&snap.tool.key),
            tool_version: non_empty(&snap.tool.version),
            created_at: snap.created_at,
            updated_at: snap.updated_at,
            started_at: snap.started_at(),
            completed_at: snap.completed_at(),
            approve_amount: snap.attribute("approveAmount").and_then(|v| v.as_f64()),
            run_minutes: snap.running_time().map(|d| d.num_minutes()),
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}
