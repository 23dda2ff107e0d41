//! Immutable point-in-time record of an execution.
//!
//! The remote returns a loosely-typed execution record. [`Snapshot`] keeps the
//! fields the tracker reasons about as typed fields and folds everything else
//! into an ordered attribute map, so filters can still match on arbitrary
//! remote fields such as `approveAmount` or `metadata`.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::progress::ProgressReport;
use crate::state_machine::Status;

/// The tool that produced an execution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tool {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "WireSnapshot")]
pub struct Snapshot {
    pub id: String,
    pub status: Status,
    pub tool: Tool,
    pub attributes: Map<String, Value>,
    pub progress_report: Value,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Execution record as it arrives over the wire.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireSnapshot {
    #[serde(default)]
    id: Option<String>,
    status: Status,
    #[serde(default)]
    tool: Option<Tool>,
    #[serde(default)]
    attributes: Option<Map<String, Value>>,
    #[serde(default)]
    progress_report: Value,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    rest: Map<String, Value>,
}

/// The platform names the id `executionId`; it also stays in `attributes`
/// so filters can match on it.
impl TryFrom<WireSnapshot> for Snapshot {
    type Error = String;

    fn try_from(wire: WireSnapshot) -> Result<Self, Self::Error> {
        let id = wire
            .id
            .or_else(|| {
                wire.rest
                    .get("executionId")
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .ok_or_else(|| "execution record has neither `id` nor `executionId`".to_string())?;
        let mut attributes = wire.attributes.unwrap_or_default();
        for (key, value) in wire.rest {
            attributes.entry(key).or_insert(value);
        }
        Ok(Self {
            id,
            status: wire.status,
            tool: wire.tool.unwrap_or_default(),
            attributes,
            progress_report: wire.progress_report,
            created_at: wire.created_at,
            updated_at: wire.updated_at,
        })
    }
}

impl Snapshot {
    pub fn new(id: impl Into<String>, status: Status) -> Self {
        Self {
            id: id.into(),
            status,
            tool: Tool::default(),
            attributes: Map::new(),
            progress_report: Value::Null,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn with_tool(mut self, key: impl Into<String>, version: impl Into<String>) -> Self {
        self.tool = Tool {
            key: key.into(),
            version: version.into(),
        };
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    pub fn with_progress_report(mut self, report: Value) -> Self {
        self.progress_report = report;
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Parse the progress report for this snapshot's tool. Never fails; an
    /// unknown tool or malformed payload yields [`ProgressReport::Opaque`].
    pub fn progress(&self) -> ProgressReport {
        ProgressReport::parse(&self.tool.key, &self.progress_report, &self.attributes)
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.timestamp_attribute("startedAt")
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.timestamp_attribute("completedAt")
    }

    /// Wall-clock run time, only once both start and completion are known.
    pub fn running_time(&self) -> Option<Duration> {
        Some(self.completed_at()? - self.started_at()?)
    }

    fn timestamp_attribute(&self, key: &str) -> Option<DateTime<Utc>> {
        let raw = self.attributes.get(key)?.as_str()?;
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}
