//! Request and response shapes for the execution listing endpoint.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::snapshot::Snapshot;
use crate::state_machine::Status;

/// Server-side filter for `ListExecutions`.
///
/// Serialized into the platform's query language, e.g.
/// `{"status": {"$in": ["Running"]}, "tool": {"toolManifest": {"key": "..."}}}`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListCriteria {
    pub statuses: Vec<Status>,
    pub tool_key: Option<String>,
    /// Only executions whose `metadata` is present and non-null.
    pub require_metadata: bool,
    /// Sort expression, e.g. `"completedAt? desc"`.
    pub order: Option<String>,
}

impl ListCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: Status) -> Self {
        self.statuses.push(status);
        self
    }

    pub fn tool_key(mut self, key: impl Into<String>) -> Self {
        self.tool_key = Some(key.into());
        self
    }

    pub fn require_metadata(mut self) -> Self {
        self.require_metadata = true;
        self
    }

    pub fn order(mut self, order: impl Into<String>) -> Self {
        self.order = Some(order.into());
        self
    }

    /// JSON filter string, or `None` when nothing constrains the listing.
    pub fn to_filter(&self) -> Option<String> {
        let mut filter = Map::new();
        if !self.statuses.is_empty() {
            let statuses: Vec<&str> = self.statuses.iter().map(Status::as_str).collect();
            filter.insert("status".into(), json!({ "$in": statuses }));
        }
        if self.require_metadata {
            filter.insert("metadata".into(), json!({ "$exists": true, "$ne": null }));
        }
        if let Some(key) = &self.tool_key {
            filter.insert("tool".into(), json!({ "toolManifest": { "key": key } }));
        }
        if filter.is_empty() {
            None
        } else {
            Some(Value::Object(filter).to_string())
        }
    }
}

/// One page of a listing plus the total row count the server reports.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionPage {
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub data: Vec<Snapshot>,
}

/// How many pages `JobList::list` should walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
    /// Stop after this many pages even if the server reports more rows.
    pub max_pages: Option<u32>,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 0,
            page_size: 1000,
            max_pages: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_criteria_has_no_filter() {
        assert_eq!(ListCriteria::new().to_filter(), None);
        assert_eq!(ListCriteria::new().order("createdAt? desc").to_filter(), None);
    }

    #[test]
    fn criteria_builds_platform_filter() {
        let criteria = ListCriteria::new()
            .status(Status::Running)
            .status(Status::Other("Queued".into()))
            .tool_key("deeporigin.docking")
            .require_metadata();
        let filter: Value = serde_json::from_str(&criteria.to_filter().unwrap()).unwrap();
        assert_eq!(filter["status"]["$in"], json!(["Running", "Queued"]));
        assert_eq!(filter["tool"]["toolManifest"]["key"], "deeporigin.docking");
        assert_eq!(filter["metadata"]["$exists"], true);
    }

    #[test]
    fn page_decodes_platform_listing() {
        let page: ExecutionPage = serde_json::from_value(json!({
            "count": 2,
            "data": [
                {"executionId": "a", "status": "Quoted"},
                {"executionId": "b", "status": "Running"}
            ]
        }))
        .unwrap();
        assert_eq!(page.count, 2);
        assert_eq!(page.data[1].id, "b");
    }

    #[test]
    fn default_pagination() {
        let p = Pagination::default();
        assert_eq!(p.page, 0);
        assert_eq!(p.page_size, 1000);
        assert!(p.max_pages.is_none());
    }
}
