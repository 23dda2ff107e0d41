//! Tool-specific progress reports.
//!
//! The platform attaches an untyped `progressReport` to each execution whose
//! shape depends on the tool. [`ProgressReport::parse`] dispatches on the tool
//! key; anything it does not understand is passed through as
//! [`ProgressReport::Opaque`].

use serde::Deserialize;
use serde_json::{Map, Value};

pub const TOOL_DOCKING: &str = "deeporigin.docking";
pub const TOOL_BULK_DOCKING: &str = "deeporigin.bulk-docking";
pub const TOOL_ABFE: &str = "deeporigin.abfe-end-to-end";
pub const TOOL_RBFE: &str = "deeporigin.rbfe-end-to-end";

const FEP_RESULTS_CMD: &str = "FEP Results";
const DEFAULT_ENERGY_UNIT: &str = "kcal/mol";

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressReport {
    /// No report yet (typically a quoted or freshly started execution).
    Empty,
    Docking(DockingProgress),
    Fep(FepProgress),
    /// Unknown tool or a payload that did not match the tool's format.
    Opaque(Value),
}

/// Docking reports are newline-delimited text, one line per docked ligand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DockingProgress {
    pub docked: usize,
    /// Number of ligands submitted, from `userInputs.smiles_list`.
    pub total: Option<usize>,
}

impl DockingProgress {
    pub fn fraction(&self) -> Option<f64> {
        match self.total {
            Some(0) | None => None,
            Some(total) => Some(self.docked.min(total) as f64 / total as f64),
        }
    }
}

/// Free-energy (ABFE/RBFE) progress: either a running stage or final results.
#[derive(Debug, Clone, PartialEq)]
pub enum FepProgress {
    Stage {
        cmd: String,
        sub_step: Option<String>,
        current_step: Option<f64>,
        target_step: Option<f64>,
    },
    Results {
        /// Total ΔG; absent when the report omits it.
        delta_g: Option<f64>,
        unit: String,
    },
}

#[derive(Debug, Deserialize)]
struct RawFepReport {
    cmd: String,
    #[serde(default)]
    sub_step: Option<String>,
    #[serde(default)]
    current_avg_step: Option<f64>,
    #[serde(default)]
    target_step: Option<f64>,
    #[serde(default, rename = "Total")]
    total: Option<f64>,
    #[serde(default)]
    unit: Option<String>,
}

impl ProgressReport {
    pub fn parse(tool_key: &str, raw: &Value, attributes: &Map<String, Value>) -> Self {
        if is_empty(raw) {
            return ProgressReport::Empty;
        }
        let parsed = match tool_key {
            TOOL_DOCKING | TOOL_BULK_DOCKING => parse_docking(raw, attributes),
            TOOL_ABFE | TOOL_RBFE => parse_fep(raw),
            _ => None,
        };
        parsed.unwrap_or_else(|| ProgressReport::Opaque(raw.clone()))
    }

    pub fn is_complete(&self) -> bool {
        match self {
            ProgressReport::Docking(d) => d.total.is_some_and(|t| d.docked >= t),
            ProgressReport::Fep(FepProgress::Results { .. }) => true,
            _ => false,
        }
    }
}

fn is_empty(raw: &Value) -> bool {
    match raw {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn parse_docking(raw: &Value, attributes: &Map<String, Value>) -> Option<ProgressReport> {
    let text = raw.as_str()?;
    let docked = text.lines().filter(|line| !line.trim().is_empty()).count();
    let total = attributes
        .get("userInputs")
        .and_then(|inputs| inputs.get("smiles_list"))
        .and_then(Value::as_array)
        .map(Vec::len);
    Some(ProgressReport::Docking(DockingProgress { docked, total }))
}

fn parse_fep(raw: &Value) -> Option<ProgressReport> {
    // The platform sends the report either as an object or JSON-encoded text.
    let report: RawFepReport = match raw {
        Value::String(text) => serde_json::from_str(text).ok()?,
        other => serde_json::from_value(other.clone()).ok()?,
    };
    let progress = if report.cmd == FEP_RESULTS_CMD {
        FepProgress::Results {
            delta_g: report.total,
            unit: report.unit.unwrap_or_else(|| DEFAULT_ENERGY_UNIT.to_string()),
        }
    } else {
        FepProgress::Stage {
            cmd: report.cmd,
            sub_step: report.sub_step,
            current_step: report.current_avg_step,
            target_step: report.target_step,
        }
    };
    Some(ProgressReport::Fep(progress))
}
