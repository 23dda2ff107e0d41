use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lifecycle status of a remote execution, as reported by the platform.
///
/// Each execution flows through: QUOTED → RUNNING → SUCCEEDED | FAILED,
/// with CANCELLED reachable from QUOTED and RUNNING. Values the client does
/// not know about are kept verbatim in [`Status::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Status {
    Quoted,
    Running,
    Succeeded,
    Failed,
    Cancelled,
    Other(String),
}

/// An action the client can ask the remote to perform on an execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Confirm,
    Cancel,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Confirm => write!(f, "confirm"),
            Action::Cancel => write!(f, "cancel"),
        }
    }
}

impl Status {
    pub fn as_str(&self) -> &str {
        match self {
            Status::Quoted => "Quoted",
            Status::Running => "Running",
            Status::Succeeded => "Succeeded",
            Status::Failed => "Failed",
            Status::Cancelled => "Cancelled",
            Status::Other(raw) => raw,
        }
    }

    /// `Succeeded`, `Failed` and `Cancelled` are absorbing.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Succeeded | Status::Failed | Status::Cancelled)
    }

    pub fn can_confirm(&self) -> bool {
        matches!(self, Status::Quoted)
    }

    pub fn can_cancel(&self) -> bool {
        matches!(self, Status::Quoted | Status::Running)
    }

    /// Whether `action` is permitted given this last-known status.
    pub fn permits(&self, action: Action) -> bool {
        match action {
            Action::Confirm => self.can_confirm(),
            Action::Cancel => self.can_cancel(),
        }
    }

    /// The legal transition table.
    ///
    /// - `Quoted → Running` after a confirm is accepted remotely.
    /// - `Quoted | Running → Cancelled` after a cancel.
    /// - `Running → Succeeded | Failed`, driven by the remote only.
    ///
    /// Staying in the same status is always legal. Unknown statuses may move
    /// anywhere except back out of a terminal state.
    pub fn can_transition(from: &Status, to: &Status) -> bool {
        if from == to {
            return true;
        }
        match (from, to) {
            (f, _) if f.is_terminal() => false,
            (Status::Quoted, Status::Running | Status::Cancelled) => true,
            (Status::Running, Status::Succeeded | Status::Failed | Status::Cancelled) => true,
            (Status::Other(_), _) | (_, Status::Other(_)) => true,
            _ => false,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Status {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "Quoted" => Status::Quoted,
            "Running" => Status::Running,
            "Succeeded" => Status::Succeeded,
            "Failed" => Status::Failed,
            "Cancelled" => Status::Cancelled,
            _ => Status::Other(raw),
        }
    }
}

impl From<&str> for Status {
    fn from(raw: &str) -> Self {
        Status::from(raw.to_string())
    }
}

impl From<Status> for String {
    fn from(status: Status) -> Self {
        match status {
            Status::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl FromStr for Status {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Status::from(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_KNOWN: [Status; 5] = [
        Status::Quoted,
        Status::Running,
        Status::Succeeded,
        Status::Failed,
        Status::Cancelled,
    ];

    #[test]
    fn terminal_states() {
        assert!(!Status::Quoted.is_terminal());
        assert!(!Status::Running.is_terminal());
        assert!(Status::Succeeded.is_terminal());
        assert!(Status::Failed.is_terminal());
        assert!(Status::Cancelled.is_terminal());
        assert!(!Status::Other("Queued".into()).is_terminal());
    }

    #[test]
    fn confirm_only_from_quoted() {
        for status in ALL_KNOWN {
            assert_eq!(status.can_confirm(), status == Status::Quoted, "{status}");
        }
        assert!(!Status::Other("Created".into()).can_confirm());
    }

    #[test]
    fn cancel_from_quoted_or_running() {
        assert!(Status::Quoted.can_cancel());
        assert!(Status::Running.can_cancel());
        assert!(!Status::Succeeded.can_cancel());
        assert!(!Status::Failed.can_cancel());
        assert!(!Status::Cancelled.can_cancel());
        assert!(Status::Quoted.permits(Action::Cancel));
        assert!(!Status::Running.permits(Action::Confirm));
    }

    #[test]
    fn terminal_is_absorbing_in_transition_table() {
        for from in ALL_KNOWN.iter().filter(|s| s.is_terminal()) {
            for to in ALL_KNOWN.iter().filter(|s| *s != from) {
                assert!(!Status::can_transition(from, to), "{from} -> {to}");
            }
            assert!(!Status::can_transition(from, &Status::Other("Queued".into())));
        }
    }

    #[test]
    fn legal_forward_transitions() {
        assert!(Status::can_transition(&Status::Quoted, &Status::Running));
        assert!(Status::can_transition(&Status::Quoted, &Status::Cancelled));
        assert!(Status::can_transition(&Status::Running, &Status::Succeeded));
        assert!(Status::can_transition(&Status::Running, &Status::Failed));
        assert!(!Status::can_transition(&Status::Quoted, &Status::Succeeded));
        assert!(!Status::can_transition(&Status::Running, &Status::Quoted));
    }

    #[test]
    fn unknown_status_is_preserved() {
        let status: Status = serde_json::from_str(r#""Queued""#).unwrap();
        assert_eq!(status, Status::Other("Queued".into()));
        assert_eq!(serde_json::to_string(&status).unwrap(), r#""Queued""#);
        assert_eq!(status.to_string(), "Queued");
    }

    #[test]
    fn status_display() {
        assert_eq!(Status::Quoted.to_string(), "Quoted");
        assert_eq!(Status::Cancelled.to_string(), "Cancelled");
        assert_eq!("Running".parse::<Status>().unwrap(), Status::Running);
    }
}
