//! Decision / Action / Outcome causal triple
//!
//! A Decision records why a path was chosen, an Action what was
//! attempted (referencing its Decision), and an Outcome the terminal
//! result (referencing both). Every Outcome references an existing
//! Decision id; noop and blocked paths carry no Action.

use covenant_types::Proof;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Why a path was chosen, rendered as `allow:execute`,
/// `blocked:<code>`, `dry_run` or `noop:<code>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "code")]
pub enum Verdict {
    AllowExecute,
    Blocked(String),
    DryRun,
    Noop(String),
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::AllowExecute => f.write_str("allow:execute"),
            Verdict::Blocked(code) => write!(f, "blocked:{code}"),
            Verdict::DryRun => f.write_str("dry_run"),
            Verdict::Noop(code) => write!(f, "noop:{code}"),
        }
    }
}

/// Why a path was chosen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub intent: String,
    pub verdict: Verdict,
    pub detail: String,
    pub proofs: Vec<Proof>,
}

/// What was attempted. References its Decision by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRecord {
    pub intent: String,
    pub decision_id: String,
    pub payload: Value,
}

/// Terminal result of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Success,
    Failure,
    Unknown,
}

/// The terminal result. References the Decision and, when an execution
/// was attempted, the Action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomeRecord {
    pub decision_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_id: Option<String>,
    pub status: OutcomeStatus,
    pub detail: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verdict_renders() {
        assert_eq!(Verdict::AllowExecute.to_string(), "allow:execute");
        assert_eq!(Verdict::Blocked("consent_denied".to_string()).to_string(), "blocked:consent_denied");
        assert_eq!(Verdict::DryRun.to_string(), "dry_run");
        assert_eq!(Verdict::Noop("low_confidence".to_string()).to_string(), "noop:low_confidence");
    }
}
