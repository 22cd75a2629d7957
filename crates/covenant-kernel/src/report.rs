//! Structured run reports
//!
//! Callers branch on `ok` first, then on `status == noop` before
//! treating a true result as a real execution.

use covenant_types::Proof;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Terminal state of a kernel run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Executed,
    Noop,
    DryRun,
    Blocked,
}

/// Stable error surface for blocked and excepted runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernelErrorInfo {
    pub code: String,
    pub message: String,
}

/// The one shape every kernel run returns. Gate failures are data:
/// `run` itself never returns an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KernelRunReport {
    pub ok: bool,
    pub status: RunStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<KernelErrorInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    pub proofs: Vec<Proof>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision_id: Option<String>,
}

impl KernelRunReport {
    pub fn executed(result: Value, proofs: Vec<Proof>, decision_id: Option<String>) -> Self {
        Self {
            ok: true,
            status: RunStatus::Executed,
            reason_code: None,
            error: None,
            result: Some(result),
            proofs,
            decision_id,
        }
    }

    pub fn noop(reason_code: impl Into<String>, proofs: Vec<Proof>, decision_id: Option<String>) -> Self {
        Self {
            ok: true,
            status: RunStatus::Noop,
            reason_code: Some(reason_code.into()),
            error: None,
            result: None,
            proofs,
            decision_id,
        }
    }

    pub fn dry_run(result: Value, proofs: Vec<Proof>, decision_id: Option<String>) -> Self {
        Self {
            ok: true,
            status: RunStatus::DryRun,
            reason_code: None,
            error: None,
            result: Some(result),
            proofs,
            decision_id,
        }
    }

    /// An execution that ran but failed (domain or transport). Distinct
    /// from `blocked`: the gates all passed and an Action was recorded.
    pub fn execution_failed(
        code: impl Into<String>,
        message: impl Into<String>,
        result: Option<Value>,
        proofs: Vec<Proof>,
        decision_id: Option<String>,
    ) -> Self {
        let code = code.into();
        Self {
            ok: false,
            status: RunStatus::Executed,
            reason_code: Some(code.clone()),
            error: Some(KernelErrorInfo {
                code,
                message: message.into(),
            }),
            result,
            proofs,
            decision_id,
        }
    }

    pub fn blocked(
        code: impl Into<String>,
        message: impl Into<String>,
        proofs: Vec<Proof>,
        decision_id: Option<String>,
    ) -> Self {
        let code = code.into();
        Self {
            ok: false,
            status: RunStatus::Blocked,
            reason_code: Some(code.clone()),
            error: Some(KernelErrorInfo {
                code,
                message: message.into(),
            }),
            result: None,
            proofs,
            decision_id,
        }
    }
}
