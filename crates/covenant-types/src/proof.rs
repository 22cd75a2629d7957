//! Gate proof records
//!
//! Each kernel gate appends exactly one proof to the run's proof list,
//! in evaluation order. The order is itself a guaranteed invariant.

use serde::{Deserialize, Serialize};

/// One gate's pass/fail record within a single kernel run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    /// Name of the gate that was evaluated
    pub check: String,
    /// Whether the gate passed
    pub ok: bool,
    /// Human-readable detail for the audit trail
    pub detail: String,
}

impl Proof {
    pub fn pass(check: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            check: check.into(),
            ok: true,
            detail: detail.into(),
        }
    }

    pub fn fail(check: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            check: check.into(),
            ok: false,
            detail: detail.into(),
        }
    }
}
