//! External collaborator traits: risk service and collective memory
//!
//! Implementations are out of scope for the kernel; tests and callers
//! supply them. Both are consumed behind `Arc<dyn ...>` and awaited
//! sequentially, so gate evaluation has no parallel fan-out.

use async_trait::async_trait;
use covenant_types::RiskLevel;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::constraints::{Constraints, Intent};
use crate::record::{ActionRecord, DecisionRecord, OutcomeRecord};

/// Freshness verdict over the caller's declared assumptions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssumptionCheck {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl AssumptionCheck {
    pub fn fresh() -> Self {
        Self {
            ok: true,
            reason_code: None,
            detail: None,
        }
    }

    pub fn stale(reason_code: impl Into<String>) -> Self {
        Self {
            ok: false,
            reason_code: Some(reason_code.into()),
            detail: None,
        }
    }
}

/// What the risk engine wants done with the intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskAction {
    Allow,
    Noop,
    Block,
}

/// The risk engine's assessment of one intent in context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub score: f64,
    pub level: RiskLevel,
    pub reason: String,
    /// Suggested spend cap for this intent
    pub budget_cents: u64,
}

impl Default for RiskAssessment {
    fn default() -> Self {
        Self {
            score: 0.0,
            level: RiskLevel::Low,
            reason: "baseline".to_string(),
            budget_cents: 0,
        }
    }
}

/// Risk gate output: an action plus the assessment behind it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskGateResult {
    pub action: RiskAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason_code: Option<String>,
    pub assessment: RiskAssessment,
}

impl RiskGateResult {
    pub fn allow(assessment: RiskAssessment) -> Self {
        Self {
            action: RiskAction::Allow,
            reason_code: None,
            assessment,
        }
    }
}

/// Risk/consent collaborator.
#[async_trait]
pub trait RiskService: Send + Sync {
    /// Check the caller's declared assumptions for freshness. A failure
    /// degrades the run to a noop, never an error.
    async fn evaluate_assumptions(&self, constraints: &Constraints) -> AssumptionCheck;

    /// Score the intent and derive an action.
    async fn evaluate_risk_gate(
        &self,
        intent: &Intent,
        context: &Value,
        constraints: &Constraints,
    ) -> RiskGateResult;
}

/// Recall of prior decisions about an intent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DecisionRecall {
    pub matches: Vec<Value>,
    pub failures: u32,
    pub unknown: u32,
}

/// Attribution attached to every collective-memory write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriteMeta {
    pub actor: String,
    pub rationale: String,
}

/// A record the collective memory has durably assigned an id to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedRecord {
    pub id: String,
}

/// Collective-memory write failures. The kernel treats these as
/// fail-soft: the run proceeds and the audit trail still records it.
#[derive(Debug, Clone, Error)]
#[error("collective memory write failed: {0}")]
pub struct CollectiveMemoryError(pub String);

/// Durable record of decisions, actions and outcomes across runs.
#[async_trait]
pub trait CollectiveMemory: Send + Sync {
    async fn recall_decisions(&self, intent: &Intent) -> DecisionRecall;

    async fn write_decision(
        &self,
        record: DecisionRecord,
        meta: &WriteMeta,
    ) -> Result<PersistedRecord, CollectiveMemoryError>;

    async fn write_action(
        &self,
        record: ActionRecord,
        meta: &WriteMeta,
    ) -> Result<PersistedRecord, CollectiveMemoryError>;

    async fn write_outcome(
        &self,
        record: OutcomeRecord,
        meta: &WriteMeta,
    ) -> Result<PersistedRecord, CollectiveMemoryError>;
}
