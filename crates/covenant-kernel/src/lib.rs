//! Covenant Kernel - decision orchestrator for AI-agent side effects
//!
//! The kernel runs an ordered chain of guardrail gates (assumptions,
//! environment, consent, role, auth, risk, budget, confidence, mandate)
//! over every intent before delegating to a handler. Each gate appends
//! one proof; the first failing gate short-circuits. Gate failures are
//! data, not exceptions: every run returns a structured
//! [`KernelRunReport`] and appends one immutable audit record.
//!
//! # Key Principle
//!
//! **Fail closed, record everything.** Blocked and excepted paths still
//! write their Decision/Outcome pair so the audit trail is complete.

pub mod constraints;
pub mod handler;
pub mod kernel;
pub mod record;
pub mod report;
pub mod services;

pub use constraints::{Assumption, BackendConfig, ConsentFlags, Constraints, Intent};
pub use handler::{
    classify_handler_response, HandlerError, HandlerFailure, HandlerOutcome, HandlerRegistry,
    HandlerResponse, IntentHandler,
};
pub use kernel::{DecisionKernel, KernelConfig};
pub use record::{ActionRecord, DecisionRecord, OutcomeRecord, OutcomeStatus, Verdict};
pub use report::{KernelErrorInfo, KernelRunReport, RunStatus};
pub use services::{
    AssumptionCheck, CollectiveMemory, CollectiveMemoryError, DecisionRecall, PersistedRecord,
    RiskAction, RiskAssessment, RiskGateResult, RiskService, WriteMeta,
};
