//! Covenant Mandate - signed approval tokens for high-risk intents
//!
//! A mandate is a multi-approver, time-bounded authorization token. The
//! payload is canonicalized (recursively key-sorted JSON), signed with
//! HMAC-SHA256, and validated through a fixed, ordered check chain where
//! the first failure wins.
//!
//! # Security Invariant
//!
//! **A missing crypto primitive is a failure, never a silent pass.**
//!
//! Validation never panics and never returns `Err`; it always produces a
//! structured [`MandateValidation`] with a machine-readable code.

pub mod canonical;
pub mod token;
pub mod validate;

pub use canonical::canonical_json;
pub use token::{
    issue, required_approvals_for_risk, sign_payload, MandateApproval, MandatePayload, MandateToken,
};
pub use validate::{validate, ApprovalCounts, MandateValidation, ValidateOptions, ValidationCode};

use thiserror::Error;

/// Mandate signing errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MandateError {
    #[error("HMAC primitive unavailable")]
    CryptoUnavailable,

    #[error("Payload canonicalization failed: {0}")]
    Canonicalization(String),
}

pub type MandateResult<T> = Result<T, MandateError>;
