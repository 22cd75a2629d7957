//! Ordered mandate validation
//!
//! Eight checks, first failure wins, each with a distinct code. The
//! validation never panics and never throws; every outcome is a
//! structured [`MandateValidation`], and approval counts are reported
//! even on failure so callers can observe how close a mandate was.

use chrono::{DateTime, Utc};
use covenant_types::RiskLevel;
use serde::{Deserialize, Serialize};

use crate::token::{sign_payload, MandateToken};
use crate::MandateError;

/// Distinct outcome codes, one per validation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationCode {
    MandateMissing,
    MandateInvalid,
    IntentMismatch,
    RiskLevelMismatch,
    MandateTimeInvalid,
    MandateExpired,
    ApprovalsInsufficient,
    MissingSecret,
    SignatureInvalid,
    CryptoUnavailable,
    MandateOk,
}

impl ValidationCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationCode::MandateMissing => "mandate_missing",
            ValidationCode::MandateInvalid => "mandate_invalid",
            ValidationCode::IntentMismatch => "intent_mismatch",
            ValidationCode::RiskLevelMismatch => "risk_level_mismatch",
            ValidationCode::MandateTimeInvalid => "mandate_time_invalid",
            ValidationCode::MandateExpired => "mandate_expired",
            ValidationCode::ApprovalsInsufficient => "approvals_insufficient",
            ValidationCode::MissingSecret => "missing_secret",
            ValidationCode::SignatureInvalid => "signature_invalid",
            ValidationCode::CryptoUnavailable => "crypto_unavailable",
            ValidationCode::MandateOk => "mandate_ok",
        }
    }
}

/// Approval counts reported on every validation, pass or fail.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalCounts {
    /// `max(minApprovals, required_approvals_for_risk(riskLevel))`
    pub required: u32,
    /// Total approvals on the payload
    pub provided: u32,
    /// Distinct approver ids
    pub unique: u32,
}

/// Structured validation outcome. Validation never throws.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MandateValidation {
    pub ok: bool,
    pub code: ValidationCode,
    pub signature_valid: bool,
    pub expired: bool,
    pub approvals: ApprovalCounts,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl MandateValidation {
    fn fail(code: ValidationCode, approvals: ApprovalCounts, detail: impl Into<String>) -> Self {
        Self {
            ok: false,
            code,
            signature_valid: false,
            expired: false,
            approvals,
            detail: Some(detail.into()),
        }
    }
}

/// Expectations the caller imposes on a token.
#[derive(Debug, Clone, Default)]
pub struct ValidateOptions {
    /// Intent the mandate must name, if the caller knows it
    pub expected_intent: Option<String>,
    /// Minimum risk level the mandate must carry
    pub min_risk_level: Option<RiskLevel>,
    /// Shared secret for signature recomputation
    pub secret: Option<String>,
    /// Validation instant; defaults to `Utc::now()` when `None`
    pub now: Option<DateTime<Utc>>,
}

/// Run the ordered validation chain over a token.
pub fn validate(token: Option<&MandateToken>, options: &ValidateOptions) -> MandateValidation {
    // 1. Structural presence
    let token = match token {
        Some(t) if !t.signature.trim().is_empty() => t,
        _ => {
            return MandateValidation::fail(
                ValidationCode::MandateMissing,
                ApprovalCounts::default(),
                "token, payload or signature absent",
            )
        }
    };

    let payload = &token.payload;
    let approvals = ApprovalCounts {
        required: payload.required_approvals(),
        provided: payload.approvals.len() as u32,
        unique: payload.unique_approvers(),
    };

    // 2. Required fields non-empty
    let required_fields = [
        ("mandateId", &payload.mandate_id),
        ("intent", &payload.intent),
        ("scope", &payload.scope),
        ("issuedAt", &payload.issued_at),
        ("expiresAt", &payload.expires_at),
    ];
    for (name, value) in required_fields {
        if value.trim().is_empty() {
            return MandateValidation::fail(
                ValidationCode::MandateInvalid,
                approvals,
                format!("empty payload field: {name}"),
            );
        }
    }

    // 3. Intent binding
    if let Some(expected) = options.expected_intent.as_deref() {
        if payload.intent != expected {
            return MandateValidation::fail(
                ValidationCode::IntentMismatch,
                approvals,
                format!("mandate covers '{}', expected '{expected}'", payload.intent),
            );
        }
    }

    // 4. Risk floor
    if let Some(min_level) = options.min_risk_level {
        if payload.risk_level < min_level {
            return MandateValidation::fail(
                ValidationCode::RiskLevelMismatch,
                approvals,
                format!("mandate risk '{}' below required '{min_level}'", payload.risk_level),
            );
        }
    }

    // 5. Time window
    let expires_at = match (
        DateTime::parse_from_rfc3339(&payload.issued_at),
        DateTime::parse_from_rfc3339(&payload.expires_at),
    ) {
        (Ok(_), Ok(expires)) => expires.with_timezone(&Utc),
        _ => {
            return MandateValidation::fail(
                ValidationCode::MandateTimeInvalid,
                approvals,
                "issuedAt/expiresAt not parseable",
            )
        }
    };
    let now = options.now.unwrap_or_else(Utc::now);
    if expires_at <= now {
        let mut validation = MandateValidation::fail(
            ValidationCode::MandateExpired,
            approvals,
            format!("expired at {}", payload.expires_at),
        );
        validation.expired = true;
        return validation;
    }

    // 6. Approval quorum over unique approvers
    if approvals.unique < approvals.required {
        return MandateValidation::fail(
            ValidationCode::ApprovalsInsufficient,
            approvals,
            format!("{} unique approvals, {} required", approvals.unique, approvals.required),
        );
    }

    // 7. Validation secret
    let secret = match options.secret.as_deref() {
        Some(s) if !s.is_empty() => s,
        _ => {
            return MandateValidation::fail(
                ValidationCode::MissingSecret,
                approvals,
                "no validation secret supplied",
            )
        }
    };

    // 8. Signature recomputation, exact string equality
    let expected_signature = match sign_payload(payload, secret) {
        Ok(sig) => sig,
        Err(MandateError::CryptoUnavailable) => {
            return MandateValidation::fail(
                ValidationCode::CryptoUnavailable,
                approvals,
                "HMAC primitive unavailable",
            )
        }
        Err(MandateError::Canonicalization(detail)) => {
            return MandateValidation::fail(ValidationCode::SignatureInvalid, approvals, detail)
        }
    };
    if expected_signature != token.signature {
        return MandateValidation::fail(
            ValidationCode::SignatureInvalid,
            approvals,
            "signature does not match canonical payload",
        );
    }

    MandateValidation {
        ok: true,
        code: ValidationCode::MandateOk,
        signature_valid: true,
        expired: false,
        approvals,
        detail: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{issue, MandateApproval, MandatePayload};

    const SECRET: &str = "kernel-secret";

    fn payload() -> MandatePayload {
        MandatePayload {
            mandate_id: "mandate-1".to_string(),
            intent: "analytics.save_lead".to_string(),
            scope: "crm".to_string(),
            issued_at: "2026-01-01T00:00:00Z".to_string(),
            expires_at: "2027-01-01T00:00:00Z".to_string(),
            risk_level: RiskLevel::High,
            min_approvals: 2,
            approvals: vec![
                MandateApproval {
                    approver_id: "alice".to_string(),
                    approved_at: "2026-01-01T00:00:00Z".to_string(),
                    role: "ops".to_string(),
                },
                MandateApproval {
                    approver_id: "bob".to_string(),
                    approved_at: "2026-01-01T00:01:00Z".to_string(),
                    role: "finance".to_string(),
                },
            ],
            rationale: "bulk lead import".to_string(),
        }
    }

    fn options() -> ValidateOptions {
        ValidateOptions {
            expected_intent: None,
            min_risk_level: None,
            secret: Some(SECRET.to_string()),
            now: Some("2026-06-01T00:00:00Z".parse().unwrap()),
        }
    }

    #[test]
    fn valid_token_passes() {
        let token = issue(payload(), SECRET).unwrap();
        let validation = validate(Some(&token), &options());
        assert!(validation.ok);
        assert_eq!(validation.code, ValidationCode::MandateOk);
        assert!(validation.signature_valid);
        assert!(!validation.expired);
        assert_eq!(validation.approvals.required, 2);
        assert_eq!(validation.approvals.unique, 2);
    }

    #[test]
    fn missing_token() {
        let validation = validate(None, &options());
        assert_eq!(validation.code, ValidationCode::MandateMissing);

        let mut token = issue(payload(), SECRET).unwrap();
        token.signature = String::new();
        assert_eq!(validate(Some(&token), &options()).code, ValidationCode::MandateMissing);
    }

    #[test]
    fn empty_field_is_invalid() {
        let mut p = payload();
        p.scope = String::new();
        let token = issue(p, SECRET).unwrap();
        assert_eq!(validate(Some(&token), &options()).code, ValidationCode::MandateInvalid);
    }

    #[test]
    fn intent_binding_enforced() {
        let token = issue(payload(), SECRET).unwrap();
        let mut opts = options();
        opts.expected_intent = Some("memory.search".to_string());
        assert_eq!(validate(Some(&token), &opts).code, ValidationCode::IntentMismatch);
    }

    #[test]
    fn risk_floor_enforced() {
        let mut p = payload();
        p.risk_level = RiskLevel::Medium;
        p.min_approvals = 0;
        p.approvals.clear();
        let token = issue(p, SECRET).unwrap();
        let mut opts = options();
        opts.min_risk_level = Some(RiskLevel::High);
        assert_eq!(validate(Some(&token), &opts).code, ValidationCode::RiskLevelMismatch);
    }

    #[test]
    fn unparseable_times_rejected() {
        let mut p = payload();
        p.expires_at = "tomorrow".to_string();
        let token = issue(p, SECRET).unwrap();
        assert_eq!(validate(Some(&token), &options()).code, ValidationCode::MandateTimeInvalid);
    }

    #[test]
    fn expiry_is_strict() {
        let token = issue(payload(), SECRET).unwrap();
        let mut opts = options();
        opts.now = Some("2027-01-01T00:00:00Z".parse().unwrap());
        let validation = validate(Some(&token), &opts);
        assert_eq!(validation.code, ValidationCode::MandateExpired);
        assert!(validation.expired);
    }

    #[test]
    fn duplicate_approvers_do_not_count() {
        let mut p = payload();
        p.approvals[1].approver_id = "alice".to_string();
        let token = issue(p, SECRET).unwrap();
        let validation = validate(Some(&token), &options());
        assert_eq!(validation.code, ValidationCode::ApprovalsInsufficient);
        assert_eq!(validation.approvals.provided, 2);
        assert_eq!(validation.approvals.unique, 1);
        assert_eq!(validation.approvals.required, 2);
    }

    #[test]
    fn quorum_checked_before_signature() {
        // Fewer than two unique approvers fails regardless of signature
        // validity: the token here is tampered after signing.
        let mut token = issue(payload(), SECRET).unwrap();
        token.payload.approvals.truncate(1);
        token.signature = "not-the-real-signature".to_string();
        assert_eq!(
            validate(Some(&token), &options()).code,
            ValidationCode::ApprovalsInsufficient
        );
    }

    #[test]
    fn missing_secret_surfaces() {
        let token = issue(payload(), SECRET).unwrap();
        let mut opts = options();
        opts.secret = None;
        assert_eq!(validate(Some(&token), &opts).code, ValidationCode::MissingSecret);
        opts.secret = Some(String::new());
        assert_eq!(validate(Some(&token), &opts).code, ValidationCode::MissingSecret);
    }

    #[test]
    fn tampered_payload_fails_signature() {
        let mut token = issue(payload(), SECRET).unwrap();
        token.payload.rationale = "rewritten".to_string();
        let validation = validate(Some(&token), &options());
        assert_eq!(validation.code, ValidationCode::SignatureInvalid);
        assert!(!validation.signature_valid);
    }

    #[test]
    fn wrong_secret_fails_signature() {
        let token = issue(payload(), SECRET).unwrap();
        let mut opts = options();
        opts.secret = Some("other-secret".to_string());
        assert_eq!(validate(Some(&token), &opts).code, ValidationCode::SignatureInvalid);
    }
}
