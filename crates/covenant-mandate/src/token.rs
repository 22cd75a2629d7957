//! Mandate payloads, tokens and signing

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use covenant_types::RiskLevel;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::canonical::canonical_json;
use crate::{MandateError, MandateResult};

type HmacSha256 = Hmac<Sha256>;

/// Approvals a risk level demands on its own: two pairs of eyes for
/// high/critical, none below that. Monotone over the risk ordering.
pub fn required_approvals_for_risk(level: RiskLevel) -> u32 {
    match level {
        RiskLevel::High | RiskLevel::Critical => 2,
        RiskLevel::Low | RiskLevel::Medium => 0,
    }
}

/// One approver's sign-off on a mandate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MandateApproval {
    pub approver_id: String,
    pub approved_at: String,
    pub role: String,
}

/// The signed portion of a mandate token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MandatePayload {
    pub mandate_id: String,
    /// Intent this mandate authorizes (e.g. `analytics.save_lead`)
    pub intent: String,
    pub scope: String,
    /// RFC 3339 issue instant
    pub issued_at: String,
    /// RFC 3339 expiry; must be strictly in the future to validate
    pub expires_at: String,
    pub risk_level: RiskLevel,
    pub min_approvals: u32,
    #[serde(default)]
    pub approvals: Vec<MandateApproval>,
    pub rationale: String,
}

impl MandatePayload {
    /// Count of distinct `approver_id`s.
    pub fn unique_approvers(&self) -> u32 {
        let mut seen: Vec<&str> = Vec::with_capacity(self.approvals.len());
        for approval in &self.approvals {
            if !seen.contains(&approval.approver_id.as_str()) {
                seen.push(&approval.approver_id);
            }
        }
        seen.len() as u32
    }

    /// Approvals the payload must carry before a token can validate.
    pub fn required_approvals(&self) -> u32 {
        self.min_approvals.max(required_approvals_for_risk(self.risk_level))
    }
}

/// A mandate payload plus its base64 HMAC-SHA256 signature. Immutable
/// once issued; re-signing produces a new token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MandateToken {
    pub payload: MandatePayload,
    pub signature: String,
}

/// Compute the base64 HMAC-SHA256 signature over the canonical payload.
pub fn sign_payload(payload: &MandatePayload, secret: &str) -> MandateResult<String> {
    let value =
        serde_json::to_value(payload).map_err(|e| MandateError::Canonicalization(e.to_string()))?;
    let canonical = canonical_json(&value);

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| MandateError::CryptoUnavailable)?;
    mac.update(canonical.as_bytes());
    Ok(BASE64.encode(mac.finalize().into_bytes()))
}

/// Issue a token over the payload.
pub fn issue(payload: MandatePayload, secret: &str) -> MandateResult<MandateToken> {
    let signature = sign_payload(&payload, secret)?;
    Ok(MandateToken { payload, signature })
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn base_payload() -> MandatePayload {
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

    #[test]
    fn risk_approval_floor() {
        assert_eq!(required_approvals_for_risk(RiskLevel::Low), 0);
        assert_eq!(required_approvals_for_risk(RiskLevel::Medium), 0);
        assert_eq!(required_approvals_for_risk(RiskLevel::High), 2);
        assert_eq!(required_approvals_for_risk(RiskLevel::Critical), 2);
    }

    #[test]
    fn signing_is_deterministic() {
        let payload = base_payload();
        let first = sign_payload(&payload, "secret").unwrap();
        let second = sign_payload(&payload, "secret").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn field_change_changes_signature() {
        let payload = base_payload();
        let original = sign_payload(&payload, "secret").unwrap();

        let mut tampered = payload.clone();
        tampered.rationale = "something else".to_string();
        assert_ne!(sign_payload(&tampered, "secret").unwrap(), original);

        let mut reordered = payload;
        reordered.approvals.reverse();
        assert_ne!(sign_payload(&reordered, "secret").unwrap(), original);
    }

    #[test]
    fn secret_change_changes_signature() {
        let payload = base_payload();
        let a = sign_payload(&payload, "secret-a").unwrap();
        let b = sign_payload(&payload, "secret-b").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn unique_approvers_deduplicates() {
        let mut payload = base_payload();
        payload.approvals.push(MandateApproval {
            approver_id: "alice".to_string(),
            approved_at: "2026-01-01T00:02:00Z".to_string(),
            role: "ops".to_string(),
        });
        assert_eq!(payload.approvals.len(), 3);
        assert_eq!(payload.unique_approvers(), 2);
    }
}
