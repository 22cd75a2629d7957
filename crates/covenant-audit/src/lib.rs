//! Covenant Audit - bounded append log of kernel decisions
//!
//! Every kernel run, pass or fail, appends exactly one immutable record.
//! The trail is a bounded ring: beyond the cap, oldest records are
//! evicted so writers never block. The trail is an explicit value owned
//! by the caller, who persists it as an opaque JSON blob; the core never
//! touches ambient global state.

use chrono::{DateTime, Utc};
use covenant_types::{AuditRecordId, Proof};
use serde::{Deserialize, Serialize};

/// Default record cap for a trail.
pub const DEFAULT_AUDIT_CAP: usize = 200;

/// Subset of the run's constraints worth keeping for forensics. The
/// full constraints value is created per call and never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintsSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub authenticated: bool,
    pub dry_run: bool,
    pub budget_cents: u64,
}

/// One immutable record of a kernel run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernelAuditRecord {
    pub id: AuditRecordId,
    pub intent: String,
    pub ok: bool,
    pub created_at: DateTime<Utc>,
    pub constraints: ConstraintsSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    pub proofs: Vec<Proof>,
}

/// Bounded, oldest-evicted trail of kernel run records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditTrail {
    records: Vec<KernelAuditRecord>,
    cap: usize,
}

impl Default for AuditTrail {
    fn default() -> Self {
        Self::new(DEFAULT_AUDIT_CAP)
    }
}

impl AuditTrail {
    pub fn new(cap: usize) -> Self {
        Self {
            records: Vec::new(),
            cap: cap.max(1),
        }
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in append order, oldest first.
    pub fn records(&self) -> &[KernelAuditRecord] {
        &self.records
    }

    pub fn latest(&self) -> Option<&KernelAuditRecord> {
        self.records.last()
    }

    /// Append a record, evicting the oldest beyond the cap.
    pub fn append(&mut self, record: KernelAuditRecord) {
        self.records.push(record);
        if self.records.len() > self.cap {
            let overflow = self.records.len() - self.cap;
            self.records.drain(0..overflow);
        }
    }

    /// Restore a trail from a caller-persisted JSON blob.
    pub fn from_blob(blob: &serde_json::Value) -> Option<Self> {
        serde_json::from_value(blob.clone()).ok()
    }

    /// Render the trail for the caller to persist.
    pub fn to_blob(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(intent: &str, ok: bool) -> KernelAuditRecord {
        KernelAuditRecord {
            id: AuditRecordId::new(),
            intent: intent.to_string(),
            ok,
            created_at: Utc::now(),
            constraints: ConstraintsSummary::default(),
            error_code: (!ok).then(|| "consent_denied".to_string()),
            proofs: vec![Proof::fail("consent", "analytics consent denied")],
        }
    }

    #[test]
    fn append_preserves_order() {
        let mut trail = AuditTrail::new(10);
        trail.append(record("analytics.save_lead", true));
        trail.append(record("memory.search", false));
        let intents: Vec<&str> = trail.records().iter().map(|r| r.intent.as_str()).collect();
        assert_eq!(intents, vec!["analytics.save_lead", "memory.search"]);
        assert_eq!(trail.latest().unwrap().intent, "memory.search");
    }

    #[test]
    fn ring_evicts_oldest() {
        let mut trail = AuditTrail::new(3);
        for i in 0..5 {
            trail.append(record(&format!("intent.{i}"), true));
        }
        assert_eq!(trail.len(), 3);
        let intents: Vec<&str> = trail.records().iter().map(|r| r.intent.as_str()).collect();
        assert_eq!(intents, vec!["intent.2", "intent.3", "intent.4"]);
    }

    #[test]
    fn blob_roundtrip() {
        let mut trail = AuditTrail::new(5);
        trail.append(record("analytics.save_lead", false));
        let restored = AuditTrail::from_blob(&trail.to_blob()).unwrap();
        assert_eq!(restored, trail);
    }

    #[test]
    fn zero_cap_clamped() {
        let trail = AuditTrail::new(0);
        assert_eq!(trail.cap(), 1);
    }
}
