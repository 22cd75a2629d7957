//! Intents and per-call constraints

use covenant_mandate::MandateToken;
use covenant_types::RiskLevel;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An opaque, namespace-prefixed operation name, e.g.
/// `analytics.save_lead` or `memory.search`. The namespace selects the
/// consent category and the handler.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Intent(String);

impl Intent {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    /// Everything before the first `.`, or the whole name.
    pub fn namespace(&self) -> &str {
        self.0.split('.').next().unwrap_or(&self.0)
    }

    /// Everything after the first `.`, or the whole name.
    pub fn verb(&self) -> &str {
        self.0.split_once('.').map(|(_, v)| v).unwrap_or(&self.0)
    }

    /// Consent category the namespace maps to, if any.
    pub fn consent_category(&self) -> Option<&'static str> {
        match self.namespace() {
            "analytics" => Some("analytics"),
            "memory" => Some("memory"),
            _ => None,
        }
    }

    /// Health intents are exempt from the backend-config hard fail.
    pub fn is_health(&self) -> bool {
        self.namespace() == "system" || self.0.ends_with(".health")
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Intent {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

/// A caller-declared assumption with an optional validity window,
/// checked for freshness by the risk service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assumption {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_until: Option<String>,
}

/// Consent per intent category. Defaults deny.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentFlags {
    pub analytics: bool,
    pub memory: bool,
}

impl ConsentFlags {
    pub fn all() -> Self {
        Self {
            analytics: true,
            memory: true,
        }
    }

    pub fn granted(&self, category: &str) -> bool {
        match category {
            "analytics" => self.analytics,
            "memory" => self.memory,
            _ => false,
        }
    }
}

/// Per-call constraints on a kernel run. Created per call; never
/// persisted (the audit record keeps only a summary).
#[derive(Debug, Clone, Default)]
pub struct Constraints {
    /// Requester role
    pub role: Option<String>,
    /// Role allowlist; empty means any role
    pub allowed_roles: Vec<String>,
    pub consent: ConsentFlags,
    pub assumptions: Vec<Assumption>,
    /// Budget the caller declares it will spend
    pub budget_cents: u64,
    /// Hard maximum the caller may spend
    pub max_budget_cents: u64,
    /// Caller's risk tolerance override, passed through to the risk service
    pub risk_tolerance: Option<RiskLevel>,
    /// Whether the caller is authenticated
    pub authenticated: bool,
    pub dry_run: bool,
    /// Test hook: force the run to block with this reason
    pub forced_failure: Option<String>,
    /// Mandate presented for high-risk intents
    pub mandate: Option<MandateToken>,
}

/// Backend credential configuration validated by the env gate.
#[derive(Debug, Clone, Default)]
pub struct BackendConfig {
    pub service_url: Option<String>,
    pub service_key: Option<String>,
}

impl BackendConfig {
    /// Presence/shape check. Failure is recorded as a proof and only
    /// becomes fatal for non-health intents.
    pub fn validate(&self) -> Result<(), String> {
        match self.service_url.as_deref() {
            Some(url) if url.starts_with("http://") || url.starts_with("https://") => {}
            Some(_) => return Err("service_url is not an http(s) url".to_string()),
            None => return Err("service_url missing".to_string()),
        }
        match self.service_key.as_deref() {
            Some(key) if !key.trim().is_empty() => Ok(()),
            _ => Err("service_key missing".to_string()),
        }
    }
}
