//! Covenant Calibration - confidence/evidence gate
//!
//! Scores the confidence and evidence behind an agent decision before the
//! kernel lets it cause a side effect. All inputs are treated as
//! untrusted: a decision that supplies no evidence at all is blocked, not
//! waved through.
//!
//! # Key Principle
//!
//! **No evidence means blocked, never "no evidence needed".**
//!
//! The gate is a pure function: same signal and context, same result.
//! Results are derived per decision and never stored.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Context keys that count as evidence when present.
pub const EVIDENCE_KEYS: [&str; 5] = ["context", "evidence_summary", "domains", "intent", "sources"];

/// Actions reversible enough to proceed at medium confidence.
pub const REVERSIBLE_ACTIONS: [&str; 5] = ["draft", "suggest", "plan", "ask_user", "analyze"];

/// Below this, a decision is low-confidence and must noop.
pub const LOW_CONFIDENCE_THRESHOLD: f64 = 0.55;

/// Below this, only reversible actions may proceed.
pub const MEDIUM_CONFIDENCE_THRESHOLD: f64 = 0.75;

/// Confidence signal carried by a decision. Either a confidence in
/// `[0, 1]` or `[0, 100]`, or an uncertainty score to invert.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct DecisionSignal {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uncertainty_score: Option<f64>,
}

impl DecisionSignal {
    pub fn confidence(value: f64) -> Self {
        Self {
            confidence: Some(value),
            uncertainty_score: None,
        }
    }

    pub fn uncertainty(value: f64) -> Self {
        Self {
            confidence: None,
            uncertainty_score: Some(value),
        }
    }
}

/// Calibration label thresholds over the normalized confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalibrationLabel {
    High,
    Medium,
    Low,
    Blocked,
}

/// Result of calibrating one decision. Recomputed per decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationResult {
    /// Normalized confidence in `[0, 1]`
    pub confidence: f64,
    pub calibration_label: CalibrationLabel,
    /// True iff any required evidence is missing
    pub block: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_reason: Option<String>,
    /// Evidence keys the context claims to supply
    pub required_evidence: Vec<String>,
    /// Required keys whose values were empty
    pub missing_evidence: Vec<String>,
    pub notes_for_human: String,
}

/// Verdict of the confidence gate for a `(calibration, action)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "verdict")]
pub enum ConfidenceGate {
    Proceed,
    Noop { reason_code: NoopReason },
}

/// Machine-readable reason a decision was degraded to a noop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoopReason {
    CalibrationBlocked,
    LowConfidence,
    ConfidenceGate,
}

impl NoopReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoopReason::CalibrationBlocked => "calibration_blocked",
            NoopReason::LowConfidence => "low_confidence",
            NoopReason::ConfidenceGate => "confidence_gate",
        }
    }
}

/// Normalize a confidence signal into `[0, 1]`.
///
/// Values above 1 are treated as percentages. With no confidence given,
/// an uncertainty score is inverted; with neither, the signal defaults to
/// 0.5 (the evidence default blocks an empty context anyway).
pub fn normalize_confidence(signal: &DecisionSignal) -> f64 {
    let raw = match (signal.confidence, signal.uncertainty_score) {
        (Some(c), _) => c,
        (None, Some(u)) => {
            let u = if u > 1.0 { u / 100.0 } else { u };
            1.0 - u
        }
        (None, None) => 0.5,
    };
    let scaled = if raw > 1.0 { raw / 100.0 } else { raw };
    scaled.clamp(0.0, 1.0)
}

/// Non-emptiness predicate for an evidence value.
fn has_substance(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        Value::Bool(_) | Value::Number(_) => true,
    }
}

/// Score a decision's confidence and evidence against its context.
pub fn evaluate_calibration(signal: &DecisionSignal, context: &Map<String, Value>) -> CalibrationResult {
    let confidence = normalize_confidence(signal);

    let mut required_evidence = Vec::new();
    let mut missing_evidence = Vec::new();
    for key in EVIDENCE_KEYS {
        if let Some(value) = context.get(key) {
            required_evidence.push(key.to_string());
            if !has_substance(value) {
                missing_evidence.push(key.to_string());
            }
        }
    }

    // Fail safe: a context supplying none of the evidence keys owes a
    // `context` requirement it cannot meet.
    if required_evidence.is_empty() {
        required_evidence.push("context".to_string());
        missing_evidence.push("context".to_string());
    }

    let block = !missing_evidence.is_empty();
    let block_reason = block.then(|| format!("missing_evidence: {}", missing_evidence.join(", ")));

    let calibration_label = if block {
        CalibrationLabel::Blocked
    } else if confidence < LOW_CONFIDENCE_THRESHOLD {
        CalibrationLabel::Low
    } else if confidence < MEDIUM_CONFIDENCE_THRESHOLD {
        CalibrationLabel::Medium
    } else {
        CalibrationLabel::High
    };

    let notes_for_human = if block {
        format!(
            "Blocked: evidence missing for {}. Supply it or downgrade to a reversible action.",
            missing_evidence.join(", ")
        )
    } else {
        format!(
            "Confidence {:.2} with evidence: {}.",
            confidence,
            required_evidence.join(", ")
        )
    };

    CalibrationResult {
        confidence,
        calibration_label,
        block,
        block_reason,
        required_evidence,
        missing_evidence,
        notes_for_human,
    }
}

/// Map a calibration and a proposed action to proceed-or-noop.
pub fn evaluate_confidence_gate(calibration: &CalibrationResult, action: &str) -> ConfidenceGate {
    if calibration.block {
        return ConfidenceGate::Noop {
            reason_code: NoopReason::CalibrationBlocked,
        };
    }
    if calibration.confidence < LOW_CONFIDENCE_THRESHOLD {
        return ConfidenceGate::Noop {
            reason_code: NoopReason::LowConfidence,
        };
    }
    if calibration.confidence < MEDIUM_CONFIDENCE_THRESHOLD
        && !REVERSIBLE_ACTIONS.contains(&action)
    {
        return ConfidenceGate::Noop {
            reason_code: NoopReason::ConfidenceGate,
        };
    }
    ConfidenceGate::Proceed
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn percentage_confidence_normalizes() {
        assert_eq!(normalize_confidence(&DecisionSignal::confidence(80.0)), 0.8);
        assert_eq!(normalize_confidence(&DecisionSignal::confidence(0.8)), 0.8);
    }

    #[test]
    fn uncertainty_inverts() {
        assert!((normalize_confidence(&DecisionSignal::uncertainty(0.3)) - 0.7).abs() < 1e-9);
        assert!((normalize_confidence(&DecisionSignal::uncertainty(30.0)) - 0.7).abs() < 1e-9);
    }

    #[test]
    fn confidence_clamped() {
        assert_eq!(normalize_confidence(&DecisionSignal::confidence(250.0)), 1.0);
        assert_eq!(normalize_confidence(&DecisionSignal::confidence(-0.5)), 0.0);
    }

    #[test]
    fn empty_context_blocks() {
        let result = evaluate_calibration(&DecisionSignal::confidence(0.95), &Map::new());
        assert!(result.block);
        assert_eq!(result.calibration_label, CalibrationLabel::Blocked);
        assert_eq!(result.required_evidence, vec!["context"]);
        assert_eq!(result.missing_evidence, vec!["context"]);
    }

    #[test]
    fn present_but_empty_evidence_blocks() {
        let context = ctx(json!({"context": "deal review", "sources": []}));
        let result = evaluate_calibration(&DecisionSignal::confidence(0.9), &context);
        assert!(result.block);
        assert_eq!(result.missing_evidence, vec!["sources"]);
        assert_eq!(result.block_reason.as_deref(), Some("missing_evidence: sources"));
    }

    #[test]
    fn label_thresholds() {
        let context = ctx(json!({"context": "lead scoring"}));
        let low = evaluate_calibration(&DecisionSignal::confidence(0.5), &context);
        assert_eq!(low.calibration_label, CalibrationLabel::Low);
        let medium = evaluate_calibration(&DecisionSignal::confidence(0.6), &context);
        assert_eq!(medium.calibration_label, CalibrationLabel::Medium);
        let high = evaluate_calibration(&DecisionSignal::confidence(0.75), &context);
        assert_eq!(high.calibration_label, CalibrationLabel::High);
    }

    #[test]
    fn gate_blocks_then_low_then_reversibility() {
        let context = ctx(json!({"context": "ok"}));

        let blocked = evaluate_calibration(&DecisionSignal::confidence(0.9), &Map::new());
        assert_eq!(
            evaluate_confidence_gate(&blocked, "draft"),
            ConfidenceGate::Noop {
                reason_code: NoopReason::CalibrationBlocked
            }
        );

        let low = evaluate_calibration(&DecisionSignal::confidence(0.4), &context);
        assert_eq!(
            evaluate_confidence_gate(&low, "draft"),
            ConfidenceGate::Noop {
                reason_code: NoopReason::LowConfidence
            }
        );

        let medium = evaluate_calibration(&DecisionSignal::confidence(0.6), &context);
        assert_eq!(
            evaluate_confidence_gate(&medium, "send_email"),
            ConfidenceGate::Noop {
                reason_code: NoopReason::ConfidenceGate
            }
        );
        assert_eq!(evaluate_confidence_gate(&medium, "draft"), ConfidenceGate::Proceed);

        let high = evaluate_calibration(&DecisionSignal::confidence(0.9), &context);
        assert_eq!(
            evaluate_confidence_gate(&high, "send_email"),
            ConfidenceGate::Proceed
        );
    }

    #[test]
    fn missing_signal_defaults_to_midpoint() {
        let context = ctx(json!({"context": "ok"}));
        let result = evaluate_calibration(&DecisionSignal::default(), &context);
        assert_eq!(result.confidence, 0.5);
        assert_eq!(result.calibration_label, CalibrationLabel::Low);
    }
}
