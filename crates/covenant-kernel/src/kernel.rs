//! DecisionKernel: the ordered gate pipeline
//!
//! Gate order is a guaranteed invariant: assumptions, environment,
//! consent, role, auth, recall, risk, budget, confidence, mandate.
//! Each gate appends exactly one proof; the first failing gate settles
//! the run. Every terminal path writes a Decision (and an Outcome where
//! one applies) through collective memory and appends one audit record.

use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

use covenant_audit::{AuditTrail, ConstraintsSummary, KernelAuditRecord, DEFAULT_AUDIT_CAP};
use covenant_calibration::{
    evaluate_calibration, evaluate_confidence_gate, ConfidenceGate, DecisionSignal,
};
use covenant_mandate::{required_approvals_for_risk, validate as validate_mandate, ValidateOptions};
use covenant_types::{AuditRecordId, Proof, RunId};

use crate::constraints::{BackendConfig, Constraints, Intent};
use crate::handler::{classify_handler_response, HandlerOutcome, HandlerRegistry};
use crate::record::{ActionRecord, DecisionRecord, OutcomeRecord, OutcomeStatus, Verdict};
use crate::report::KernelRunReport;
use crate::services::{CollectiveMemory, RiskAction, RiskService, WriteMeta};

/// Kernel construction parameters.
#[derive(Debug, Clone)]
pub struct KernelConfig {
    /// Actor name stamped on collective-memory writes
    pub actor: String,
    pub backend: BackendConfig,
    /// Shared secret for mandate signature recomputation
    pub mandate_secret: Option<String>,
    pub audit_cap: usize,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            actor: "covenant-kernel".to_string(),
            backend: BackendConfig::default(),
            mandate_secret: None,
            audit_cap: DEFAULT_AUDIT_CAP,
        }
    }
}

/// Orchestrates the gate pipeline over every intent.
pub struct DecisionKernel {
    actor: String,
    backend: BackendConfig,
    mandate_secret: Option<String>,
    risk: Arc<dyn RiskService>,
    memory: Arc<dyn CollectiveMemory>,
    handlers: HandlerRegistry,
    audit: AuditTrail,
}

impl DecisionKernel {
    pub fn new(
        config: KernelConfig,
        risk: Arc<dyn RiskService>,
        memory: Arc<dyn CollectiveMemory>,
        handlers: HandlerRegistry,
    ) -> Self {
        Self {
            actor: config.actor,
            backend: config.backend,
            mandate_secret: config.mandate_secret,
            risk,
            memory,
            handlers,
            audit: AuditTrail::new(config.audit_cap),
        }
    }

    pub fn audit(&self) -> &AuditTrail {
        &self.audit
    }

    /// Run one intent through the gate pipeline.
    ///
    /// Never returns an error: gate failures, handler failures and
    /// exceptions all come back as a structured report.
    pub async fn run(
        &mut self,
        intent: Intent,
        context: Value,
        constraints: Constraints,
    ) -> KernelRunReport {
        let mut proofs: Vec<Proof> = Vec::new();

        // 1. Assumption freshness. A stale assumption degrades the run
        // to a noop, never an error.
        let assumptions = self.risk.evaluate_assumptions(&constraints).await;
        if assumptions.ok {
            proofs.push(Proof::pass("assumptions", "declared assumptions fresh"));
        } else {
            let code = assumptions
                .reason_code
                .unwrap_or_else(|| "assumptions_stale".to_string());
            let detail = assumptions.detail.unwrap_or_else(|| code.clone());
            proofs.push(Proof::fail("assumptions", detail));
            debug!(intent = %intent, code = %code, "stale assumptions, degrading to noop");
            return self.settle_noop(&intent, &constraints, &code, proofs).await;
        }

        // 2. Backend config. Recorded as a proof here; only fatal for
        // non-health intents, after the cheaper gates have had their say.
        let env_error = self.backend.validate().err();
        match &env_error {
            None => proofs.push(Proof::pass("environment", "backend config valid")),
            Some(e) => proofs.push(Proof::fail("environment", e.clone())),
        }

        // 3. Consent by intent namespace.
        match intent.consent_category() {
            Some(category) if !constraints.consent.granted(category) => {
                proofs.push(Proof::fail("consent", format!("{category} consent denied")));
                return self
                    .settle_blocked(
                        &intent,
                        &constraints,
                        "consent_denied",
                        format!("consent for '{category}' not granted"),
                        proofs,
                    )
                    .await;
            }
            Some(category) => {
                proofs.push(Proof::pass("consent", format!("{category} consent granted")))
            }
            None => proofs.push(Proof::pass("consent", "namespace needs no consent")),
        }

        // 4. Role allowlist. Empty allowlist admits any role.
        let role = constraints.role.as_deref().unwrap_or("");
        if !constraints.allowed_roles.is_empty()
            && !constraints.allowed_roles.iter().any(|r| r == role)
        {
            proofs.push(Proof::fail("role", format!("role '{role}' not in allowlist")));
            return self
                .settle_blocked(
                    &intent,
                    &constraints,
                    "role_blocked",
                    format!("role '{role}' may not issue '{intent}'"),
                    proofs,
                )
                .await;
        }
        proofs.push(Proof::pass("role", "role allowed"));

        // 5. Authentication.
        if !constraints.authenticated {
            proofs.push(Proof::fail("auth", "caller not authenticated"));
            return self
                .settle_blocked(
                    &intent,
                    &constraints,
                    "auth_required",
                    "authentication required".to_string(),
                    proofs,
                )
                .await;
        }
        proofs.push(Proof::pass("auth", "caller authenticated"));

        // 6. Recall prior decisions. Observability input only; a recall
        // failure shows up in the counts, never fails the run.
        let recall = self.memory.recall_decisions(&intent).await;
        proofs.push(Proof::pass(
            "recall",
            format!(
                "{} prior matches, {} failures, {} unknown",
                recall.matches.len(),
                recall.failures,
                recall.unknown
            ),
        ));

        // 7. Risk gate.
        let gate = self.risk.evaluate_risk_gate(&intent, &context, &constraints).await;
        let assessment = gate.assessment;
        let risk_detail = format!(
            "score {:.2}, level {}, {}",
            assessment.score, assessment.level, assessment.reason
        );
        match gate.action {
            RiskAction::Block => proofs.push(Proof::fail("risk", risk_detail)),
            _ => proofs.push(Proof::pass("risk", risk_detail)),
        }

        // 8. Budget against the greater of the caller's max and the
        // assessment's suggested cap. With both unset the cap is zero,
        // so any declared spend blocks.
        let cap = constraints.max_budget_cents.max(assessment.budget_cents);
        if constraints.budget_cents > cap {
            proofs.push(Proof::fail(
                "budget",
                format!("{} cents declared, cap {cap}", constraints.budget_cents),
            ));
            return self
                .settle_blocked(
                    &intent,
                    &constraints,
                    "budget_exceeded",
                    format!("declared budget {} exceeds cap {cap}", constraints.budget_cents),
                    proofs,
                )
                .await;
        }
        proofs.push(Proof::pass(
            "budget",
            format!("{} cents within cap {cap}", constraints.budget_cents),
        ));

        // 9. Act on the risk verdict.
        match gate.action {
            RiskAction::Block => {
                let code = gate.reason_code.unwrap_or_else(|| "risk_blocked".to_string());
                return self
                    .settle_blocked(&intent, &constraints, &code, assessment.reason, proofs)
                    .await;
            }
            RiskAction::Noop => {
                let code = gate.reason_code.unwrap_or_else(|| "risk_noop".to_string());
                return self.settle_noop(&intent, &constraints, &code, proofs).await;
            }
            RiskAction::Allow => {}
        }

        // 10. Confidence gate over the decision context.
        let signal = DecisionSignal {
            confidence: context.get("confidence").and_then(Value::as_f64),
            uncertainty_score: context.get("uncertainty_score").and_then(Value::as_f64),
        };
        let ctx_map = context.as_object().cloned().unwrap_or_default();
        let calibration = evaluate_calibration(&signal, &ctx_map);
        let action = context
            .get("action")
            .and_then(Value::as_str)
            .unwrap_or_else(|| intent.verb());
        match evaluate_confidence_gate(&calibration, action) {
            ConfidenceGate::Proceed => {
                proofs.push(Proof::pass("confidence", calibration.notes_for_human))
            }
            ConfidenceGate::Noop { reason_code } => {
                proofs.push(Proof::fail("confidence", calibration.notes_for_human));
                return self
                    .settle_noop(&intent, &constraints, reason_code.as_str(), proofs)
                    .await;
            }
        }

        // 11. Mandate when the assessed risk requires approvals.
        if required_approvals_for_risk(assessment.level) > 0 {
            let options = ValidateOptions {
                expected_intent: Some(intent.name().to_string()),
                min_risk_level: Some(assessment.level),
                secret: self.mandate_secret.clone(),
                now: None,
            };
            let validation = validate_mandate(constraints.mandate.as_ref(), &options);
            if validation.ok {
                proofs.push(Proof::pass(
                    "mandate",
                    format!(
                        "{} of {} unique approvals",
                        validation.approvals.unique, validation.approvals.required
                    ),
                ));
            } else {
                let code = validation.code.as_str();
                let detail = validation.detail.unwrap_or_else(|| code.to_string());
                proofs.push(Proof::fail("mandate", detail.clone()));
                return self
                    .settle_blocked(&intent, &constraints, code, detail, proofs)
                    .await;
            }
        } else {
            proofs.push(Proof::pass("mandate", "risk level requires no mandate"));
        }

        // 12. Deferred backend hard fail for non-health intents.
        if let Some(e) = env_error {
            if !intent.is_health() {
                return self
                    .settle_blocked(&intent, &constraints, "env_invalid", e, proofs)
                    .await;
            }
        }

        // 13. Forced-failure test hook.
        if let Some(reason) = constraints.forced_failure.clone() {
            proofs.push(Proof::fail("forced_failure", reason.clone()));
            return self
                .settle_blocked(&intent, &constraints, "forced_failure", reason, proofs)
                .await;
        }

        // 14. Dry run: record the decision, invoke nothing.
        if constraints.dry_run {
            let decision_id = self
                .persist_decision(DecisionRecord {
                    intent: intent.name().to_string(),
                    verdict: Verdict::DryRun,
                    detail: "all gates passed, execution skipped".to_string(),
                    proofs: proofs.clone(),
                })
                .await;
            self.record_audit(&intent, &constraints, true, None, &proofs);
            debug!(intent = %intent, %decision_id, "dry run settled");
            return KernelRunReport::dry_run(
                json!({ "dryRun": true, "intent": intent.name() }),
                proofs,
                Some(decision_id),
            );
        }

        // 15. Execute: Decision, Action, handler, Outcome.
        let decision_id = self
            .persist_decision(DecisionRecord {
                intent: intent.name().to_string(),
                verdict: Verdict::AllowExecute,
                detail: "all gates passed".to_string(),
                proofs: proofs.clone(),
            })
            .await;

        let action_id = self
            .persist_action(ActionRecord {
                intent: intent.name().to_string(),
                decision_id: decision_id.clone(),
                payload: context.clone(),
            })
            .await;

        let outcome = match self.handlers.resolve(&intent) {
            None => HandlerOutcome::TransportFailure {
                code: "invoke_failed".to_string(),
                message: format!("no handler registered for '{intent}'"),
            },
            Some(handler) => match handler.invoke(&intent, &context).await {
                Ok(response) => classify_handler_response(response),
                Err(failure) => HandlerOutcome::TransportFailure {
                    code: "exception".to_string(),
                    message: failure.to_string(),
                },
            },
        };

        match outcome {
            HandlerOutcome::Ok { data } => {
                proofs.push(Proof::pass("execution", "handler succeeded"));
                self.persist_outcome(OutcomeRecord {
                    decision_id: decision_id.clone(),
                    action_id: Some(action_id),
                    status: OutcomeStatus::Success,
                    detail: "handler succeeded".to_string(),
                })
                .await;
                self.record_audit(&intent, &constraints, true, None, &proofs);
                info!(intent = %intent, %decision_id, "intent executed");
                KernelRunReport::executed(data, proofs, Some(decision_id))
            }
            HandlerOutcome::DomainFailure { message, data } => {
                proofs.push(Proof::fail("execution", message.clone()));
                self.persist_outcome(OutcomeRecord {
                    decision_id: decision_id.clone(),
                    action_id: Some(action_id),
                    status: OutcomeStatus::Failure,
                    detail: message.clone(),
                })
                .await;
                self.record_audit(&intent, &constraints, false, Some("invoke_failed"), &proofs);
                KernelRunReport::execution_failed(
                    "invoke_failed",
                    message,
                    Some(data),
                    proofs,
                    Some(decision_id),
                )
            }
            HandlerOutcome::TransportFailure { code, message } => {
                proofs.push(Proof::fail("execution", message.clone()));
                self.persist_outcome(OutcomeRecord {
                    decision_id: decision_id.clone(),
                    action_id: Some(action_id),
                    status: OutcomeStatus::Failure,
                    detail: message.clone(),
                })
                .await;
                self.record_audit(&intent, &constraints, false, Some(&code), &proofs);
                KernelRunReport::execution_failed(code, message, None, proofs, Some(decision_id))
            }
        }
    }

    /// Settle a blocked run: Decision, Failure outcome, audit, report.
    async fn settle_blocked(
        &mut self,
        intent: &Intent,
        constraints: &Constraints,
        code: &str,
        message: String,
        proofs: Vec<Proof>,
    ) -> KernelRunReport {
        let decision_id = self
            .persist_decision(DecisionRecord {
                intent: intent.name().to_string(),
                verdict: Verdict::Blocked(code.to_string()),
                detail: message.clone(),
                proofs: proofs.clone(),
            })
            .await;
        self.persist_outcome(OutcomeRecord {
            decision_id: decision_id.clone(),
            action_id: None,
            status: OutcomeStatus::Failure,
            detail: message.clone(),
        })
        .await;
        self.record_audit(intent, constraints, false, Some(code), &proofs);
        debug!(intent = %intent, code, "run blocked");
        KernelRunReport::blocked(code, message, proofs, Some(decision_id))
    }

    /// Settle a noop run: Decision, Unknown outcome, audit, report.
    async fn settle_noop(
        &mut self,
        intent: &Intent,
        constraints: &Constraints,
        code: &str,
        proofs: Vec<Proof>,
    ) -> KernelRunReport {
        let decision_id = self
            .persist_decision(DecisionRecord {
                intent: intent.name().to_string(),
                verdict: Verdict::Noop(code.to_string()),
                detail: format!("degraded to noop: {code}"),
                proofs: proofs.clone(),
            })
            .await;
        self.persist_outcome(OutcomeRecord {
            decision_id: decision_id.clone(),
            action_id: None,
            status: OutcomeStatus::Unknown,
            detail: code.to_string(),
        })
        .await;
        self.record_audit(intent, constraints, true, None, &proofs);
        debug!(intent = %intent, code, "run degraded to noop");
        KernelRunReport::noop(code, proofs, Some(decision_id))
    }

    // Collective-memory writes are fail-soft: a lost write is logged and
    // the run continues with a synthesized id. The audit trail is the
    // local source of truth either way.

    async fn persist_decision(&self, record: DecisionRecord) -> String {
        let meta = WriteMeta {
            actor: self.actor.clone(),
            rationale: record.verdict.to_string(),
        };
        match self.memory.write_decision(record, &meta).await {
            Ok(persisted) => persisted.id,
            Err(err) => {
                warn!(error = %err, "decision write failed, synthesizing id");
                RunId::new().to_string()
            }
        }
    }

    async fn persist_action(&self, record: ActionRecord) -> String {
        let meta = WriteMeta {
            actor: self.actor.clone(),
            rationale: format!("action for {}", record.decision_id),
        };
        match self.memory.write_action(record, &meta).await {
            Ok(persisted) => persisted.id,
            Err(err) => {
                warn!(error = %err, "action write failed, synthesizing id");
                RunId::new().to_string()
            }
        }
    }

    async fn persist_outcome(&self, record: OutcomeRecord) {
        let meta = WriteMeta {
            actor: self.actor.clone(),
            rationale: format!("outcome for {}", record.decision_id),
        };
        if let Err(err) = self.memory.write_outcome(record, &meta).await {
            warn!(error = %err, "outcome write failed");
        }
    }

    fn record_audit(
        &mut self,
        intent: &Intent,
        constraints: &Constraints,
        ok: bool,
        error_code: Option<&str>,
        proofs: &[Proof],
    ) {
        self.audit.append(KernelAuditRecord {
            id: AuditRecordId::new(),
            intent: intent.name().to_string(),
            ok,
            created_at: Utc::now(),
            constraints: ConstraintsSummary {
                role: constraints.role.clone(),
                authenticated: constraints.authenticated,
                dry_run: constraints.dry_run,
                budget_cents: constraints.budget_cents,
            },
            error_code: error_code.map(str::to_string),
            proofs: proofs.to_vec(),
        });
    }
}
