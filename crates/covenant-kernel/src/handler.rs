//! Intent handlers and post-invocation outcome classification
//!
//! Handlers return `{data, error?}`; the kernel never trusts the shape
//! blindly. An explicit `success: false` in the data is a domain-level
//! failure even when the transport succeeded, and an error status of
//! 401/403 distinguishes `unauthorized` from generic `invoke_failed`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::constraints::Intent;

/// Transport-level error a handler reports alongside (or instead of) data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandlerError {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

/// What a handler returns on a completed invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HandlerResponse {
    pub data: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<HandlerError>,
}

impl HandlerResponse {
    pub fn ok(data: Value) -> Self {
        Self { data, error: None }
    }

    pub fn error(message: impl Into<String>, status: Option<u16>) -> Self {
        Self {
            data: Value::Null,
            error: Some(HandlerError {
                message: message.into(),
                status,
            }),
        }
    }
}

/// Unexpected failure inside a handler. Caught by the kernel and
/// recorded as `exception`, never propagated to the caller.
#[derive(Debug, Clone, Error)]
#[error("handler failure: {0}")]
pub struct HandlerFailure(pub String);

/// Executes an intent once every gate has passed.
#[async_trait]
pub trait IntentHandler: Send + Sync {
    async fn invoke(&self, intent: &Intent, context: &Value) -> Result<HandlerResponse, HandlerFailure>;
}

/// Handlers resolved by exact intent name, falling back to namespace.
#[derive(Default, Clone)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn IntentHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register under an exact intent name or a bare namespace.
    pub fn register(&mut self, key: impl Into<String>, handler: Arc<dyn IntentHandler>) {
        self.handlers.insert(key.into(), handler);
    }

    pub fn resolve(&self, intent: &Intent) -> Option<Arc<dyn IntentHandler>> {
        self.handlers
            .get(intent.name())
            .or_else(|| self.handlers.get(intent.namespace()))
            .cloned()
    }
}

/// Tagged classification of a handler response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum HandlerOutcome {
    Ok { data: Value },
    DomainFailure { message: String, data: Value },
    TransportFailure { code: String, message: String },
}

/// Classify a completed handler response. Explicit shape checks, no ad
/// hoc property probing at the call sites.
pub fn classify_handler_response(response: HandlerResponse) -> HandlerOutcome {
    if let Some(error) = response.error {
        let code = match error.status {
            Some(401) | Some(403) => "unauthorized",
            _ => "invoke_failed",
        };
        return HandlerOutcome::TransportFailure {
            code: code.to_string(),
            message: error.message,
        };
    }

    if response.data.get("success").and_then(Value::as_bool) == Some(false) {
        let message = response
            .data
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("handler reported failure")
            .to_string();
        return HandlerOutcome::DomainFailure {
            message,
            data: response.data,
        };
    }

    HandlerOutcome::Ok { data: response.data }
}
