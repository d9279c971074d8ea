//! Response envelope and request dispatch.

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{error, info, info_span};
use uuid::Uuid;

use crate::error::MonitorError;
use crate::orchestrator::{Monitor, Outcome};
use crate::request::{Request, operation_name};

/// Status code of a completed invocation.
pub const STATUS_OK: u16 = 200;
/// Status code of a rejected or failed invocation.
pub const STATUS_ERROR: u16 = 500;

/// What the caller gets back.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    /// 200 on success, 500 on validation or delivery failure.
    pub status_code: u16,
    /// Result payload.
    pub body: Value,
}

impl Envelope {
    /// Wraps a successful outcome.
    #[must_use]
    pub fn ok(outcome: Outcome) -> Self {
        let mut body = Map::new();
        body.insert("message".to_string(), Value::String(outcome.message));
        body.insert(
            "operation".to_string(),
            Value::String(outcome.operation.to_string()),
        );
        body.extend(outcome.details);
        Self {
            status_code: STATUS_OK,
            body: Value::Object(body),
        }
    }

    /// Wraps a failure.
    #[must_use]
    pub fn error(operation: Option<&str>, err: &MonitorError) -> Self {
        let message = err.to_string();
        let mut body = Map::new();
        body.insert("error".to_string(), Value::String(message.clone()));
        body.insert("message".to_string(), Value::String(message));
        body.insert(
            "operation".to_string(),
            operation.map_or(Value::Null, |op| Value::String(op.to_string())),
        );
        Self {
            status_code: STATUS_ERROR,
            body: Value::Object(body),
        }
    }

    /// Returns true for a 200 envelope.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status_code == STATUS_OK
    }

    /// The body's `message` field.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.body.get("message").and_then(Value::as_str)
    }
}

impl Monitor {
    /// Validates a raw request, runs it and wraps the result.
    ///
    /// Never fails: every error becomes a 500 envelope.
    #[must_use]
    pub fn dispatch(&self, payload: &Value) -> Envelope {
        let run_id = Uuid::new_v4();
        let operation = operation_name(payload);
        let span = info_span!(
            "invocation",
            run_id = %run_id,
            operation = operation.unwrap_or("<none>")
        );
        let _guard = span.enter();

        let result = Request::parse(payload, self.registry())
            .map_err(MonitorError::from)
            .and_then(|request| self.run(&request));

        match result {
            Ok(outcome) => {
                info!(message = %outcome.message, notified = outcome.notified, "invocation complete");
                Envelope::ok(outcome)
            }
            Err(e) => {
                error!(error = %e, "invocation failed");
                Envelope::error(operation, &e)
            }
        }
    }
}
