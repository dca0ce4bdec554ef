use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub status: CommandStatus,
    pub message: String,
    #[serde(default)]
    pub details: Value,
    /// Process exit code the CLI should terminate with.
    #[serde(default)]
    pub exit_code: i32,
}

impl ExecutionOutcome {
    pub fn success(message: impl Into<String>, details: Value) -> Self {
        Self {
            status: CommandStatus::Ok,
            message: message.into(),
            details,
            exit_code: 0,
        }
    }

    pub fn failure(message: impl Into<String>, details: Value, exit_code: i32) -> Self {
        Self {
            status: CommandStatus::Failure,
            message: message.into(),
            details,
            exit_code,
        }
    }

    pub fn user_error(message: impl Into<String>, details: Value, exit_code: i32) -> Self {
        Self {
            status: CommandStatus::UserError,
            message: message.into(),
            details,
            exit_code,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CommandStatus {
    Ok,
    UserError,
    Failure,
}

impl CommandStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandStatus::Ok => "ok",
            CommandStatus::UserError => "user-error",
            CommandStatus::Failure => "error",
        }
    }
}

/// The `--json` envelope: `{status, message, details}`.
#[must_use]
pub fn to_json_response(outcome: &ExecutionOutcome) -> Value {
    let details = match &outcome.details {
        Value::Object(_) => outcome.details.clone(),
        Value::Null => json!({}),
        other => json!({ "value": other }),
    };
    json!({
        "status": outcome.status.as_str(),
        "message": outcome.message,
        "details": details,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_wraps_scalar_details() {
        let outcome = ExecutionOutcome::failure("boom", json!("raw"), 1);
        let payload = to_json_response(&outcome);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["details"]["value"], "raw");

        let ok = ExecutionOutcome::success("done", Value::Null);
        let payload = to_json_response(&ok);
        assert_eq!(payload["status"], "ok");
        assert!(payload["details"].as_object().is_some_and(serde_json::Map::is_empty));
        assert_eq!(ok.exit_code, 0);
    }
}
