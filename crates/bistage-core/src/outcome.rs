use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Envelope every phase returns to the driver: a status for the exit
/// code, a one-line message, and structured details for `--json` output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub status: CommandStatus,
    pub message: String,
    #[serde(default)]
    pub details: Value,
}

impl ExecutionOutcome {
    pub fn success(message: impl Into<String>, details: Value) -> Self {
        Self {
            status: CommandStatus::Ok,
            message: message.into(),
            details,
        }
    }

    pub fn failure(message: impl Into<String>, details: Value) -> Self {
        Self {
            status: CommandStatus::Failure,
            message: message.into(),
            details,
        }
    }

    pub fn user_error(message: impl Into<String>, details: Value) -> Self {
        Self {
            status: CommandStatus::UserError,
            message: message.into(),
            details,
        }
    }
}

/// Operator mistake raised deep inside a phase and converted into a
/// `UserError` outcome at the phase boundary.
#[derive(thiserror::Error, Debug)]
#[error("{message}")]
pub struct StageUserError {
    pub(crate) message: String,
    pub(crate) details: Value,
}

impl StageUserError {
    pub fn new(message: impl Into<String>, details: Value) -> Self {
        Self {
            message: message.into(),
            details,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum CommandStatus {
    Ok,
    UserError,
    Failure,
}

/// Renders the machine-readable envelope printed under `--json`.
/// Details always come out as an object so consumers can index into
/// them without type checks.
#[must_use]
pub fn to_json_response(outcome: &ExecutionOutcome) -> Value {
    let status = match outcome.status {
        CommandStatus::Ok => "ok",
        CommandStatus::UserError => "user-error",
        CommandStatus::Failure => "error",
    };
    let details = match &outcome.details {
        Value::Object(_) => outcome.details.clone(),
        Value::Null => json!({}),
        other => json!({ "value": other }),
    };
    json!({
        "status": status,
        "message": outcome.message,
        "details": details,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_round_trips_through_json() {
        let outcome = ExecutionOutcome::success("done", json!({ "count": 2 }));
        let raw = serde_json::to_string(&outcome).unwrap();
        let back: ExecutionOutcome = serde_json::from_str(&raw).unwrap();
        assert_eq!(back.status, CommandStatus::Ok);
        assert_eq!(back.message, "done");
        assert_eq!(back.details["count"], 2);
    }

    #[test]
    fn details_default_to_null_when_absent() {
        let back: ExecutionOutcome =
            serde_json::from_str(r#"{"status":"Failure","message":"boom"}"#).unwrap();
        assert_eq!(back.status, CommandStatus::Failure);
        assert!(back.details.is_null());
    }

    #[test]
    fn json_response_uses_stable_status_labels() {
        let ok = to_json_response(&ExecutionOutcome::success("done", json!({ "n": 1 })));
        assert_eq!(ok["status"], "ok");
        assert_eq!(ok["details"]["n"], 1);

        let user = to_json_response(&ExecutionOutcome::user_error("bad flag", Value::Null));
        assert_eq!(user["status"], "user-error");
        assert!(user["details"].as_object().expect("object").is_empty());

        let failed = to_json_response(&ExecutionOutcome::failure("boom", json!("context")));
        assert_eq!(failed["status"], "error");
        assert_eq!(failed["details"]["value"], "context");
    }
}
