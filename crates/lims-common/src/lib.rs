use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub mod logging;

/// Notification text shown when a request fails without a usable server message.
pub const GENERIC_FAILURE_NOTICE: &str =
    "An error occurred while processing your request. Please try again later or email support.";

// ============================================================================
// Response Envelope
// ============================================================================

/// The `{success, data, message}` body returned by the console backend.
///
/// Error responses may additionally carry an `error` field; any truthy value
/// there marks the envelope as failed even when `success` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T = Value> {
    #[serde(default)]
    pub success: bool,
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

impl<T> Envelope<T> {
    /// Successful envelope wrapping `data`
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            error: None,
        }
    }

    /// Failed envelope with a server message
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
            error: None,
        }
    }

    pub fn is_failure(&self) -> bool {
        !self.success || self.error.as_ref().is_some_and(is_truthy)
    }

    /// Message to show the user for a failed envelope.
    ///
    /// Prefers `message`, then a string `error`, then the generic notice.
    pub fn failure_message(&self) -> String {
        if let Some(message) = self.message.as_deref().filter(|m| !m.trim().is_empty()) {
            return message.to_string();
        }
        if let Some(Value::String(error)) = &self.error {
            if !error.trim().is_empty() {
                return error.clone();
            }
        }
        GENERIC_FAILURE_NOTICE.to_string()
    }

    /// Unwrap the payload of a successful envelope
    pub fn into_data(self) -> Result<Option<T>, EnvelopeFailure> {
        if self.is_failure() {
            return Err(EnvelopeFailure {
                message: self.failure_message(),
            });
        }
        Ok(self.data)
    }
}

/// Application-level failure reported by the backend (`success: false`)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct EnvelopeFailure {
    pub message: String,
}

/// JSON truthiness: `null`, `false`, `0` and `""` are falsy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_envelope_yields_data() {
        let envelope: Envelope = serde_json::from_value(json!({
            "success": true,
            "data": {"sample_id": "S1"}
        }))
        .unwrap();

        assert!(!envelope.is_failure());
        assert_eq!(envelope.into_data().unwrap(), Some(json!({"sample_id": "S1"})));
    }

    #[test]
    fn test_failure_uses_server_message() {
        let envelope: Envelope = serde_json::from_value(json!({
            "success": false,
            "data": null,
            "message": "Sample S1 already exists."
        }))
        .unwrap();

        let failure = envelope.into_data().unwrap_err();
        assert_eq!(failure.message, "Sample S1 already exists.");
    }

    #[test]
    fn test_truthy_error_marks_failure() {
        let envelope: Envelope = serde_json::from_value(json!({
            "success": true,
            "error": "Invalid license number"
        }))
        .unwrap();

        assert!(envelope.is_failure());
        assert_eq!(envelope.failure_message(), "Invalid license number");
    }

    #[test]
    fn test_falsy_error_is_ignored() {
        let envelope: Envelope = serde_json::from_value(json!({
            "success": true,
            "data": [],
            "error": false
        }))
        .unwrap();

        assert!(!envelope.is_failure());
    }

    #[test]
    fn test_failure_without_message_falls_back_to_notice() {
        let envelope: Envelope = serde_json::from_value(json!({"success": false})).unwrap();
        assert_eq!(envelope.failure_message(), GENERIC_FAILURE_NOTICE);
    }

    #[test]
    fn test_typed_envelope() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Area {
            id: String,
            name: String,
        }

        let envelope: Envelope<Vec<Area>> = serde_json::from_value(json!({
            "success": true,
            "data": [{"id": "A1", "name": "Vault"}]
        }))
        .unwrap();

        let areas = envelope.into_data().unwrap().unwrap();
        assert_eq!(areas[0].name, "Vault");
    }
}
