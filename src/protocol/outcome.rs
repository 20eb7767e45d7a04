//! Inbound response classification.
//!
//! The remote renderer's response envelopes are not uniform: different
//! in-engine handlers signal success via a `<domain>/ok` type suffix, an
//! explicit `ok`/`success` flag, or a `status` field, and place the
//! success payload in `value`, `data`, or `result`. Classification is
//! therefore performed over the raw JSON value, first-present-wins, with
//! a permissive default: an envelope carrying no recognized signal is
//! treated as a success whose payload is the whole envelope.

// ============================================================================
// Imports
// ============================================================================

use serde_json::Value;

// ============================================================================
// Constants
// ============================================================================

/// Error text used when a failure envelope carries no description.
const GENERIC_FAILURE: &str = "bridge error";

/// Success payload fields, in first-present-wins order.
const SUCCESS_FIELDS: [&str; 3] = ["value", "data", "result"];

// ============================================================================
// Outcome
// ============================================================================

/// Classification of an inbound response envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The envelope signals success; carries the extracted payload.
    Success(Value),
    /// The envelope signals failure; carries the remote error text.
    Failure(String),
    /// No recognized success/failure signal.
    ///
    /// The bridge resolves the request with the raw envelope.
    Ambiguous,
}

// ============================================================================
// Classification
// ============================================================================

/// Classifies a response envelope.
///
/// Success signals, checked in order: `type` ending in `/ok`, a `true`
/// `ok` or `success` flag, `status == "ok"`. Failure signals: `type`
/// ending in `/error`, a `false` `ok` or `success` flag,
/// `status == "error"`, or a string `error` field. Anything else is
/// [`Outcome::Ambiguous`].
#[must_use]
pub fn classify(envelope: &Value) -> Outcome {
    if let Some(kind) = envelope.get("type").and_then(Value::as_str) {
        if kind.ends_with("/ok") {
            return Outcome::Success(success_payload(envelope));
        }
        if kind.ends_with("/error") {
            return Outcome::Failure(failure_text(envelope));
        }
    }

    for flag in ["ok", "success"] {
        match envelope.get(flag).and_then(Value::as_bool) {
            Some(true) => return Outcome::Success(success_payload(envelope)),
            Some(false) => return Outcome::Failure(failure_text(envelope)),
            None => {}
        }
    }

    match envelope.get("status").and_then(Value::as_str) {
        Some("ok") => return Outcome::Success(success_payload(envelope)),
        Some("error") => return Outcome::Failure(failure_text(envelope)),
        _ => {}
    }

    if envelope.get("error").and_then(Value::as_str).is_some() {
        return Outcome::Failure(failure_text(envelope));
    }

    Outcome::Ambiguous
}

/// Selects the success payload, falling back to the whole envelope.
fn success_payload(envelope: &Value) -> Value {
    for field in SUCCESS_FIELDS {
        if let Some(payload) = envelope.get(field) {
            return payload.clone();
        }
    }
    envelope.clone()
}

/// Selects the failure description: `message`, then `error`, then a
/// generic fallback.
fn failure_text(envelope: &Value) -> String {
    envelope
        .get("message")
        .and_then(Value::as_str)
        .or_else(|| envelope.get("error").and_then(Value::as_str))
        .unwrap_or(GENERIC_FAILURE)
        .to_string()
}

// ============================================================================
// Truthiness
// ============================================================================

/// JavaScript-style truthiness coercion for boolean capability results.
///
/// The remote `CanReceiveNewMessage` handler has been observed returning
/// proper booleans, numbers, and bare strings across engine versions.
#[must_use]
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ok_suffix_extracts_value() {
        let env = json!({"requestId": "r1", "type": "chat/ok", "value": 42});
        assert_eq!(classify(&env), Outcome::Success(json!(42)));
    }

    #[test]
    fn test_success_field_order_is_value_data_result() {
        let env = json!({"type": "x/ok", "data": "d", "result": "r"});
        assert_eq!(classify(&env), Outcome::Success(json!("d")));

        let env = json!({"type": "x/ok", "result": "r"});
        assert_eq!(classify(&env), Outcome::Success(json!("r")));
    }

    #[test]
    fn test_ok_suffix_without_payload_returns_envelope() {
        let env = json!({"requestId": "r1", "type": "chat/ok"});
        assert_eq!(classify(&env), Outcome::Success(env.clone()));
    }

    #[test]
    fn test_error_suffix_uses_message() {
        let env = json!({"type": "chat/error", "message": "X"});
        assert_eq!(classify(&env), Outcome::Failure("X".to_string()));
    }

    #[test]
    fn test_error_suffix_falls_back_to_error_then_generic() {
        let env = json!({"type": "chat/error", "error": "bad target"});
        assert_eq!(classify(&env), Outcome::Failure("bad target".to_string()));

        let env = json!({"type": "chat/error"});
        assert_eq!(classify(&env), Outcome::Failure("bridge error".to_string()));
    }

    #[test]
    fn test_explicit_flags() {
        assert_eq!(
            classify(&json!({"ok": true, "result": 1})),
            Outcome::Success(json!(1))
        );
        assert_eq!(
            classify(&json!({"success": false, "message": "nope"})),
            Outcome::Failure("nope".to_string())
        );
        assert_eq!(
            classify(&json!({"status": "ok", "value": "v"})),
            Outcome::Success(json!("v"))
        );
        assert_eq!(
            classify(&json!({"status": "error"})),
            Outcome::Failure("bridge error".to_string())
        );
    }

    #[test]
    fn test_bare_error_field_is_failure() {
        let env = json!({"requestId": "r1", "error": "exploded"});
        assert_eq!(classify(&env), Outcome::Failure("exploded".to_string()));
    }

    #[test]
    fn test_unrecognized_envelope_is_ambiguous() {
        let env = json!({"requestId": "r1", "foo": 1});
        assert_eq!(classify(&env), Outcome::Ambiguous);
    }

    #[test]
    fn test_truthy_coercion() {
        assert!(truthy(&json!(true)));
        assert!(truthy(&json!(1)));
        assert!(truthy(&json!("yes")));
        assert!(truthy(&json!({"a": 1})));
        assert!(!truthy(&json!(false)));
        assert!(!truthy(&json!(0)));
        assert!(!truthy(&json!("")));
        assert!(!truthy(&Value::Null));
    }
}
