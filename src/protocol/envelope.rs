//! Outbound envelope construction.
//!
//! Defines the typed message envelope sent to the remote renderer and the
//! addressing descriptor used to invoke a capability on a remote object.
//!
//! # Format
//!
//! ```json
//! {
//!   "type": "call",
//!   "requestId": "uuid",
//!   "target": { "by": "tag", "value": "Avatar" },
//!   "component": "HumanState",
//!   "method": "CanReceiveNewMessage"
//! }
//! ```

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::identifiers::RequestId;

// ============================================================================
// TargetBy
// ============================================================================

/// Selector kind for addressing a remote object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetBy {
    /// Select by actor tag.
    Tag,
    /// Select by object name.
    Name,
}

// ============================================================================
// Target
// ============================================================================

/// Addressing descriptor identifying a remote object to invoke.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    /// Selector kind.
    pub by: TargetBy,
    /// Selector value.
    pub value: String,
}

impl Target {
    /// Creates a tag-based target selector.
    #[inline]
    #[must_use]
    pub fn by_tag(value: impl Into<String>) -> Self {
        Self {
            by: TargetBy::Tag,
            value: value.into(),
        }
    }

    /// Creates a name-based target selector.
    #[inline]
    #[must_use]
    pub fn by_name(value: impl Into<String>) -> Self {
        Self {
            by: TargetBy::Name,
            value: value.into(),
        }
    }
}

// ============================================================================
// Envelope
// ============================================================================

/// An outbound message envelope.
///
/// Absent optional fields are omitted from the wire format entirely; the
/// remote renderer distinguishes message families by the `type`
/// discriminator alone. `request_id` is merged in by the bridge, never by
/// callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Discriminator string, e.g. `"chat"` or `"call"`.
    #[serde(rename = "type")]
    pub kind: String,

    /// Correlation token, present iff a response is expected.
    #[serde(rename = "requestId", skip_serializing_if = "Option::is_none", default)]
    pub request_id: Option<RequestId>,

    /// Remote object addressing for `"call"` messages.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub target: Option<Target>,

    /// Remote component identifier for `"call"` messages.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub component: Option<String>,

    /// Remote method identifier for `"call"` messages.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub method: Option<String>,

    /// Chat payload for `"chat"` messages.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub text: Option<String>,
}

impl Envelope {
    /// Creates a chat envelope carrying the given text.
    #[must_use]
    pub fn chat(text: impl Into<String>) -> Self {
        Self {
            kind: "chat".to_string(),
            request_id: None,
            target: None,
            component: None,
            method: None,
            text: Some(text.into()),
        }
    }

    /// Creates a remote capability invocation envelope.
    #[must_use]
    pub fn call(target: Target, component: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            kind: "call".to_string(),
            request_id: None,
            target: Some(target),
            component: Some(component.into()),
            method: Some(method.into()),
            text: None,
        }
    }

    /// Serializes the envelope into a JSON value for the bridge.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) if serialization fails.
    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_envelope_wire_format() {
        let value = Envelope::chat("hello").to_value().expect("serialize");
        assert_eq!(value["type"], "chat");
        assert_eq!(value["text"], "hello");
        // No response expected yet, so no correlation token on the wire.
        assert!(value.get("requestId").is_none());
        assert!(value.get("target").is_none());
    }

    #[test]
    fn test_call_envelope_wire_format() {
        let env = Envelope::call(Target::by_tag("Avatar"), "HumanState", "CanReceiveNewMessage");
        let value = env.to_value().expect("serialize");

        assert_eq!(value["type"], "call");
        assert_eq!(value["target"]["by"], "tag");
        assert_eq!(value["target"]["value"], "Avatar");
        assert_eq!(value["component"], "HumanState");
        assert_eq!(value["method"], "CanReceiveNewMessage");
    }

    #[test]
    fn test_target_by_name() {
        let target = Target::by_name("BP_Avatar_01");
        let value = serde_json::to_value(&target).expect("serialize");
        assert_eq!(value["by"], "name");
        assert_eq!(value["value"], "BP_Avatar_01");
    }

    #[test]
    fn test_envelope_deserializes_sparse_object() {
        let env: Envelope = serde_json::from_str(r#"{"type":"chat","text":"hi"}"#).expect("parse");
        assert_eq!(env.kind, "chat");
        assert_eq!(env.text.as_deref(), Some("hi"));
        assert!(env.request_id.is_none());
    }
}
