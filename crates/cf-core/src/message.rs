//! Wire messages exchanged with the native engine
//!
//! Every message is a JSON object tagged by `type`. Inbound messages may
//! also arrive as a bare type string.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::MessageError;
use crate::harvest::IdentifierBatch;

/// Messages the page receives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum InboundMessage {
    /// One-time initialization carrying the class used to hide elements.
    #[serde(rename = "cosmeticFilterGenericExceptions")]
    GenericExceptions {
        #[serde(rename = "randomizedClassName", default, skip_serializing_if = "Option::is_none")]
        randomized_class_name: Option<String>,
    },
    /// Hide selectors to try against the page.
    #[serde(rename = "cosmeticFilterConsiderNewRules")]
    ConsiderNewRules {
        #[serde(rename = "hideRules", default)]
        hide_rules: Vec<String>,
    },
    /// Any other message type. Ignored.
    #[serde(other)]
    Unknown,
}

impl InboundMessage {
    pub fn from_json(text: &str) -> Result<Self, MessageError> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, MessageError> {
        let value = match value {
            Value::String(kind) => serde_json::json!({ "type": kind }),
            Value::Object(map) if !map.contains_key("type") => return Err(MessageError::MissingType),
            other => other,
        };
        Ok(serde_json::from_value(value)?)
    }

    /// The `type` tag, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            InboundMessage::GenericExceptions { .. } => "cosmeticFilterGenericExceptions",
            InboundMessage::ConsiderNewRules { .. } => "cosmeticFilterConsiderNewRules",
            InboundMessage::Unknown => "unknown",
        }
    }
}

/// Messages the page sends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum OutboundMessage {
    /// Sent once when the page session starts.
    ContentScriptsLoaded,
    /// Newly seen classes and ids.
    ClassIdStylesheet { classes: Vec<String>, ids: Vec<String> },
}

impl OutboundMessage {
    pub fn to_value(&self) -> Result<Value, MessageError> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn to_json(&self) -> Result<String, MessageError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self, MessageError> {
        Ok(serde_json::from_str(text)?)
    }
}

impl From<IdentifierBatch> for OutboundMessage {
    fn from(batch: IdentifierBatch) -> Self {
        OutboundMessage::ClassIdStylesheet {
            classes: batch.classes,
            ids: batch.ids,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generic_exceptions() {
        let msg = InboundMessage::from_json(
            r#"{"type":"cosmeticFilterGenericExceptions","randomizedClassName":"abc123"}"#,
        )
        .unwrap();
        assert_eq!(
            msg,
            InboundMessage::GenericExceptions {
                randomized_class_name: Some("abc123".to_string())
            }
        );
    }

    #[test]
    fn test_bare_string_message() {
        let msg = InboundMessage::from_json(r#""cosmeticFilterGenericExceptions""#).unwrap();
        assert_eq!(msg, InboundMessage::GenericExceptions { randomized_class_name: None });
    }

    #[test]
    fn test_consider_new_rules() {
        let msg = InboundMessage::from_json(
            r##"{"type":"cosmeticFilterConsiderNewRules","hideRules":["#a",".b"],"extra":1}"##,
        )
        .unwrap();
        assert_eq!(msg.kind(), "cosmeticFilterConsiderNewRules");
        match msg {
            InboundMessage::ConsiderNewRules { hide_rules } => assert_eq!(hide_rules, vec!["#a", ".b"]),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_unknown_and_malformed() {
        assert_eq!(InboundMessage::from_json(r#"{"type":"somethingElse","x":1}"#).unwrap(), InboundMessage::Unknown);
        assert!(matches!(InboundMessage::from_json(r#"{"x":1}"#), Err(MessageError::MissingType)));
        assert!(matches!(InboundMessage::from_json("{"), Err(MessageError::Json(_))));
    }

    #[test]
    fn test_outbound_wire_format() {
        let loaded = OutboundMessage::ContentScriptsLoaded.to_json().unwrap();
        assert_eq!(loaded, r#"{"type":"contentScriptsLoaded"}"#);

        let batch = IdentifierBatch {
            ids: vec!["top".into()],
            classes: vec!["ad".into()],
        };
        let value = OutboundMessage::from(batch).to_value().unwrap();
        assert_eq!(
            value,
            serde_json::json!({"type": "classIdStylesheet", "classes": ["ad"], "ids": ["top"]})
        );
    }
}
