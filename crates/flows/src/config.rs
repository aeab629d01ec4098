//! Typed configuration for flow blocks.
//!
//! Each block kind carries its own configuration shape. Kinds the builder
//! knows about get a typed payload; anything else is preserved verbatim as
//! an extension block so older servers don't destroy newer editors' data.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::FlowError;

/// Comparison operators for condition blocks and edge conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    Equals,
    NotEquals,
    Contains,
    GreaterThan,
    LessThan,
}

/// One selectable option of a choice block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceOption {
    pub label: String,
    pub value: String,
}

/// Configuration of a message block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageConfig {
    pub text: String,
}

/// Configuration of a question block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionConfig {
    pub text: String,
    /// Variable name the answer is stored under.
    #[serde(default)]
    pub variable: Option<String>,
}

/// Configuration of a choice block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceConfig {
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub options: Vec<ChoiceOption>,
    #[serde(default)]
    pub variable: Option<String>,
}

/// Configuration of a condition block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionConfig {
    pub variable: String,
    pub comparison: Comparison,
    pub value: Value,
}

/// Configuration of an HTTP call block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpConfig {
    pub method: String,
    pub url: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub body: Option<Value>,
}

/// Optional condition attached to an edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeCondition {
    #[serde(default)]
    pub label: String,
    pub comparison: Comparison,
    pub value: Value,
}

/// A block's typed configuration, keyed by its kind.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeConfig {
    Start,
    Message(MessageConfig),
    Question(QuestionConfig),
    Choice(ChoiceConfig),
    Condition(ConditionConfig),
    Http(HttpConfig),
    End,
    /// A kind this build doesn't know. The raw configuration is kept
    /// untouched and round-trips through save and publish.
    Extension { kind: String, config: Value },
}

impl NodeConfig {
    /// Parse a block's configuration against its declared kind.
    pub fn from_parts(node_type: &str, config: &Value) -> Result<Self, FlowError> {
        let config = if config.is_null() { json!({}) } else { config.clone() };

        let invalid = |reason: String| FlowError::InvalidConfig {
            node_type: node_type.to_string(),
            reason,
        };

        match node_type {
            "start" => Ok(NodeConfig::Start),
            "end" => Ok(NodeConfig::End),
            "message" => serde_json::from_value(config)
                .map(NodeConfig::Message)
                .map_err(|e| invalid(e.to_string())),
            "question" => serde_json::from_value(config)
                .map(NodeConfig::Question)
                .map_err(|e| invalid(e.to_string())),
            "choice" => serde_json::from_value(config)
                .map(NodeConfig::Choice)
                .map_err(|e| invalid(e.to_string())),
            "condition" => serde_json::from_value(config)
                .map(NodeConfig::Condition)
                .map_err(|e| invalid(e.to_string())),
            "http" => serde_json::from_value(config)
                .map(NodeConfig::Http)
                .map_err(|e| invalid(e.to_string())),
            other => Ok(NodeConfig::Extension {
                kind: other.to_string(),
                config,
            }),
        }
    }

    /// The block kind as stored in the node's type column.
    pub fn kind(&self) -> &str {
        match self {
            NodeConfig::Start => "start",
            NodeConfig::Message(_) => "message",
            NodeConfig::Question(_) => "question",
            NodeConfig::Choice(_) => "choice",
            NodeConfig::Condition(_) => "condition",
            NodeConfig::Http(_) => "http",
            NodeConfig::End => "end",
            NodeConfig::Extension { kind, .. } => kind,
        }
    }

    /// The configuration payload as stored in the node's config column.
    pub fn config_value(&self) -> Value {
        match self {
            NodeConfig::Start | NodeConfig::End => json!({}),
            NodeConfig::Message(c) => json!(c),
            NodeConfig::Question(c) => json!(c),
            NodeConfig::Choice(c) => json!(c),
            NodeConfig::Condition(c) => json!(c),
            NodeConfig::Http(c) => json!(c),
            NodeConfig::Extension { config, .. } => config.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_kinds_parse_typed() {
        let parsed = NodeConfig::from_parts("message", &json!({"text": "hello"})).unwrap();
        assert_eq!(parsed, NodeConfig::Message(MessageConfig { text: "hello".to_string() }));
        assert_eq!(parsed.kind(), "message");

        let parsed = NodeConfig::from_parts(
            "condition",
            &json!({"variable": "age", "comparison": "greater_than", "value": 18}),
        )
        .unwrap();
        assert!(matches!(parsed, NodeConfig::Condition(_)));
    }

    #[test]
    fn start_and_end_ignore_config() {
        assert_eq!(NodeConfig::from_parts("start", &Value::Null).unwrap(), NodeConfig::Start);
        assert_eq!(
            NodeConfig::from_parts("end", &json!({"whatever": 1})).unwrap(),
            NodeConfig::End
        );
    }

    #[test]
    fn malformed_known_config_is_rejected() {
        let bad = NodeConfig::from_parts("message", &json!({"txet": "typo"}));
        assert!(matches!(bad, Err(FlowError::InvalidConfig { .. })));

        let bad = NodeConfig::from_parts("http", &json!({"method": "GET"}));
        assert!(matches!(bad, Err(FlowError::InvalidConfig { .. })));
    }

    #[test]
    fn unknown_kinds_round_trip_untouched() {
        let raw = json!({"script": "return 1;", "timeout_ms": 250});
        let parsed = NodeConfig::from_parts("webhook_v2", &raw).unwrap();
        assert_eq!(parsed.kind(), "webhook_v2");
        assert_eq!(parsed.config_value(), raw);
    }

    #[test]
    fn edge_condition_serializes_snake_case() {
        let condition = EdgeCondition {
            label: "adult".to_string(),
            comparison: Comparison::GreaterThan,
            value: json!(18),
        };
        let raw = serde_json::to_value(&condition).unwrap();
        assert_eq!(raw["comparison"], "greater_than");
    }
}
