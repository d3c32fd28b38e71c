//! Shared types used across the bridge server and the chat client.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Tool invocation
// ---------------------------------------------------------------------------

/// Parameter object passed to a tool, keyed by parameter name.
pub type ToolParams = serde_json::Map<String, serde_json::Value>;

/// Body of `POST /tools/call`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInvocationRequest {
    pub tool_name: String,
    #[serde(default)]
    pub parameters: ToolParams,
}

/// Result of executing a tool.
///
/// Broker failures are reported here with `success == false`; the output is
/// still a human-readable string the caller can show as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResult {
    pub output: String,
    pub success: bool,
}

impl ToolResult {
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            success: true,
        }
    }

    pub fn failed(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            success: false,
        }
    }
}

/// Body returned by every successful tool endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResponse {
    pub result: String,
}

// ---------------------------------------------------------------------------
// Market data
// ---------------------------------------------------------------------------

/// One market-data update. Fields are whatever the feed sends.
pub type TickRecord = serde_json::Map<String, serde_json::Value>;

/// Key carried by every tick the cache accepts.
pub const STOCK_TOKEN_FIELD: &str = "stock_token";

// ---------------------------------------------------------------------------
// Inference types
// ---------------------------------------------------------------------------

/// A chat message in the multi-turn conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// A tool call lifted out of the model's free-text reply.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedToolCall {
    /// Tool name; `None` when the model emitted an object without a usable
    /// `tool` string.
    pub tool: Option<String>,
    pub parameters: ToolParams,
}

impl ExtractedToolCall {
    /// Build from a parsed JSON object. A missing or non-object `parameters`
    /// field becomes an empty map.
    pub fn from_object(obj: &serde_json::Map<String, serde_json::Value>) -> Self {
        let tool = obj
            .get("tool")
            .and_then(|v| v.as_str())
            .map(str::to_string);
        let parameters = obj
            .get("parameters")
            .and_then(|v| v.as_object())
            .cloned()
            .unwrap_or_default();
        Self { tool, parameters }
    }
}

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

/// Per-parameter metadata in the `/info` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamInfo {
    #[serde(rename = "type", default = "default_param_type")]
    pub param_type: String,
    #[serde(default)]
    pub description: String,
}

fn default_param_type() -> String {
    "string".into()
}

/// One tool as listed by `GET /info`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Parameters in declaration order.
    #[serde(default, with = "ordered_params")]
    pub parameters: Vec<(String, ParamInfo)>,
}

/// Full `GET /info` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    pub description: String,
    pub tools: Vec<ToolInfo>,
}

/// Serializes a parameter list as a JSON object without losing declaration
/// order (`serde_json::Map` sorts its keys).
mod ordered_params {
    use super::ParamInfo;
    use serde::de::{MapAccess, Visitor};
    use serde::ser::SerializeMap;
    use serde::{Deserializer, Serializer};
    use std::fmt;

    pub fn serialize<S>(params: &[(String, ParamInfo)], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(params.len()))?;
        for (name, info) in params {
            map.serialize_entry(name, info)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<(String, ParamInfo)>, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ParamsVisitor;

        impl<'de> Visitor<'de> for ParamsVisitor {
            type Value = Vec<(String, ParamInfo)>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object of parameter name to parameter info")
            }

            fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut params = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((name, info)) = access.next_entry::<String, ParamInfo>()? {
                    params.push((name, info));
                }
                Ok(params)
            }
        }

        deserializer.deserialize_map(ParamsVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tool_info_keeps_parameter_order() {
        let raw = r#"{
            "name": "get_quotes",
            "description": "Quotes",
            "parameters": {
                "stock_code": {"type": "string", "description": "code"},
                "exchange_code": {"type": "string", "description": ""},
                "expiry_date": {"type": "string"}
            }
        }"#;
        let info: ToolInfo = serde_json::from_str(raw).unwrap();
        let names: Vec<&str> = info.parameters.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["stock_code", "exchange_code", "expiry_date"]);

        let text = serde_json::to_string(&info).unwrap();
        let stock = text.find("stock_code").unwrap();
        let exchange = text.find("exchange_code").unwrap();
        let expiry = text.find("expiry_date").unwrap();
        assert!(stock < exchange && exchange < expiry);
    }

    #[test]
    fn extracted_call_defaults_parameters() {
        let obj = json!({"tool": "get_funds"});
        let call = ExtractedToolCall::from_object(obj.as_object().unwrap());
        assert_eq!(call.tool.as_deref(), Some("get_funds"));
        assert!(call.parameters.is_empty());

        let obj = json!({"parameters": {"a": "b"}});
        let call = ExtractedToolCall::from_object(obj.as_object().unwrap());
        assert_eq!(call.tool, None);
        assert_eq!(call.parameters.get("a"), Some(&json!("b")));
    }
}
