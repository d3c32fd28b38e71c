//! Tool-call extraction from free-text model replies.
//!
//! Strategies, first hit wins:
//! 1. the whole reply is a JSON object;
//! 2. the first fenced block (optionally tagged `json`) holding a
//!    `{"tool": ...}` object;
//! 3. any brace-delimited object in the text with a `tool` key, tried in
//!    order of appearance.
//!
//! Anything else is a plain answer.

use crate::types::ExtractedToolCall;
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

fn fenced_call() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?s)```(?:json)?\s*(\{\s*"tool"\s*:.*?\})\s*```"#)
            .unwrap_or_else(|e| panic!("invalid fenced-call pattern: {}", e))
    })
}

/// Pull a tool call out of `content`, or `None` for a plain answer.
pub fn extract_tool_call(content: &str) -> Option<ExtractedToolCall> {
    whole_reply(content)
        .or_else(|| fenced_block(content))
        .or_else(|| embedded_object(content))
}

fn whole_reply(content: &str) -> Option<ExtractedToolCall> {
    match serde_json::from_str::<Value>(content) {
        Ok(Value::Object(obj)) => Some(ExtractedToolCall::from_object(&obj)),
        _ => None,
    }
}

fn fenced_block(content: &str) -> Option<ExtractedToolCall> {
    let caps = fenced_call().captures(content)?;
    match serde_json::from_str::<Value>(caps.get(1)?.as_str()) {
        Ok(Value::Object(obj)) => Some(ExtractedToolCall::from_object(&obj)),
        _ => None,
    }
}

/// Try every `{` as the start of an object; the first complete JSON value
/// from that point is the candidate.
fn embedded_object(content: &str) -> Option<ExtractedToolCall> {
    if !content.contains("\"tool\"") {
        return None;
    }
    content.match_indices('{').find_map(|(start, _)| {
        let mut values = serde_json::Deserializer::from_str(&content[start..]).into_iter::<Value>();
        match values.next() {
            Some(Ok(Value::Object(obj))) if obj.contains_key("tool") => {
                Some(ExtractedToolCall::from_object(&obj))
            }
            _ => None,
        }
    })
}
