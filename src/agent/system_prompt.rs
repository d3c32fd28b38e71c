//! System prompt builder for the chat client.
//!
//! Layers (in order):
//! 1. Assistant role and ground rules
//! 2. Tool-call format
//! 3. Available tools, one entry per discovered tool

use crate::types::ToolInfo;
use std::fmt::Write as _;

/// Role and ground rules.
const ASSISTANT_ROLE: &str = r#"You are a Financial Market Assistant with access to real-time and historical market data from ICICI Direct.
Use the available tools to help users with their financial data requests. Remember to:
1. First initialize the session if needed
2. Connect to WebSocket before trying to access real-time data
3. Format responses to be easy to read
4. Explain what you're doing at each step
5. Don't make up information - use the tools to get real data
"#;

/// Format the model must use to request a tool.
const TOOL_CALL_FORMAT: &str = r#"
When you need to use a tool, respond with JSON in this format:
{
  "tool": "tool_name",
  "parameters": {
    "param1": "value1",
    "param2": "value2"
  }
}
"#;

/// Build the complete system prompt for the discovered tools.
pub fn build_system_prompt(tools: &[ToolInfo]) -> String {
    let mut prompt = String::with_capacity(4096);

    prompt.push_str(ASSISTANT_ROLE);
    prompt.push_str(TOOL_CALL_FORMAT);
    prompt.push_str("\n\n");
    prompt.push_str(&describe_tools(tools));

    prompt
}

/// The "Available tools" section.
pub fn describe_tools(tools: &[ToolInfo]) -> String {
    let mut out = String::from("Available tools:\n\n");
    for tool in tools {
        let _ = writeln!(out, "- {}: {}", tool.name, tool.description);
        if !tool.parameters.is_empty() {
            out.push_str("  Parameters:\n");
            for (name, info) in &tool.parameters {
                let _ = writeln!(out, "  - {}: {}", name, info.description);
            }
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ParamInfo;

    fn tool(name: &str, params: &[(&str, &str)]) -> ToolInfo {
        ToolInfo {
            name: name.into(),
            description: format!("{} description", name),
            parameters: params
                .iter()
                .map(|(n, d)| {
                    (
                        n.to_string(),
                        ParamInfo {
                            param_type: "string".into(),
                            description: d.to_string(),
                        },
                    )
                })
                .collect(),
        }
    }

    #[test]
    fn tools_section_lists_parameters() {
        let text = describe_tools(&[
            tool("get_funds", &[]),
            tool("get_quotes", &[("stock_code", "Stock code"), ("exchange_code", "")]),
        ]);
        assert_eq!(
            text,
            "Available tools:\n\n\
             - get_funds: get_funds description\n\n\
             - get_quotes: get_quotes description\n  Parameters:\n  - stock_code: Stock code\n  - exchange_code: \n\n"
        );
    }

    #[test]
    fn prompt_asks_for_json_tool_calls() {
        let prompt = build_system_prompt(&[tool("get_funds", &[])]);
        assert!(prompt.starts_with("You are a Financial Market Assistant"));
        assert!(prompt.contains("\"tool\": \"tool_name\""));
        assert!(prompt.ends_with("- get_funds: get_funds description\n\n"));
    }
}
