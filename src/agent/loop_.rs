//! Query loop: Prompt → Model → (Tool → Model) → Answer.
//!
//! Each query:
//! 1. Builds the system prompt from the discovered tools
//! 2. Asks the model once
//! 3. Extracts at most one tool call from the reply
//! 4. Invokes the tool on the bridge server
//! 5. Asks the model again with the tool result
//!
//! A failure in steps 4-5 falls back to the first reply.

use crate::agent::{extract, system_prompt};
use crate::remote::{InferenceClient, ToolServerClient};
use crate::types::*;
use anyhow::{anyhow, Context, Result};
use colored::Colorize;
use std::io::Write as _;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{info, warn};

/// Characters of a tool result echoed to the console.
const RESULT_PREVIEW_CHARS: usize = 100;

/// Chat client bound to one tool server and one model.
pub struct QueryClient {
    tools_client: ToolServerClient,
    inference: InferenceClient,
    tools: Vec<ToolInfo>,
    system_prompt: String,
}

impl QueryClient {
    /// Discover the server's tools. Fails if the server cannot be reached.
    pub async fn connect(
        tools_client: ToolServerClient,
        inference: InferenceClient,
    ) -> Result<Self> {
        let tools = tools_client
            .discover()
            .await
            .with_context(|| format!("Failed to discover tools at {}", tools_client.base_url()))?;
        let system_prompt = system_prompt::build_system_prompt(&tools);

        info!("Connected to tool server with {} tools", tools.len());

        Ok(Self {
            tools_client,
            inference,
            tools,
            system_prompt,
        })
    }

    pub fn tools(&self) -> &[ToolInfo] {
        &self.tools
    }

    /// Answer one user query, calling at most one tool.
    pub async fn process_query(&self, query: &str) -> Result<String> {
        println!("\n{} Processing query: {}", ">>>".cyan().bold(), query);

        let mut messages = vec![
            ChatMessage::system(self.system_prompt.clone()),
            ChatMessage::user(query),
        ];

        println!("{} Sending query to {}...", ">>>".cyan().bold(), self.inference.model());
        let reply = self.inference.chat(&messages).await?;

        let Some(call) = extract::extract_tool_call(&reply) else {
            return Ok(reply);
        };

        match self.answer_with_tool(&mut messages, &reply, call).await {
            Ok(answer) => Ok(answer),
            Err(e) => {
                warn!("Tool step failed: {:#}", e);
                println!("{} Error processing tool call: {:#}", "!!!".red().bold(), e);
                Ok(reply)
            }
        }
    }

    async fn answer_with_tool(
        &self,
        messages: &mut Vec<ChatMessage>,
        reply: &str,
        call: ExtractedToolCall,
    ) -> Result<String> {
        let tool = call
            .tool
            .ok_or_else(|| anyhow!("model reply has no tool name"))?;

        let params_json = serde_json::to_string_pretty(&call.parameters)?;
        println!("\n{} Model is calling tool: {}", ">>>".yellow().bold(), tool.bold());
        println!("    with parameters: {}", params_json);

        let result = self.tools_client.call_tool(&tool, &call.parameters).await?;
        let preview: String = result.chars().take(RESULT_PREVIEW_CHARS).collect();
        println!("\n{} Tool result: {}...", ">>>".green().bold(), preview);

        messages.push(ChatMessage::assistant(reply));
        messages.push(ChatMessage::user(format!("Tool result: {}", result)));

        println!("{} Getting final response with tool results...", ">>>".cyan().bold());
        self.inference.chat(messages).await
    }
}

/// True for the words that end the session.
fn is_exit_command(line: &str) -> bool {
    matches!(line.trim().to_lowercase().as_str(), "exit" | "quit")
}

/// Read queries line by line until `exit`, `quit` or end of input.
///
/// Per-query errors are printed and the loop carries on.
pub async fn run_interactive<R>(client: &QueryClient, input: R) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    println!();
    println!("{}", "===== BREEZE BRIDGE CHAT =====".bold());
    println!(
        "Connected with {} tools. Type your financial data query or 'exit' to quit",
        client.tools().len()
    );

    let mut lines = input.lines();
    loop {
        print!("\n{} ", "Your query:".bold());
        let _ = std::io::stdout().flush();

        let Some(line) = lines.next_line().await.context("Failed to read input")? else {
            break;
        };
        if is_exit_command(&line) {
            break;
        }
        if line.trim().is_empty() {
            continue;
        }

        match client.process_query(line.trim()).await {
            Ok(answer) => {
                println!("\n{}", "Response:".bold());
                println!("{}", answer);
            }
            Err(e) => {
                warn!("Query failed: {:#}", e);
                println!("{} {:#}", "Error:".red().bold(), e);
            }
        }
    }

    info!("Chat session ended");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const INFO: &str = r#"{"name":"icici-direct-breeze","description":"d","tools":[
        {"name":"get_funds","description":"Fetch funds","parameters":{}}
    ]}"#;

    fn chat_reply(content: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "model": "llama3",
            "message": {"role": "assistant", "content": content},
            "done": true
        }))
    }

    async fn tool_server() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/info"))
            .respond_with(ResponseTemplate::new(200).set_body_string(INFO))
            .mount(&server)
            .await;
        server
    }

    async fn client(tools: &MockServer, model: &MockServer) -> QueryClient {
        let timeout = Duration::from_secs(5);
        QueryClient::connect(
            ToolServerClient::new(&tools.uri(), timeout).unwrap(),
            InferenceClient::new(&model.uri(), "llama3", timeout).unwrap(),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn discovery_failure_aborts() {
        let tools = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/info"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&tools)
            .await;
        let model = MockServer::start().await;

        let timeout = Duration::from_secs(5);
        let result = QueryClient::connect(
            ToolServerClient::new(&tools.uri(), timeout).unwrap(),
            InferenceClient::new(&model.uri(), "llama3", timeout).unwrap(),
        )
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn plain_answer_is_returned_unmodified() {
        let tools = tool_server().await;
        Mock::given(method("POST"))
            .and(path("/tools/get_funds"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&tools)
            .await;
        let model = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(chat_reply("Markets close at 3:30 PM IST."))
            .expect(1)
            .mount(&model)
            .await;

        let client = client(&tools, &model).await;
        assert_eq!(client.tools().len(), 1);
        let answer = client.process_query("When do markets close?").await.unwrap();
        assert_eq!(answer, "Markets close at 3:30 PM IST.");
    }

    #[tokio::test]
    async fn tool_call_result_feeds_second_reply() {
        let tools = tool_server().await;
        Mock::given(method("POST"))
            .and(path("/tools/get_funds"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"result": "{\"total_bank_balance\": 1000}"})),
            )
            .expect(1)
            .mount(&tools)
            .await;

        let model = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_string_contains("Tool result:"))
            .respond_with(chat_reply("You have INR 1000 available."))
            .with_priority(1)
            .expect(1)
            .mount(&model)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(chat_reply(
                "Let me check.\n```json\n{\"tool\": \"get_funds\", \"parameters\": {}}\n```",
            ))
            .expect(1)
            .mount(&model)
            .await;

        let client = client(&tools, &model).await;
        let answer = client.process_query("How much cash do I have?").await.unwrap();
        assert_eq!(answer, "You have INR 1000 available.");
    }

    #[tokio::test]
    async fn failed_tool_call_falls_back_to_first_reply() {
        let tools = tool_server().await;
        Mock::given(method("POST"))
            .and(path("/tools/get_funds"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({"detail": "boom"})))
            .mount(&tools)
            .await;

        let first = r#"Checking: {"tool": "get_funds", "parameters": {}}"#;
        let model = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(chat_reply(first))
            .expect(1)
            .mount(&model)
            .await;

        let client = client(&tools, &model).await;
        let answer = client.process_query("funds?").await.unwrap();
        assert_eq!(answer, first);
    }

    #[tokio::test]
    async fn call_without_tool_name_falls_back() {
        let tools = tool_server().await;
        let model = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(chat_reply(r#"{"answer": "42"}"#))
            .mount(&model)
            .await;

        let client = client(&tools, &model).await;
        let answer = client.process_query("meaning?").await.unwrap();
        assert_eq!(answer, r#"{"answer": "42"}"#);
    }

    #[tokio::test]
    async fn model_failure_is_an_error() {
        let tools = tool_server().await;
        let model = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&model)
            .await;

        let client = client(&tools, &model).await;
        assert!(client.process_query("hello").await.is_err());
    }

    #[tokio::test]
    async fn interactive_loop_stops_at_exit_and_survives_errors() {
        let tools = tool_server().await;
        let model = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(500))
            .expect(2)
            .mount(&model)
            .await;

        let client = client(&tools, &model).await;
        let input: &[u8] = b"first\n\n  \nsecond\nQUIT\nnever sent\n";
        run_interactive(&client, input).await.unwrap();
    }

    #[test]
    fn exit_words_are_case_insensitive() {
        assert!(is_exit_command("exit"));
        assert!(is_exit_command(" Quit "));
        assert!(!is_exit_command("exit now"));
    }
}
