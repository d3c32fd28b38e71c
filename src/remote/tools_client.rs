//! HTTP client for the bridge's tool server: discovery and invocation.

use crate::types::{ServerInfo, ToolInfo, ToolParams, ToolResponse};
use anyhow::{bail, Context, Result};
use std::time::Duration;
use tracing::debug;

/// Tool server client.
#[derive(Debug, Clone)]
pub struct ToolServerClient {
    base_url: String,
    http: reqwest::Client,
}

impl ToolServerClient {
    /// Create a new client. Every request is bounded by `timeout`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build tool server HTTP client")?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch the tool list from `GET /info`.
    pub async fn discover(&self) -> Result<Vec<ToolInfo>> {
        let resp = self
            .http
            .get(format!("{}/info", self.base_url))
            .send()
            .await
            .context("Tool discovery request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("Tool discovery failed ({}): {}", status, body);
        }

        let info: ServerInfo = resp
            .json()
            .await
            .context("Failed to parse tool server info")?;
        debug!("Discovered {} tools from {}", info.tools.len(), info.name);
        Ok(info.tools)
    }

    /// Invoke a tool through `POST /tools/{name}` and return its result string.
    pub async fn call_tool(&self, name: &str, params: &ToolParams) -> Result<String> {
        debug!("Calling remote tool {}", name);

        let resp = self
            .http
            .post(format!("{}/tools/{}", self.base_url, name))
            .json(params)
            .send()
            .await
            .with_context(|| format!("Tool call {} failed", name))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("Tool {} failed ({}): {}", name, status, body);
        }

        let body: ToolResponse = resp
            .json()
            .await
            .with_context(|| format!("Failed to parse result of tool {}", name))?;
        Ok(body.result)
    }
}
