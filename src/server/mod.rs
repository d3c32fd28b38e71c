//! HTTP surface for the tool registry.
//!
//! Routes:
//!   GET  /                  health
//!   GET  /info              tool discovery
//!   POST /tools/call        `{tool_name, parameters}`
//!   POST /tools/:tool_name  parameter object as the body

use crate::tools::{self, execute_tool, find_tool, ToolContext, ToolError};
use crate::types::{ServerInfo, ToolInvocationRequest, ToolParams, ToolResponse};
use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{error, info};

pub const SERVICE_NAME: &str = "ICICI Direct MCP HTTP Server";
pub const SERVER_NAME: &str = "icici-direct-breeze";
pub const SERVER_DESCRIPTION: &str = "ICICI Direct Breeze API MCP Server";

/// Error response with a `{detail}` body.
#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    detail: String,
}

impl HttpError {
    fn not_found(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            detail: detail.into(),
        }
    }

    fn internal(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            detail: detail.into(),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { detail: self.detail })).into_response()
    }
}

/// Build the router over a tool context.
pub fn router(ctx: ToolContext) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/info", get(server_info_handler))
        .route("/tools/call", post(call_tool))
        .route("/tools/:tool_name", post(call_named_tool))
        .with_state(ctx)
}

/// Bind and serve until Ctrl+C.
pub async fn serve(ctx: ToolContext, addr: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Starting {} on {}", SERVICE_NAME, addr);

    axum::serve(listener, router(ctx))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await
        .context("HTTP server error")
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy", "service": SERVICE_NAME }))
}

/// Discovery payload for every registered tool.
pub fn server_info() -> ServerInfo {
    ServerInfo {
        name: SERVER_NAME.into(),
        description: SERVER_DESCRIPTION.into(),
        tools: tools::tool_definitions().iter().map(|t| t.info()).collect(),
    }
}

async fn server_info_handler() -> Json<ServerInfo> {
    Json(server_info())
}

async fn run(
    ctx: &ToolContext,
    name: &str,
    params: &ToolParams,
) -> Result<Json<ToolResponse>, HttpError> {
    match execute_tool(ctx, name, params).await {
        Ok(result) => Ok(Json(ToolResponse {
            result: result.output,
        })),
        Err(ToolError::NotFound(name)) => {
            Err(HttpError::not_found(format!("Tool {} not found", name)))
        }
        Err(e) => {
            error!("Error calling tool {}: {}", name, e);
            Err(HttpError::internal(format!("Error calling tool: {}", e)))
        }
    }
}

async fn call_tool(
    State(ctx): State<ToolContext>,
    Json(request): Json<ToolInvocationRequest>,
) -> Result<Json<ToolResponse>, HttpError> {
    run(&ctx, &request.tool_name, &request.parameters).await
}

async fn call_named_tool(
    State(ctx): State<ToolContext>,
    Path(tool_name): Path<String>,
    body: Bytes,
) -> Result<Json<ToolResponse>, HttpError> {
    if find_tool(&tool_name).is_none() {
        return Err(HttpError::not_found(format!("Tool {} not found", tool_name)));
    }

    let params = parse_params(&body).map_err(|detail| {
        error!("Error in endpoint {}: {}", tool_name, detail);
        HttpError::internal(detail)
    })?;

    run(&ctx, &tool_name, &params).await
}

/// Parse a raw parameter body. An empty body means no parameters.
fn parse_params(body: &[u8]) -> Result<ToolParams, String> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(ToolParams::new());
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err("request body must be a JSON object".into()),
        Err(e) => Err(format!("invalid JSON body: {}", e)),
    }
}
