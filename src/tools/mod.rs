pub mod definitions;

pub use definitions::{find_tool, ToolDescriptor, ToolParam, TOOLS};

use crate::breeze::{BrokerApi, BrokerError, HistoricalDataQuery, QuoteQuery};
use crate::state::{to_pretty_json, FeedState};
use crate::types::{ToolParams, ToolResult};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

/// Returned by feed-dependent tools while the feed is down.
pub const NOT_CONNECTED: &str = "WebSocket is not connected. Please connect first.";

/// Returned by `unsubscribe_stock_feeds` while the feed is down.
pub const NOT_CONNECTED_SHORT: &str = "WebSocket is not connected.";

/// Errors that stop a tool before its body runs.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ToolError {
    #[error("Tool {0} not found")]
    NotFound(String),

    #[error("{tool}: {reason}")]
    InvalidArguments { tool: String, reason: String },
}

// ---------------------------------------------------------------------------
// Tool definitions
// ---------------------------------------------------------------------------

/// Every registered tool, in registration order.
pub fn tool_definitions() -> &'static [ToolDescriptor] {
    TOOLS
}

// ---------------------------------------------------------------------------
// Argument binding
// ---------------------------------------------------------------------------

/// Parameters checked against a tool's declaration.
#[derive(Debug)]
struct BoundArgs {
    values: HashMap<&'static str, String>,
}

impl BoundArgs {
    fn bind(tool: &ToolDescriptor, params: &ToolParams) -> Result<Self, ToolError> {
        let invalid = |reason: String| ToolError::InvalidArguments {
            tool: tool.name.to_string(),
            reason,
        };

        let mut values = HashMap::new();
        for (name, value) in params {
            let param = tool
                .param(name)
                .ok_or_else(|| invalid(format!("unexpected argument '{}'", name)))?;
            let text = match value {
                Value::Null => continue,
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                Value::Array(_) | Value::Object(_) => {
                    return Err(invalid(format!("argument '{}' must be a string", name)));
                }
            };
            values.insert(param.name, text);
        }

        if let Some(missing) = tool
            .params
            .iter()
            .find(|p| p.required && !values.contains_key(p.name))
        {
            return Err(invalid(format!(
                "missing required argument '{}'",
                missing.name
            )));
        }

        Ok(Self { values })
    }

    /// A required argument. Binding guarantees presence.
    fn required(&self, name: &str) -> String {
        self.values.get(name).cloned().unwrap_or_default()
    }

    /// An optional argument; empty strings count as absent.
    fn optional(&self, name: &str) -> Option<String> {
        self.values.get(name).filter(|v| !v.is_empty()).cloned()
    }
}

// ---------------------------------------------------------------------------
// Tool execution engine
// ---------------------------------------------------------------------------

/// Context passed to tool execution: the broker and the live-feed state.
#[derive(Clone)]
pub struct ToolContext {
    pub broker: Arc<dyn BrokerApi>,
    pub feed: Arc<FeedState>,
}

impl ToolContext {
    /// Build a context and route the broker's feed events into the feed state.
    pub fn new(broker: Arc<dyn BrokerApi>) -> Self {
        let feed = Arc::new(FeedState::new());
        broker.set_tick_handler(feed.tick_handler());
        broker.set_close_handler(feed.close_handler());
        Self { broker, feed }
    }
}

/// Execute a tool call by name.
///
/// Broker failures come back inside the [`ToolResult`]; only an unknown name
/// or unusable arguments produce an `Err`.
pub async fn execute_tool(
    ctx: &ToolContext,
    name: &str,
    params: &ToolParams,
) -> Result<ToolResult, ToolError> {
    let tool = find_tool(name).ok_or_else(|| ToolError::NotFound(name.to_string()))?;
    let args = BoundArgs::bind(tool, params)?;

    info!("Tool call: {}", name);

    let result = match tool.name {
        "initialize_session" => initialize_session(ctx, &args).await,
        "connect_websocket" => connect_websocket(ctx).await,
        "disconnect_websocket" => disconnect_websocket(ctx).await,
        "subscribe_stock_feeds" => subscribe_stock_feeds(ctx, &args).await,
        "unsubscribe_stock_feeds" => unsubscribe_stock_feeds(ctx, &args).await,
        "get_latest_ticks" => get_latest_ticks(ctx, &args),
        "get_customer_details" => {
            let api_session = args.required("api_session");
            json_result(
                "get customer details",
                ctx.broker.get_customer_details(&api_session).await,
            )
        }
        "get_demat_holdings" => {
            json_result("get demat holdings", ctx.broker.get_demat_holdings().await)
        }
        "get_funds" => json_result("get funds", ctx.broker.get_funds().await),
        "get_historical_data" => get_historical_data(ctx, &args).await,
        "get_quotes" => get_quotes(ctx, &args).await,
        _ => return Err(ToolError::NotFound(name.to_string())),
    };

    Ok(result)
}

/// Failure string reported to the caller, logged on the way out.
fn failure(action: &str, err: &BrokerError) -> ToolResult {
    error!("Failed to {}: {}", action, err);
    ToolResult::failed(format!("Failed to {}: {}", action, err))
}

/// Indented JSON on success, `Failed to <action>: ...` otherwise.
fn json_result(action: &str, response: Result<Value, BrokerError>) -> ToolResult {
    match response {
        Ok(value) => ToolResult::ok(to_pretty_json(&value)),
        Err(e) => failure(action, &e),
    }
}

async fn initialize_session(ctx: &ToolContext, args: &BoundArgs) -> ToolResult {
    let api_secret = args.required("api_secret");
    let session_token = args.required("session_token");
    match ctx.broker.generate_session(&api_secret, &session_token).await {
        Ok(()) => ToolResult::ok("Session initialized successfully"),
        Err(e) => failure("initialize session", &e),
    }
}

async fn connect_websocket(ctx: &ToolContext) -> ToolResult {
    match ctx.broker.ws_connect().await {
        Ok(()) => {
            ctx.feed.set_connected(true);
            ToolResult::ok("WebSocket connected successfully")
        }
        Err(e) => {
            ctx.feed.set_connected(false);
            failure("connect to WebSocket", &e)
        }
    }
}

async fn disconnect_websocket(ctx: &ToolContext) -> ToolResult {
    match ctx.broker.ws_disconnect().await {
        Ok(()) => {
            ctx.feed.set_connected(false);
            ToolResult::ok("WebSocket disconnected successfully")
        }
        Err(e) => failure("disconnect from WebSocket", &e),
    }
}

async fn subscribe_stock_feeds(ctx: &ToolContext, args: &BoundArgs) -> ToolResult {
    if !ctx.feed.is_connected() {
        return ToolResult::failed(NOT_CONNECTED);
    }

    let stock_token = args.required("stock_token");
    let interval = args.optional("interval");
    match ctx
        .broker
        .subscribe_feeds(&stock_token, interval.as_deref())
        .await
    {
        Ok(()) => match interval {
            Some(interval) => ToolResult::ok(format!(
                "Successfully subscribed to {} with interval {}",
                stock_token, interval
            )),
            None => ToolResult::ok(format!("Successfully subscribed to {}", stock_token)),
        },
        Err(e) => failure("subscribe to feeds", &e),
    }
}

async fn unsubscribe_stock_feeds(ctx: &ToolContext, args: &BoundArgs) -> ToolResult {
    if !ctx.feed.is_connected() {
        return ToolResult::failed(NOT_CONNECTED_SHORT);
    }

    let stock_token = args.required("stock_token");
    let interval = args.optional("interval");
    match ctx
        .broker
        .unsubscribe_feeds(&stock_token, interval.as_deref())
        .await
    {
        Ok(()) => match interval {
            Some(interval) => ToolResult::ok(format!(
                "Successfully unsubscribed from {} with interval {}",
                stock_token, interval
            )),
            None => ToolResult::ok(format!("Successfully unsubscribed from {}", stock_token)),
        },
        Err(e) => failure("unsubscribe from feeds", &e),
    }
}

fn get_latest_ticks(ctx: &ToolContext, args: &BoundArgs) -> ToolResult {
    if !ctx.feed.is_connected() {
        return ToolResult::failed(NOT_CONNECTED);
    }
    let token = args.optional("stock_token");
    ToolResult::ok(ctx.feed.ticks().render(token.as_deref()))
}

async fn get_historical_data(ctx: &ToolContext, args: &BoundArgs) -> ToolResult {
    let query = HistoricalDataQuery {
        interval: args.required("interval"),
        from_date: args.required("from_date"),
        to_date: args.required("to_date"),
        stock_code: args.required("stock_code"),
        exchange_code: args.required("exchange_code"),
        product_type: args.required("product_type"),
        expiry_date: args.optional("expiry_date"),
        right: args.optional("right"),
        strike_price: args.optional("strike_price"),
    };
    json_result(
        "get historical data",
        ctx.broker.get_historical_data(&query).await,
    )
}

async fn get_quotes(ctx: &ToolContext, args: &BoundArgs) -> ToolResult {
    let query = QuoteQuery {
        stock_code: args.required("stock_code"),
        exchange_code: args.required("exchange_code"),
        expiry_date: args.optional("expiry_date"),
        product_type: args.optional("product_type"),
        right: args.optional("right"),
        strike_price: args.optional("strike_price"),
    };
    json_result("get quotes", ctx.broker.get_quotes(&query).await)
}
