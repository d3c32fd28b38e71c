//! ICICI Direct Breeze API access.
//!
//! [`BrokerApi`] is the only surface the tool handlers see. [`BreezeClient`]
//! implements it against the real REST endpoints and live feed; tests use an
//! in-memory fake.

pub mod client;
#[cfg(test)]
pub mod fake;
pub mod feed;

pub use client::BreezeClient;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

/// Callback invoked by the live feed with each batch of raw tick records.
pub type TickHandler = Arc<dyn Fn(Vec<Value>) + Send + Sync>;

/// Callback invoked when the live feed drops without a local disconnect.
pub type CloseHandler = Arc<dyn Fn() + Send + Sync>;

/// Errors raised by broker calls. Tool handlers turn these into strings.
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("session not initialized, call initialize_session first")]
    NoSession,

    #[error("live feed is not connected")]
    FeedClosed,

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Breeze API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("feed error: {0}")]
    Feed(String),
}

/// Arguments for `historicalcharts`. `None` fields are left out of the request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HistoricalDataQuery {
    pub interval: String,
    pub from_date: String,
    pub to_date: String,
    pub stock_code: String,
    pub exchange_code: String,
    pub product_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub right: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strike_price: Option<String>,
}

/// Arguments for `quotes`. `None` fields are left out of the request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QuoteQuery {
    pub stock_code: String,
    pub exchange_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub right: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strike_price: Option<String>,
}

/// Operations the bridge needs from the brokerage.
#[async_trait]
pub trait BrokerApi: Send + Sync {
    /// Register the callback that receives live ticks. Replaces any earlier one.
    fn set_tick_handler(&self, handler: TickHandler);

    /// Register the callback fired when the server ends the feed.
    fn set_close_handler(&self, handler: CloseHandler);

    /// Exchange the login session token for an API session.
    async fn generate_session(
        &self,
        api_secret: &str,
        session_token: &str,
    ) -> Result<(), BrokerError>;

    /// Open the live feed.
    async fn ws_connect(&self) -> Result<(), BrokerError>;

    /// Close the live feed.
    async fn ws_disconnect(&self) -> Result<(), BrokerError>;

    async fn subscribe_feeds(
        &self,
        stock_token: &str,
        interval: Option<&str>,
    ) -> Result<(), BrokerError>;

    async fn unsubscribe_feeds(
        &self,
        stock_token: &str,
        interval: Option<&str>,
    ) -> Result<(), BrokerError>;

    async fn get_customer_details(&self, api_session: &str) -> Result<Value, BrokerError>;

    async fn get_demat_holdings(&self) -> Result<Value, BrokerError>;

    async fn get_funds(&self) -> Result<Value, BrokerError>;

    async fn get_historical_data(
        &self,
        query: &HistoricalDataQuery,
    ) -> Result<Value, BrokerError>;

    async fn get_quotes(&self, query: &QuoteQuery) -> Result<Value, BrokerError>;
}
