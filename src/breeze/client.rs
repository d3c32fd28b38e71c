//! Breeze REST client and live-feed owner.
//!
//! Authenticated calls carry a JSON body (GET included) and are signed with
//! `sha256(timestamp + body + secret)`.

use super::feed::{subscription_args, FeedConnection, FeedHandlers};
use super::{
    BrokerApi, BrokerError, CloseHandler, HistoricalDataQuery, QuoteQuery, TickHandler,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::Engine as _;
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Credentials established by `generate_session`.
#[derive(Debug, Clone)]
struct Session {
    secret_key: String,
    /// Base64 `user_id:session_key`, sent as `X-SessionToken`.
    encoded_token: String,
    user_id: String,
    session_key: String,
}

/// Breeze API client.
pub struct BreezeClient {
    base_url: String,
    feed_url: String,
    api_key: String,
    http: reqwest::Client,
    /// Limit on connecting and authenticating the live feed.
    feed_timeout: Duration,
    session: parking_lot::RwLock<Option<Session>>,
    feed: Mutex<Option<FeedConnection>>,
    handlers: parking_lot::RwLock<FeedHandlers>,
}

#[derive(Debug, Serialize)]
struct CustomerDetailsRequest<'a> {
    #[serde(rename = "SessionToken")]
    session_token: &'a str,
    #[serde(rename = "AppKey")]
    app_key: &'a str,
}

/// Timestamp format Breeze expects in `X-Timestamp`.
fn breeze_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S.000Z").to_string()
}

/// Request checksum: hex sha256 over timestamp, compact JSON body and secret.
pub fn checksum(timestamp: &str, body: &str, secret_key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(timestamp.as_bytes());
    hasher.update(body.as_bytes());
    hasher.update(secret_key.as_bytes());
    hex::encode(hasher.finalize())
}

/// Split the base64 `user_id:session_key` token returned by `customerdetails`.
pub fn decode_session_token(encoded: &str) -> Result<(String, String), BrokerError> {
    let raw = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|e| BrokerError::InvalidResponse(format!("session token is not base64: {}", e)))?;
    let text = String::from_utf8(raw)
        .map_err(|_| BrokerError::InvalidResponse("session token is not UTF-8".into()))?;
    match text.split_once(':') {
        Some((user, key)) if !user.is_empty() && !key.is_empty() => {
            Ok((user.to_string(), key.to_string()))
        }
        _ => Err(BrokerError::InvalidResponse(
            "session token is not of the form user:key".into(),
        )),
    }
}

impl BreezeClient {
    /// Create a new Breeze client. No network traffic happens until a tool runs.
    pub fn new(base_url: &str, feed_url: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build Breeze HTTP client")?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            feed_url: feed_url.to_string(),
            api_key: api_key.to_string(),
            http,
            feed_timeout: timeout,
            session: parking_lot::RwLock::new(None),
            feed: Mutex::new(None),
            handlers: parking_lot::RwLock::new(FeedHandlers::default()),
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint)
    }

    fn session(&self) -> Result<Session, BrokerError> {
        self.session.read().clone().ok_or(BrokerError::NoSession)
    }

    async fn read_json(resp: reqwest::Response, endpoint: &str) -> Result<Value, BrokerError> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(BrokerError::Status {
                status: status.as_u16(),
                body,
            });
        }
        resp.json()
            .await
            .map_err(|e| BrokerError::InvalidResponse(format!("{}: {}", endpoint, e)))
    }

    /// Signed GET with a JSON body.
    async fn signed_get<B: Serialize>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<Value, BrokerError> {
        let session = self.session()?;
        let payload = serde_json::to_string(body)
            .map_err(|e| BrokerError::InvalidResponse(e.to_string()))?;
        let timestamp = breeze_timestamp();
        let signature = checksum(&timestamp, &payload, &session.secret_key);

        debug!("Breeze GET {}", endpoint);

        let resp = self
            .http
            .get(self.url(endpoint))
            .header("Content-Type", "application/json")
            .header("X-Checksum", format!("token {}", signature))
            .header("X-Timestamp", timestamp)
            .header("X-AppKey", &self.api_key)
            .header("X-SessionToken", &session.encoded_token)
            .body(payload)
            .send()
            .await?;

        Self::read_json(resp, endpoint).await
    }

    /// Unsigned `customerdetails` lookup; the only call usable before a session exists.
    async fn customer_details(&self, session_token: &str) -> Result<Value, BrokerError> {
        let payload = serde_json::to_string(&CustomerDetailsRequest {
            session_token,
            app_key: &self.api_key,
        })
        .map_err(|e| BrokerError::InvalidResponse(e.to_string()))?;

        let resp = self
            .http
            .get(self.url("customerdetails"))
            .header("Content-Type", "application/json")
            .body(payload)
            .send()
            .await?;

        Self::read_json(resp, "customerdetails").await
    }

    async fn emit_subscription(
        &self,
        event: &str,
        stock_token: &str,
        interval: Option<&str>,
    ) -> Result<(), BrokerError> {
        let feed = self.feed.lock().await;
        let conn = feed.as_ref().ok_or(BrokerError::FeedClosed)?;
        conn.emit(event, &subscription_args(stock_token, interval))
    }
}

#[async_trait]
impl BrokerApi for BreezeClient {
    fn set_tick_handler(&self, handler: TickHandler) {
        self.handlers.write().on_ticks = Some(handler);
    }

    fn set_close_handler(&self, handler: CloseHandler) {
        self.handlers.write().on_close = Some(handler);
    }

    async fn generate_session(
        &self,
        api_secret: &str,
        session_token: &str,
    ) -> Result<(), BrokerError> {
        let details = self.customer_details(session_token).await?;
        let encoded = details
            .pointer("/Success/session_token")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                let error = details
                    .get("Error")
                    .and_then(Value::as_str)
                    .unwrap_or("missing Success.session_token");
                BrokerError::InvalidResponse(error.to_string())
            })?;
        let (user_id, session_key) = decode_session_token(encoded)?;

        info!("Breeze session established for user {}", user_id);
        *self.session.write() = Some(Session {
            secret_key: api_secret.to_string(),
            encoded_token: encoded.to_string(),
            user_id,
            session_key,
        });
        Ok(())
    }

    async fn ws_connect(&self) -> Result<(), BrokerError> {
        let session = self.session()?;
        let handlers = self.handlers.read().clone();
        let conn = FeedConnection::open(
            &self.feed_url,
            &session.user_id,
            &session.session_key,
            self.feed_timeout,
            handlers,
        )
        .await?;

        let mut feed = self.feed.lock().await;
        if let Some(previous) = feed.replace(conn) {
            previous.close().await;
        }
        Ok(())
    }

    async fn ws_disconnect(&self) -> Result<(), BrokerError> {
        let conn = self.feed.lock().await.take();
        match conn {
            Some(conn) => {
                conn.close().await;
                Ok(())
            }
            None => Err(BrokerError::FeedClosed),
        }
    }

    async fn subscribe_feeds(
        &self,
        stock_token: &str,
        interval: Option<&str>,
    ) -> Result<(), BrokerError> {
        self.emit_subscription("join", stock_token, interval).await
    }

    async fn unsubscribe_feeds(
        &self,
        stock_token: &str,
        interval: Option<&str>,
    ) -> Result<(), BrokerError> {
        self.emit_subscription("leave", stock_token, interval).await
    }

    async fn get_customer_details(&self, api_session: &str) -> Result<Value, BrokerError> {
        self.customer_details(api_session).await
    }

    async fn get_demat_holdings(&self) -> Result<Value, BrokerError> {
        self.signed_get("dematholdings", &json!({})).await
    }

    async fn get_funds(&self) -> Result<Value, BrokerError> {
        self.signed_get("funds", &json!({})).await
    }

    async fn get_historical_data(
        &self,
        query: &HistoricalDataQuery,
    ) -> Result<Value, BrokerError> {
        self.signed_get("historicalcharts", query).await
    }

    async fn get_quotes(&self, query: &QuoteQuery) -> Result<Value, BrokerError> {
        self.signed_get("quotes", query).await
    }
}
