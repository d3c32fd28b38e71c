//! In-memory [`BrokerApi`] for tests.

use super::{
    BrokerApi, BrokerError, CloseHandler, HistoricalDataQuery, QuoteQuery, TickHandler,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashSet;

/// Records every call; operations named in `failing` return an error.
#[derive(Default)]
pub struct FakeBroker {
    failing: Mutex<HashSet<&'static str>>,
    pub calls: Mutex<Vec<String>>,
    pub subscriptions: Mutex<Vec<(String, Option<String>)>>,
    pub last_quote: Mutex<Option<QuoteQuery>>,
    pub last_history: Mutex<Option<HistoricalDataQuery>>,
    handler: Mutex<Option<TickHandler>>,
    close_handler: Mutex<Option<CloseHandler>>,
}

impl FakeBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `operation` fail from now on.
    pub fn fail(&self, operation: &'static str) {
        self.failing.lock().insert(operation);
    }

    /// Push ticks through the registered handler as the live feed would.
    pub fn push_ticks(&self, ticks: Vec<Value>) {
        if let Some(handler) = self.handler.lock().clone() {
            handler(ticks);
        }
    }

    /// End the feed from the server side.
    pub fn drop_feed(&self) {
        if let Some(handler) = self.close_handler.lock().clone() {
            handler();
        }
    }

    fn record(&self, operation: &'static str) -> Result<(), BrokerError> {
        self.calls.lock().push(operation.to_string());
        if self.failing.lock().contains(operation) {
            return Err(BrokerError::Status {
                status: 500,
                body: format!("{} unavailable", operation),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl BrokerApi for FakeBroker {
    fn set_tick_handler(&self, handler: TickHandler) {
        *self.handler.lock() = Some(handler);
    }

    fn set_close_handler(&self, handler: CloseHandler) {
        *self.close_handler.lock() = Some(handler);
    }

    async fn generate_session(
        &self,
        _api_secret: &str,
        _session_token: &str,
    ) -> Result<(), BrokerError> {
        self.record("generate_session")
    }

    async fn ws_connect(&self) -> Result<(), BrokerError> {
        self.record("ws_connect")
    }

    async fn ws_disconnect(&self) -> Result<(), BrokerError> {
        self.record("ws_disconnect")
    }

    async fn subscribe_feeds(
        &self,
        stock_token: &str,
        interval: Option<&str>,
    ) -> Result<(), BrokerError> {
        self.record("subscribe_feeds")?;
        self.subscriptions
            .lock()
            .push((stock_token.to_string(), interval.map(str::to_string)));
        Ok(())
    }

    async fn unsubscribe_feeds(
        &self,
        _stock_token: &str,
        _interval: Option<&str>,
    ) -> Result<(), BrokerError> {
        self.record("unsubscribe_feeds")
    }

    async fn get_customer_details(&self, api_session: &str) -> Result<Value, BrokerError> {
        self.record("get_customer_details")?;
        Ok(json!({
            "Success": {"api_session": api_session},
            "Status": 200,
            "Error": null
        }))
    }

    async fn get_demat_holdings(&self) -> Result<Value, BrokerError> {
        self.record("get_demat_holdings")?;
        Ok(json!({"Success": [], "Status": 200, "Error": null}))
    }

    async fn get_funds(&self) -> Result<Value, BrokerError> {
        self.record("get_funds")?;
        Ok(json!({
            "Success": {"total_bank_balance": 1000.0},
            "Status": 200,
            "Error": null
        }))
    }

    async fn get_historical_data(
        &self,
        query: &HistoricalDataQuery,
    ) -> Result<Value, BrokerError> {
        self.record("get_historical_data")?;
        *self.last_history.lock() = Some(query.clone());
        Ok(json!({"Success": [], "Status": 200, "Error": null}))
    }

    async fn get_quotes(&self, query: &QuoteQuery) -> Result<Value, BrokerError> {
        self.record("get_quotes")?;
        *self.last_quote.lock() = Some(query.clone());
        Ok(json!({
            "Success": [{"stock_code": query.stock_code, "ltp": 440.5}],
            "Status": 200,
            "Error": null
        }))
    }
}
