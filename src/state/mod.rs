//! Shared server state: feed connection flag and the tick cache.

pub mod ticks;

pub use ticks::{to_pretty_json, TickCache};

use crate::breeze::{CloseHandler, TickHandler};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// State of the live feed as seen by the tool handlers.
#[derive(Debug, Default)]
pub struct FeedState {
    connected: AtomicBool,
    ticks: TickCache,
}

impl FeedState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Release);
    }

    pub fn ticks(&self) -> &TickCache {
        &self.ticks
    }

    /// Callback to register with the broker so feed ticks land in the cache.
    pub fn tick_handler(self: &Arc<Self>) -> TickHandler {
        let state = Arc::clone(self);
        Arc::new(move |records| state.ticks.on_ticks(records))
    }

    /// Callback to register with the broker so a dropped feed reads as disconnected.
    pub fn close_handler(self: &Arc<Self>) -> CloseHandler {
        let state = Arc::clone(self);
        Arc::new(move || state.set_connected(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn handler_writes_into_cache() {
        let state = Arc::new(FeedState::new());
        let handler = state.tick_handler();
        handler(vec![json!({"stock_token": "4.1!2885", "ltp": 2950.5})]);
        assert_eq!(state.ticks().get("4.1!2885").unwrap()["ltp"], 2950.5);
    }

    #[test]
    fn close_handler_clears_connection() {
        let state = Arc::new(FeedState::new());
        state.set_connected(true);
        (state.close_handler())();
        assert!(!state.is_connected());
    }

    #[test]
    fn starts_disconnected() {
        let state = FeedState::new();
        assert!(!state.is_connected());
        state.set_connected(true);
        assert!(state.is_connected());
    }
}
