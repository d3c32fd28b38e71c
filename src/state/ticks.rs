//! Latest-tick cache keyed by stock token.

use crate::types::{TickRecord, STOCK_TOKEN_FIELD};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

/// Holds the newest tick per token. Last write wins; entries are never evicted.
#[derive(Debug, Default)]
pub struct TickCache {
    ticks: RwLock<BTreeMap<String, TickRecord>>,
}

/// Cache key for a token value. Strings are used verbatim, anything else by
/// its JSON text.
fn token_key(token: &Value) -> String {
    match token {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl TickCache {
    /// Apply a batch of feed records in order. Records that are not objects
    /// or carry no `stock_token` are skipped.
    pub fn on_ticks(&self, records: Vec<Value>) {
        let mut ticks = self.ticks.write();
        let mut applied = 0usize;
        for record in records {
            let Value::Object(record) = record else { continue };
            let Some(token) = record.get(STOCK_TOKEN_FIELD).map(token_key) else {
                continue;
            };
            ticks.insert(token, record);
            applied += 1;
        }
        debug!("Tick cache updated: {} records applied", applied);
    }

    /// Latest record for one token.
    pub fn get(&self, token: &str) -> Option<TickRecord> {
        self.ticks.read().get(token).cloned()
    }

    /// Copy of the whole cache.
    pub fn snapshot(&self) -> BTreeMap<String, TickRecord> {
        self.ticks.read().clone()
    }

    /// Render the cache the way `get_latest_ticks` reports it: one record
    /// for a given token, or every record when `token` is `None`.
    pub fn render(&self, token: Option<&str>) -> String {
        match token {
            Some(token) => match self.get(token) {
                Some(record) => to_pretty_json(&record),
                None => format!("No ticks received for {} yet", token),
            },
            None => to_pretty_json(&self.snapshot()),
        }
    }
}

/// Two-space indented JSON.
pub fn to_pretty_json<T: serde::Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("<unserializable: {}>", e))
}
