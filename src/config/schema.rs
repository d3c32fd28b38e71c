//! Configuration schema for bridge.toml.

use serde::{Deserialize, Serialize};

/// Root configuration structure shared by `serve` and `chat`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Breeze API key (`ICICI_API_KEY`). Empty keys are passed through.
    pub api_key: String,

    /// Address the HTTP server binds to.
    pub host: String,

    /// Port the HTTP server listens on (`PORT`).
    pub port: u16,

    /// Breeze REST base URL.
    pub breeze_api_url: String,

    /// Breeze live-feed WebSocket URL.
    pub breeze_feed_url: String,

    /// Tool server URL used by the chat client (`BRIDGE_SERVER_URL`).
    pub server_url: String,

    /// Ollama base URL (`OLLAMA_HOST`).
    pub ollama_url: String,

    /// Model used for the chat client (`OLLAMA_MODEL`).
    pub model: String,

    /// Timeout for broker, tool-server and feed handshake calls, in seconds.
    pub http_timeout_secs: u64,

    /// Timeout for one model reply, in seconds. Local models on CPU are slow.
    pub inference_timeout_secs: u64,

    /// Log level (debug, info, warn, error).
    pub log_level: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            host: "0.0.0.0".into(),
            port: 8080,
            breeze_api_url: "https://api.icicidirect.com/breezeapi/api/v1".into(),
            breeze_feed_url:
                "wss://livestream.icicidirect.com/socket.io/?EIO=4&transport=websocket".into(),
            server_url: "http://localhost:8080".into(),
            ollama_url: "http://localhost:11434".into(),
            model: "llama3".into(),
            http_timeout_secs: 30,
            inference_timeout_secs: 600,
            log_level: "info".into(),
        }
    }
}

impl BridgeConfig {
    /// Socket address string for the HTTP listener.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Outbound HTTP timeout.
    pub fn http_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.http_timeout_secs)
    }

    /// Timeout for Ollama chat requests.
    pub fn inference_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.inference_timeout_secs)
    }
}
