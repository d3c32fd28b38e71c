pub mod schema;

pub use schema::BridgeConfig;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Default config path (~/.breeze-bridge/bridge.toml).
pub fn default_config_path() -> PathBuf {
    directories::BaseDirs::new()
        .map(|d| d.home_dir().join(".breeze-bridge"))
        .unwrap_or_else(|| PathBuf::from(".breeze-bridge"))
        .join("bridge.toml")
}

/// Resolve a path that may contain `~` to an absolute path.
pub fn resolve_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).into_owned())
}

/// Load config from the given path, or return defaults.
pub fn load_config(path: &Path) -> Result<BridgeConfig> {
    if path.exists() {
        let contents =
            std::fs::read_to_string(path).context("Failed to read bridge config file")?;
        let config: BridgeConfig =
            toml::from_str(&contents).context("Failed to parse bridge config (TOML)")?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    } else {
        Ok(BridgeConfig::default())
    }
}

/// Apply environment overrides on top of a loaded config.
///
/// `lookup` is `std::env::var` in production; tests pass a closure.
pub fn apply_env_overrides<F>(config: &mut BridgeConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(key) = lookup("ICICI_API_KEY") {
        config.api_key = key;
    }
    if let Some(port) = lookup("PORT") {
        match port.parse::<u16>() {
            Ok(p) => config.port = p,
            Err(_) => warn!("Ignoring invalid PORT value: {}", port),
        }
    }
    if let Some(url) = lookup("BRIDGE_SERVER_URL") {
        config.server_url = url;
    }
    if let Some(url) = lookup("OLLAMA_HOST") {
        config.ollama_url = url;
    }
    if let Some(model) = lookup("OLLAMA_MODEL") {
        config.model = model;
    }
}

/// Load the config file then layer the process environment over it.
pub fn load_with_env(path: &Path) -> Result<BridgeConfig> {
    let mut config = load_config(path)?;
    apply_env_overrides(&mut config, |name| std::env::var(name).ok());
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, BridgeConfig::default());
        assert_eq!(config.port, 8080);
        assert_eq!(config.model, "llama3");
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bridge.toml");
        std::fs::write(&path, "port = 9090\nmodel = \"mistral\"\n").unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.port, 9090);
        assert_eq!(config.model, "mistral");
        assert_eq!(config.ollama_url, "http://localhost:11434");
    }

    #[test]
    fn model_replies_get_a_longer_timeout_than_http_calls() {
        let config = BridgeConfig::default();
        assert_eq!(config.http_timeout().as_secs(), 30);
        assert!(config.inference_timeout() > config.http_timeout());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bridge.toml");
        std::fs::write(&path, "inference_timeout_secs = 1200\n").unwrap();
        let config = load_config(&path).unwrap();
        assert_eq!(config.inference_timeout().as_secs(), 1200);
        assert_eq!(config.http_timeout_secs, 30);
    }

    #[test]
    fn env_overrides_file_values() {
        let mut config = BridgeConfig::default();
        let env: HashMap<&str, &str> = [
            ("ICICI_API_KEY", "key-123"),
            ("PORT", "7000"),
            ("OLLAMA_MODEL", "qwen2"),
        ]
        .into_iter()
        .collect();
        apply_env_overrides(&mut config, |name| env.get(name).map(|v| v.to_string()));

        assert_eq!(config.api_key, "key-123");
        assert_eq!(config.port, 7000);
        assert_eq!(config.model, "qwen2");
        assert_eq!(config.listen_addr(), "0.0.0.0:7000");
    }

    #[test]
    fn invalid_port_is_ignored() {
        let mut config = BridgeConfig::default();
        apply_env_overrides(&mut config, |name| {
            (name == "PORT").then(|| "not-a-port".to_string())
        });
        assert_eq!(config.port, 8080);
    }
}
