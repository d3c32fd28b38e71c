//! Breeze Bridge — HTTP tool server and chat client.
//!
//! Usage:
//!   breeze-bridge serve      Start the HTTP tool server
//!   breeze-bridge chat       Chat with a local model that can call the tools

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::sync::Arc;
use tracing::warn;

use breeze_bridge::agent::{self, QueryClient};
use breeze_bridge::breeze::BreezeClient;
use breeze_bridge::config::{self, BridgeConfig};
use breeze_bridge::remote::{InferenceClient, ToolServerClient};
use breeze_bridge::server;
use breeze_bridge::tools::ToolContext;

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "breeze-bridge")]
#[command(version = "0.1.0")]
#[command(about = "ICICI Direct Breeze API as HTTP tools, with a local-LLM chat client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the TOML config file.
    #[arg(long)]
    config: Option<String>,

    /// Log level (debug, info, warn, error). Overrides the config file.
    #[arg(long)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP tool server.
    Serve {
        /// Port to listen on (overrides PORT).
        #[arg(long)]
        port: Option<u16>,
    },

    /// Run the interactive chat client.
    Chat {
        /// Tool server URL.
        #[arg(long)]
        server_url: Option<String>,

        /// Ollama model name.
        #[arg(long)]
        model: Option<String>,
    },
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .as_deref()
        .map(config::resolve_path)
        .unwrap_or_else(config::default_config_path);
    let mut cfg = config::load_with_env(&config_path)?;
    if let Some(level) = &cli.log_level {
        cfg.log_level = level.clone();
    }

    // Initialize logging
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cfg.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Serve { port } => {
            if let Some(port) = port {
                cfg.port = port;
            }
            cmd_serve(cfg).await
        }
        Commands::Chat { server_url, model } => {
            if let Some(url) = server_url {
                cfg.server_url = url;
            }
            if let Some(model) = model {
                cfg.model = model;
            }
            cmd_chat(cfg).await
        }
    }
}

// ---------------------------------------------------------------------------
// Command implementations
// ---------------------------------------------------------------------------

async fn cmd_serve(cfg: BridgeConfig) -> Result<()> {
    if cfg.api_key.is_empty() {
        warn!("ICICI_API_KEY is not set; session initialization will fail");
    }

    let broker = Arc::new(BreezeClient::new(
        &cfg.breeze_api_url,
        &cfg.breeze_feed_url,
        &cfg.api_key,
        cfg.http_timeout(),
    )?);
    let ctx = ToolContext::new(broker);

    println!(
        "{} Serving Breeze tools on {}",
        ">>>".green().bold(),
        cfg.listen_addr(),
    );

    server::serve(ctx, &cfg.listen_addr()).await
}

async fn cmd_chat(cfg: BridgeConfig) -> Result<()> {
    let tools_client = ToolServerClient::new(&cfg.server_url, cfg.http_timeout())?;
    let inference = InferenceClient::new(&cfg.ollama_url, &cfg.model, cfg.inference_timeout())?;

    let client = QueryClient::connect(tools_client, inference).await?;

    println!(
        "{} Connected to tool server at {} with {} available tools (model: {})",
        ">>>".green().bold(),
        cfg.server_url,
        client.tools().len(),
        cfg.model,
    );

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    agent::run_interactive(&client, stdin).await
}
