mod api;
mod auth;
mod config;
mod keymap;
mod logging;
mod message;
mod sync;
mod tui;
mod wire;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use crate::api::HttpBackend;
use crate::message::ConversationKey;

/// Terminal chat client for a polling-only bot dashboard.
#[derive(Debug, Parser)]
#[command(name = "pollchat", version, about)]
struct Cli {
    /// Config file (default: $POLLCHAT_CONFIG or ~/.config/pollchat/config.toml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Backend base URL, overriding server_url from the config
    #[arg(short, long, value_name = "URL")]
    server: Option<String>,

    /// Write logs to FILE (default: $POLLCHAT_LOG)
    #[arg(long, value_name = "FILE")]
    log: Option<PathBuf>,

    /// Conversation to open at start-up, e.g. group:123 or private:456
    conversation: Option<ConversationKey>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = logging::log_path(cli.log.as_deref()) {
        logging::init(&path)?;
    }

    let mut config = config::Config::load(cli.config.as_deref())?;
    if let Some(server) = cli.server {
        config.server_url = server;
    }
    tracing::info!(server = %config.server_url, "starting");

    let token = auth::resolve_token(&config).await?;
    let backend = HttpBackend::new(&config.server_url, token, config.request_timeout())
        .context("failed to build HTTP client")?;

    let (engine, events) = sync::SyncEngine::new(Arc::new(backend), config.polling.clone());
    let app = tui::App::new(engine, config.server_url.clone());
    tui::run(app, events, cli.conversation).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_conversation_and_flags() {
        let cli = Cli::try_parse_from([
            "pollchat",
            "--server",
            "http://bot:8000",
            "--log",
            "/tmp/pollchat.log",
            "group:123",
        ])
        .unwrap();
        assert_eq!(cli.server.as_deref(), Some("http://bot:8000"));
        assert_eq!(cli.log, Some(PathBuf::from("/tmp/pollchat.log")));
        assert_eq!(cli.conversation, Some(ConversationKey::group("123")));
    }

    #[test]
    fn cli_rejects_bad_conversation() {
        assert!(Cli::try_parse_from(["pollchat", "channel:1"]).is_err());
    }
}
