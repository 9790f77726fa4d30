//! The vigil daemon binary.
//!
//! Loads configuration, wires the concrete backends together, and runs the
//! research loop until Ctrl-C. `--once` runs a single cycle and exits,
//! which is useful for cron-style operation and for smoke-testing a new
//! configuration.
//!
//! Usage: `vigil-daemon [--once] [CONFIG_PATH]`

use std::path::PathBuf;
use std::sync::Arc;

use vigil::config::BrainConfig;
use vigil::notify::{Dispatcher, WebhookSink};
use vigil::reasoning::{AnthropicBackend, ReasoningBackend, ReasoningClient};
use vigil::research::{EmbeddedWebSearch, RedditForumSearch, ResearchAggregator};
use vigil::state::StateStore;
use vigil::BrainLoop;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let mut once = false;
    let mut config_path: Option<PathBuf> = None;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--once" => once = true,
            "--help" | "-h" => {
                eprintln!("usage: vigil-daemon [--once] [CONFIG_PATH]");
                return Ok(());
            }
            other => config_path = Some(PathBuf::from(other)),
        }
    }

    let config_path = config_path.unwrap_or_else(BrainConfig::default_path);
    let config = BrainConfig::load(&config_path)?;
    tracing::info!(path = %config_path.display(), "configuration loaded");

    let backend = AnthropicBackend::from_config(&config.reasoning);
    if !backend.has_credential() {
        tracing::warn!(
            "no reasoning credential configured; every cycle will skip until one is provided"
        );
    }
    let client = ReasoningClient::new(Arc::new(backend));

    let aggregator = ResearchAggregator::new(
        Arc::new(EmbeddedWebSearch),
        Arc::new(RedditForumSearch::public()?),
        config.research.subreddits.clone(),
        config.research.max_results,
    );

    let dispatcher = match config.notify.webhook_url.clone() {
        Some(url) => Dispatcher::new(Arc::new(WebhookSink::new(url)?)),
        None => {
            tracing::info!("no webhook configured, findings will only be logged");
            Dispatcher::disabled()
        }
    };

    let store = StateStore::new(&config.brain.resolve_memory_dir());
    let mut brain = BrainLoop::new(&config, store, client, aggregator, dispatcher)?;

    if once {
        let outcome = brain.run_once().await?;
        tracing::info!(?outcome, "single cycle complete");
        return Ok(());
    }

    let cancel = brain.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown requested");
            cancel.cancel();
        }
    });

    brain.run().await;
    Ok(())
}
