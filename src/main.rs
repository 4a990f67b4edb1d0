//! Stratus CLI entry point.
//!
//! Provides `start` and `check-config` subcommands for running the bot
//! daemon or printing the effective configuration.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use stratus::chat::telegram::TelegramAdapter;
use stratus::chat::users::UserRegistry;
use stratus::chat::{ChatEngine, ChatEvent, ChatReply};
use stratus::config::BotConfig;
use stratus::providers::ProviderHandle;

/// Stratus — a weather chat bot.
#[derive(Parser)]
#[command(name = "stratus", version, about)]
struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

/// Available CLI subcommands.
#[derive(Subcommand)]
enum Command {
    /// Run the bot daemon.
    Start,
    /// Load the configuration, print the effective values, and exit.
    CheckConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Command::Start => handle_start().await,
        Command::CheckConfig => handle_check_config(),
    }
}

/// Run the bot daemon.
///
/// Wires the Telegram adapter to the chat engine over bounded channels,
/// then waits for either side to stop or for a shutdown signal.
async fn handle_start() -> anyhow::Result<()> {
    let config = BotConfig::load().context("failed to load configuration")?;

    // Set up production logging (JSON file + stderr).
    let _logging_guard = stratus::logging::init_production(
        Path::new(&config.paths.logs_dir),
        &config.core.log_level,
    )?;

    info!(version = env!("CARGO_PKG_VERSION"), "stratus starting");

    let provider = Arc::new(
        ProviderHandle::from_config(&config.weather)
            .context("failed to build weather provider")?,
    );
    info!(provider = %config.weather.provider, "weather provider ready");

    let users_path = PathBuf::from(&config.paths.users_file);
    let registry = UserRegistry::load(&users_path)
        .with_context(|| format!("failed to load {}", users_path.display()))?;
    info!(
        users = registry.len(),
        path = %users_path.display(),
        "user registry loaded"
    );

    if !config.telegram.enabled {
        info!("telegram adapter disabled in config -- nothing to run");
        return Ok(());
    }
    let Some(token) = config.telegram.bot_token.clone() else {
        info!("no Telegram bot token configured -- nothing to run");
        info!("set STRATUS_TELEGRAM_BOT_TOKEN or [telegram].bot_token to enable");
        return Ok(());
    };

    let engine = Arc::new(ChatEngine::new(
        &config,
        Arc::clone(&provider),
        registry,
        users_path,
    ));

    // Channels for adapter <-> engine communication.
    let (event_tx, event_rx) = mpsc::channel::<ChatEvent>(config.core.channel_buffer_size);
    let (reply_tx, reply_rx) = mpsc::channel::<ChatReply>(config.core.channel_buffer_size);

    let adapter = TelegramAdapter::new(&token, config.telegram.poll_timeout_seconds)
        .context("failed to build telegram adapter")?;
    let adapter_handle = tokio::spawn(adapter.run(event_tx, reply_rx));

    let runner = Arc::clone(&engine);
    let mut engine_handle = tokio::spawn(async move {
        runner.run(event_rx, reply_tx).await;
    });

    info!("stratus ready -- listening for messages");

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("received shutdown signal, initiating graceful shutdown");

            // Stopping the adapter drops the event sender, so the engine
            // drains whatever is queued and exits on its own.
            adapter_handle.abort();

            let grace = Duration::from_secs(config.core.shutdown_timeout_seconds);
            if tokio::time::timeout(grace, &mut engine_handle).await.is_err() {
                warn!(
                    timeout_secs = config.core.shutdown_timeout_seconds,
                    "shutdown timeout exceeded, abandoning in-flight work"
                );
                engine_handle.abort();
            }
        }
        result = &mut engine_handle => {
            if let Err(e) = result {
                error!(error = %e, "chat engine task failed");
            }
            adapter_handle.abort();
        }
    }

    info!("stratus shut down cleanly");
    Ok(())
}

/// Load the configuration, print the effective values, and exit.
///
/// Secrets are redacted by the config Debug impls, so the output is safe
/// to paste into an issue report.
fn handle_check_config() -> anyhow::Result<()> {
    stratus::logging::init_cli();

    let config = BotConfig::load().context("failed to load configuration")?;
    println!("{config:#?}");
    Ok(())
}
