use anyhow::Context;
use clap::{Parser, Subcommand};
use inquire::{Password, PasswordDisplayMode};
use std::sync::Arc;
use tracing::{info, warn};
use weather_voice_core::{Config, SessionBootstrap, VoiceSession, provider_from_config};

use crate::console::ConsoleSession;

/// Top-level CLI struct. Without a subcommand the agent runs.
#[derive(Debug, Parser)]
#[command(
    name = "weather-agent",
    version,
    about = "Voice assistant for weather and rain questions"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the WeatherAPI.com key in the config file.
    Configure,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            None => run_agent().await,
            Some(Command::Configure) => configure(),
        }
    }
}

async fn run_agent() -> anyhow::Result<()> {
    let config = Config::load_with_env()?;
    if !config.is_weatherapi_configured() {
        warn!("WEATHERAPI_KEY is not set; weather lookups will answer with an apology");
    }

    let weather = provider_from_config(&config.weatherapi)?;
    let bootstrap = SessionBootstrap::new(&config, weather);

    let cancel = bootstrap.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, shutting down");
            cancel.cancel();
        }
    });

    let session: Arc<dyn VoiceSession> = Arc::new(ConsoleSession::stdio());
    let mechanism = bootstrap.run(session).await.context("Voice session failed")?;
    info!(?mechanism, "agent finished");

    Ok(())
}

fn configure() -> anyhow::Result<()> {
    let mut config = Config::load()?;

    let key = Password::new("WeatherAPI.com key:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;

    let key = key.trim().to_string();
    if key.is_empty() {
        anyhow::bail!("API key must not be empty");
    }

    config.set_api_key(key);
    config.save()?;

    println!("Saved WeatherAPI key to {}", Config::config_file_path()?.display());
    Ok(())
}
