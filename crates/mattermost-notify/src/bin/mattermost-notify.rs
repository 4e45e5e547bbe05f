//! mattermost-notify - CLI for exercising the Mattermost notifier.
//!
//! Replays recorded tracker events, shows where a project's notifications
//! would go, and posts test messages.
//!
//! # Environment Variables
//!
//! Without `--config`, settings come from `MATTERMOST_URL`,
//! `MATTERMOST_CHANNEL`, `MATTERMOST_USERNAME`, `MATTERMOST_ICON`,
//! `MATTERMOST_POST_UPDATES`, `MATTERMOST_POST_WIKI_UPDATES`,
//! `MATTERMOST_DISPLAY_WATCHERS`, `REDMINE_HOST_NAME` and `REDMINE_PROTOCOL`.
//!
//! # Examples
//!
//! ```bash
//! # Replay a recorded event and wait for delivery
//! mattermost-notify replay event.json
//!
//! # Show channels and URL for a project snapshot
//! mattermost-notify --config mattermost.toml resolve project.json
//!
//! # Post a test message to the default channel
//! mattermost-notify ping
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mattermost_notify::delivery::ChannelResult;
use mattermost_notify::model::Project;
use mattermost_notify::resolver::split_channels;
use mattermost_notify::{
    HostEvent, InMemoryDirectory, Listener, NotificationPayload, NotificationTarget, Settings,
};
use serde::Deserialize;

/// CLI for exercising the Mattermost notifier.
#[derive(Parser)]
#[command(name = "mattermost-notify")]
#[command(about = "Relay issue tracker events to Mattermost")]
#[command(version)]
struct Cli {
    /// TOML settings file (defaults to environment variables)
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a recorded event and wait for delivery
    Replay {
        /// JSON file with `event` and optional `directory` snapshot
        file: PathBuf,
    },

    /// Print the resolved channels and webhook URL for a project
    Resolve {
        /// JSON project snapshot (with parents and custom values)
        file: PathBuf,
    },

    /// Post a test message using the global settings
    Ping {
        /// Channel to post to (defaults to the configured channel)
        #[arg(long)]
        channel: Option<String>,

        /// Message text
        #[arg(long, default_value = "Test notification from mattermost-notify")]
        text: String,
    },
}

/// Recorded event plus the records its change details refer to.
#[derive(Deserialize)]
struct Recording {
    event: HostEvent,
    #[serde(default)]
    directory: InMemoryDirectory,
}

fn load_settings(path: Option<&Path>) -> Result<Settings> {
    match path {
        Some(path) => {
            let source = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            Settings::from_toml_str(&source)
                .with_context(|| format!("Invalid settings in {}", path.display()))
        }
        None => Settings::from_env().context("Invalid settings in environment"),
    }
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&source).with_context(|| format!("Invalid JSON in {}", path.display()))
}

fn report(results: &[ChannelResult]) -> bool {
    let mut ok = true;
    for (channel, result) in results {
        match result {
            Ok(()) => println!("{channel}: sent"),
            Err(e) => {
                ok = false;
                println!("{channel}: failed ({e})");
            }
        }
    }
    ok
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();
    let settings = load_settings(cli.config.as_deref())?;

    match cli.command {
        Commands::Replay { file } => {
            let recording: Recording = read_json(&file)?;
            let listener = Listener::with_http(settings, Arc::new(recording.directory))
                .context("Failed to create HTTP transport")?;

            tracing::info!(
                event = recording.event.kind(),
                project = %recording.event.project().identifier,
                "Replaying event"
            );
            let results = listener.handle_and_wait(&recording.event).await;
            if results.is_empty() {
                println!("Event produced no notification");
            } else if !report(&results) {
                anyhow::bail!("Delivery failed for at least one channel");
            }
        }

        Commands::Resolve { file } => {
            let project: Project = read_json(&file)?;
            let target = NotificationTarget::for_project(&project, &settings);
            println!("{}", serde_json::to_string_pretty(&target)?);
        }

        Commands::Ping { channel, text } => {
            let url = settings
                .mattermost_url
                .clone()
                .context("No Mattermost URL configured")?;
            let channels = match channel {
                Some(c) => vec![c],
                None => split_channels(settings.channel.as_deref().unwrap_or_default()),
            };
            if channels.is_empty() {
                anyhow::bail!("No channel configured");
            }

            let listener = Listener::with_http(settings, Arc::new(InMemoryDirectory::new()))
                .context("Failed to create HTTP transport")?;
            let payload = NotificationPayload {
                text,
                attachment: None,
            };
            if !report(&listener.post_and_wait(&payload, &channels, &url).await) {
                anyhow::bail!("Delivery failed for at least one channel");
            }
        }
    }

    Ok(())
}
