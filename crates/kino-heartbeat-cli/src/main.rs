//! Kino Heartbeat CLI - scripted analytics session replay
//!
//! Features:
//! - Replay a JSON event script through the analytics adapter
//! - Simulate slow or failing tracker construction
//! - Report the tracker calls a session produces
//! - List player event types and adapter subscriptions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod output;
mod simulation;

/// Kino Heartbeat CLI - Video analytics adapter toolkit
#[derive(Parser)]
#[command(name = "kino-heartbeat")]
#[command(author = "Purple Squirrel Media")]
#[command(version)]
#[command(about = "Replay player sessions through the video analytics adapter", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay an event script and print the resulting tracker calls
    Replay {
        /// Path to the event script (JSON array of events)
        script: PathBuf,

        /// Adapter settings file (JSON)
        #[arg(short, long)]
        settings: Option<PathBuf>,

        /// Tracker construction delay in milliseconds
        #[arg(short = 'd', long, default_value = "0")]
        init_delay: u64,

        /// Make tracker construction fail
        #[arg(long)]
        fail_init: bool,

        /// Skip adapter teardown at the end of the script
        #[arg(long)]
        keep_alive: bool,
    },

    /// List player event types
    Kinds,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(level)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Replay { script, settings, init_delay, fail_init, keep_alive } => {
            let options = commands::ReplayOptions {
                settings,
                init_delay_ms: init_delay,
                fail_init,
                keep_alive,
            };
            commands::replay(&script, options, &cli.format).await?;
        }
        Commands::Kinds => {
            commands::kinds(&cli.format);
        }
    }

    Ok(())
}
