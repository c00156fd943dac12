//! ccquota - Claude Code quota gauge

mod output;

use anyhow::{Context, Result};
use ccquota_core::{
    default_claude_home, default_config_path, ConfigOverrides, ConfigSource, EngineEvent,
    SchedulerConfig, SourcePaths, TomlConfigFile, UsageEngine,
};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(
    name = "ccquota",
    version,
    about = "Claude Code quota gauge",
    long_about = "Estimates Claude Code message usage against plan limits.\n\
                  \n\
                  Reconciles the session logs, the prompt history and the stats cache\n\
                  under ~/.claude into a rolling 5-hour count and a weekly count.\n\
                  \n\
                  Examples:\n\
                    ccquota                          # Print the gauge (default)\n\
                    ccquota status --json            # Snapshot as JSON\n\
                    ccquota watch                    # Live updates until Ctrl-C\n\
                    ccquota --plan max5x status      # Override the configured plan\n\
                  \n\
                  Environment Variables:\n\
                    CCQUOTA_CLAUDE_HOME              # Override Claude home directory\n\
                    CCQUOTA_CONFIG                   # Override config file path\n\
                    RUST_LOG                         # Log filter (default: warn)"
)]
struct Cli {
    #[command(subcommand)]
    mode: Option<Mode>,

    /// Path to Claude home directory (default: ~/.claude)
    #[arg(long, env = "CCQUOTA_CLAUDE_HOME")]
    claude_home: Option<PathBuf>,

    /// Path to config file (default: ~/.config/ccquota/config.toml)
    #[arg(long, env = "CCQUOTA_CONFIG")]
    config: Option<PathBuf>,

    /// Subscription plan (pro, max5x, max20x, api)
    #[arg(long)]
    plan: Option<String>,

    /// Messages allowed per rolling 5-hour window
    #[arg(long)]
    five_hour_limit: Option<u64>,

    /// Messages allowed per week
    #[arg(long)]
    weekly_limit: Option<u64>,
}

#[derive(Subcommand)]
enum Mode {
    /// Run one pass and print the gauge (default)
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Keep the engine running and print each new snapshot
    Watch {
        /// Safety-net refresh interval in seconds
        #[arg(long, default_value = "60")]
        interval: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging();
    let cli = Cli::parse();

    let claude_home = match cli.claude_home {
        Some(path) => path,
        None => default_claude_home().context("Could not determine Claude home directory")?,
    };
    let config_path = cli
        .config
        .or_else(default_config_path)
        .context("Could not determine config directory")?;
    debug!(
        claude_home = %claude_home.display(),
        config = %config_path.display(),
        "Resolved paths"
    );

    let config: Arc<dyn ConfigSource> =
        Arc::new(TomlConfigFile::new(config_path).with_overrides(ConfigOverrides {
            plan: cli.plan,
            five_hour_limit: cli.five_hour_limit,
            weekly_limit: cli.weekly_limit,
        }));
    let paths = SourcePaths::from_claude_home(&claude_home);

    match cli.mode.unwrap_or(Mode::Status { json: false }) {
        Mode::Status { json } => run_status(paths, config, json),
        Mode::Watch { interval } => run_watch(paths, config, interval).await,
    }
}

fn setup_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn run_status(paths: SourcePaths, config: Arc<dyn ConfigSource>, json: bool) -> Result<()> {
    let engine = UsageEngine::with_defaults(paths, config);
    let outcome = engine.reconcile_once();

    if json {
        println!("{}", output::format_json(&outcome.snapshot));
    } else {
        println!("ccquota - Claude Code Usage");
        println!("===========================");
        println!();
        println!("{}", output::format_gauge(&outcome.snapshot, Utc::now()));
    }

    let degraded = output::format_degraded(&outcome.report);
    if !degraded.is_empty() {
        eprintln!();
        for line in degraded {
            eprintln!("{}", line);
        }
    }

    Ok(())
}

async fn run_watch(paths: SourcePaths, config: Arc<dyn ConfigSource>, interval: u64) -> Result<()> {
    let scheduler_config = SchedulerConfig {
        interval: Duration::from_secs(interval.max(1)),
        ..Default::default()
    };
    let engine = UsageEngine::new(paths, config, scheduler_config);
    let mut events = engine.subscribe();
    engine.start().await;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(EngineEvent::SnapshotPublished(snapshot)) => {
                    println!("{}", output::format_watch_line(&snapshot));
                }
                Ok(EngineEvent::PassDegraded(sources)) => {
                    debug!(?sources, "Pass degraded");
                }
                Ok(EngineEvent::WatcherError(message)) => {
                    warn!(%message, "Watcher error");
                }
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "Event receiver lagged");
                }
                Err(RecvError::Closed) => break,
            },
            signal = tokio::signal::ctrl_c() => {
                signal.context("Failed to listen for Ctrl-C")?;
                break;
            }
        }
    }

    engine.stop().await;
    Ok(())
}
