use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use sysdash::app::{self, App};
use sysdash::cli::{Cli, Commands};
use sysdash::core::{DashboardConfig, ProcessControl, ProcessController};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_file.as_deref(), &cli.log_level)?;

    let config = cli.dashboard_config();

    match cli.command {
        None => {
            // No command - run interactive dashboard
            App::new(config).run().await?;
        }
        Some(Commands::Snapshot { pretty }) => {
            handle_snapshot(&config, pretty).await?;
        }
        Some(Commands::Kill { pid, .. }) => {
            if !handle_kill(&config, pid).await {
                std::process::exit(1);
            }
        }
        Some(Commands::Config) => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

/// Logs go to a file or nowhere; stdout belongs to the dashboard
fn init_logging(log_file: Option<&Path>, level: &str) -> Result<()> {
    let Some(path) = log_file else {
        return Ok(());
    };

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level).with_context(|| format!("Invalid log level '{}'", level))?,
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init();
    info!(version = sysdash::cli::VERSION_WITH_BUILD, "logging started");
    Ok(())
}

async fn handle_snapshot(config: &DashboardConfig, pretty: bool) -> Result<()> {
    let snapshot = app::collect_snapshot(config).await?;
    let json = if pretty {
        serde_json::to_string_pretty(&snapshot)?
    } else {
        serde_json::to_string(&snapshot)?
    };
    println!("{}", json);
    Ok(())
}

async fn handle_kill(config: &DashboardConfig, pid: u32) -> bool {
    let controller = ProcessController::from_config(config);
    println!(
        "Terminating process {} (grace period {})",
        pid,
        humantime::format_duration(config.kill_timeout)
    );

    let outcome = controller.terminate(pid).await;
    let message = outcome.describe(pid);
    if outcome.is_success() {
        println!("{} {}", "✓".green(), message);
    } else {
        eprintln!("{} {}", "✗".red(), message);
    }
    outcome.is_success()
}
