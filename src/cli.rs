/// CLI argument parsing

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};

use crate::core::DashboardConfig;

// Build timestamp injected at compile time
pub const BUILD_TIMESTAMP: &str = env!("BUILD_TIMESTAMP");
pub const VERSION_WITH_BUILD: &str = concat!(env!("CARGO_PKG_VERSION"), " (built: ", env!("BUILD_TIMESTAMP"), ")");

#[derive(Parser, Debug)]
#[command(name = "sysdash")]
#[command(author, version = VERSION_WITH_BUILD, about, long_about = None)]
pub struct Cli {
    /// Write logs to this file (the dashboard owns the terminal, so nothing is logged otherwise)
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Log filter, e.g. "info" or "sysdash=debug"; RUST_LOG wins when set
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    /// Number of processes to keep in the process list
    #[arg(long, global = true, value_parser = clap::value_parser!(u16).range(1..))]
    pub process_limit: Option<u16>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sample every metric once and print it as JSON
    Snapshot {
        /// Indent the JSON output
        #[arg(short, long)]
        pretty: bool,
    },

    /// Terminate a process: SIGTERM, then SIGKILL once the timeout passes
    Kill {
        /// Process ID
        pid: u32,

        /// Grace period before escalating, e.g. "3s" or "500ms"
        #[arg(short, long, value_parser = humantime::parse_duration)]
        timeout: Option<Duration>,
    },

    /// Print the effective configuration as JSON
    Config,
}

impl Cli {
    /// Compiled-in defaults with the CLI overrides applied
    pub fn dashboard_config(&self) -> DashboardConfig {
        let mut config = DashboardConfig::default();
        if let Some(limit) = self.process_limit {
            config = config.with_process_limit(usize::from(limit));
        }
        if let Some(Commands::Kill { timeout: Some(timeout), .. }) = &self.command {
            config.kill_timeout = *timeout;
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_no_subcommand_runs_dashboard() {
        let cli = Cli::try_parse_from(["sysdash"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.dashboard_config().process_limit, 50);
    }

    #[test]
    fn test_kill_timeout_is_humantime() {
        let cli = Cli::try_parse_from(["sysdash", "kill", "1234", "--timeout", "500ms"]).unwrap();
        match &cli.command {
            Some(Commands::Kill { pid, timeout }) => {
                assert_eq!(*pid, 1234);
                assert_eq!(*timeout, Some(Duration::from_millis(500)));
            }
            other => panic!("expected kill, got {other:?}"),
        }
        assert_eq!(cli.dashboard_config().kill_timeout, Duration::from_millis(500));
    }

    #[test]
    fn test_process_limit_override() {
        let cli = Cli::try_parse_from(["sysdash", "--process-limit", "10", "snapshot", "--pretty"]).unwrap();
        assert_eq!(cli.dashboard_config().process_limit, 10);
        assert!(matches!(cli.command, Some(Commands::Snapshot { pretty: true })));

        assert!(Cli::try_parse_from(["sysdash", "--process-limit", "0"]).is_err());
    }
}
