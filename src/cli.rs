// Command-line interface. Parsed before any component starts.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{MAX_REFRESH_SECS, MIN_REFRESH_SECS};
use crate::dashboard::View;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file (default: $OVERSEER_CONFIG, then ./overseer.toml).
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Interactive terminal dashboard (default).
    Dashboard(DashboardArgs),
    /// Sampling loop, maintenance and the REST API, without a terminal UI.
    Serve,
    /// Print recent alerts.
    Alerts {
        #[arg(long, short, default_value_t = 20)]
        limit: u32,
    },
    /// Acknowledge an alert by id.
    Ack {
        id: i64,
        #[arg(long)]
        by: String,
    },
    /// Print the configured alert rules.
    Rules,
}

#[derive(Debug, Clone, Default, Args)]
pub struct DashboardArgs {
    /// Seconds between dashboard refreshes (1-10).
    #[arg(long, short, value_parser = clap::value_parser!(u64).range(MIN_REFRESH_SECS..=MAX_REFRESH_SECS))]
    pub refresh: Option<u64>,

    /// View shown on start.
    #[arg(long, short, value_enum)]
    pub view: Option<View>,
}

impl Cli {
    /// The subcommand to run; no subcommand means the dashboard.
    pub fn command(&self) -> Commands {
        match &self.command {
            Some(c) => c.clone(),
            None => Commands::Dashboard(DashboardArgs::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_means_dashboard() {
        let cli = Cli::try_parse_from(["overseer"]).unwrap();
        assert!(matches!(cli.command(), Commands::Dashboard(ref a) if a.refresh.is_none()));
    }

    #[test]
    fn refresh_out_of_range_is_rejected() {
        assert!(Cli::try_parse_from(["overseer", "dashboard", "--refresh", "0"]).is_err());
        assert!(Cli::try_parse_from(["overseer", "dashboard", "--refresh", "11"]).is_err());
        let cli = Cli::try_parse_from(["overseer", "dashboard", "--refresh", "10"]).unwrap();
        assert!(matches!(cli.command(), Commands::Dashboard(ref a) if a.refresh == Some(10)));
    }

    #[test]
    fn view_and_global_config() {
        let cli = Cli::try_parse_from([
            "overseer",
            "dashboard",
            "--view",
            "alerts",
            "--config",
            "x.toml",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("x.toml")));
        assert!(matches!(cli.command(), Commands::Dashboard(ref a) if a.view == Some(View::Alerts)));
    }

    #[test]
    fn ack_requires_by() {
        assert!(Cli::try_parse_from(["overseer", "ack", "3"]).is_err());
        let cli = Cli::try_parse_from(["overseer", "ack", "3", "--by", "ops"]).unwrap();
        assert!(matches!(cli.command(), Commands::Ack { id: 3, ref by } if by == "ops"));
    }
}
