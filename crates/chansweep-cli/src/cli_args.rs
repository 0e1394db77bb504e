use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

fn parse_positive_u32(value: &str) -> Result<u32, String> {
    let parsed = value
        .parse::<u32>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

fn parse_positive_usize(value: &str) -> Result<usize, String> {
    let parsed = value
        .parse::<usize>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

#[derive(Debug, Parser)]
#[command(
    name = "chansweep",
    about = "Find and leave stale channels in a team messaging workspace",
    version
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        env = "CHANSWEEP_STATE_DIR",
        default_value = ".chansweep",
        help = "Directory holding chansweep config and skip-list state"
    )]
    pub state_dir: PathBuf,

    #[arg(
        long,
        global = true,
        env = "WORKSPACE_API_TOKEN",
        help = "Workspace API bearer token"
    )]
    pub token: Option<String>,

    #[arg(
        long,
        global = true,
        env = "WORKSPACE_API_BASE",
        default_value = "https://slack.com/api",
        help = "Base URL of the workspace web API"
    )]
    pub api_base: String,

    // Not global: `config set` owns a value-taking `--verbose` of its own.
    #[arg(long, help = "Print per-channel progress and rate-limit waits")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Report stale channels without changing anything
    Discover(DiscoverArgs),
    /// Leave stale channels after a discovery run
    Leave(LeaveArgs),
    /// Manage the skip list of protected channel names
    Skiplist {
        #[command(subcommand)]
        command: SkiplistCommands,
    },
    /// Show or change stored defaults
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Debug, Args)]
pub struct DiscoverArgs {
    #[arg(
        long,
        value_parser = parse_positive_u32,
        help = "Staleness lookback window in days (overrides stored config)"
    )]
    pub days: Option<u32>,

    #[arg(
        long,
        value_parser = parse_positive_usize,
        help = "Channels requested per listing page (overrides stored config)"
    )]
    pub limit: Option<usize>,

    #[arg(
        long,
        value_delimiter = ',',
        help = "Channel types to scan, comma separated: public, private"
    )]
    pub types: Option<Vec<String>>,

    #[arg(
        long,
        help = "Only consider channels whose name contains this substring"
    )]
    pub keyword: Option<String>,

    #[arg(long, help = "Emit the report as JSON instead of a table")]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct LeaveArgs {
    #[arg(
        value_name = "CHANNEL",
        help = "Stale channels to leave, by name; requires a discovery match"
    )]
    pub channels: Vec<String>,

    #[arg(long, help = "Leave every discovered stale channel")]
    pub all: bool,

    #[arg(long, short = 'y', help = "Skip the confirmation prompt")]
    pub yes: bool,
}

#[derive(Debug, Subcommand)]
pub enum SkiplistCommands {
    /// Print protected channel names
    List,
    /// Protect a channel from discovery and leaving
    Add {
        #[arg(value_name = "CHANNEL")]
        name: String,
    },
    /// Remove a channel from the protected set
    Remove {
        #[arg(value_name = "CHANNEL")]
        name: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Print the stored defaults
    Show,
    /// Validate and persist new defaults
    Set(ConfigSetArgs),
}

#[derive(Debug, Args)]
pub struct ConfigSetArgs {
    #[arg(long, value_parser = parse_positive_u32, help = "Staleness lookback window in days")]
    pub days: Option<u32>,

    #[arg(long, value_parser = parse_positive_usize, help = "Channels requested per listing page")]
    pub limit: Option<usize>,

    #[arg(
        long,
        value_delimiter = ',',
        help = "Channel types to scan, comma separated: public, private"
    )]
    pub types: Option<Vec<String>>,

    #[arg(long, help = "Default name keyword filter; empty clears it")]
    pub keyword: Option<String>,

    #[arg(long, help = "Default verbosity: true or false")]
    pub verbose: Option<bool>,
}

impl ConfigSetArgs {
    pub fn is_empty(&self) -> bool {
        self.days.is_none()
            && self.limit.is_none()
            && self.types.is_none()
            && self.keyword.is_none()
            && self.verbose.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_discover_args_parse_comma_separated_types() {
        let cli = Cli::try_parse_from([
            "chansweep",
            "discover",
            "--days",
            "60",
            "--types",
            "public,private",
        ])
        .expect("parse");
        match cli.command {
            Commands::Discover(args) => {
                assert_eq!(args.days, Some(60));
                assert_eq!(args.types, Some(vec!["public".to_string(), "private".to_string()]));
                assert!(!args.json);
            }
            other => panic!("expected discover, got {other:?}"),
        }
    }

    #[test]
    fn unit_discover_rejects_zero_days() {
        let parsed = Cli::try_parse_from(["chansweep", "discover", "--days", "0"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn unit_leave_accepts_names_and_yes_flag() {
        let cli = Cli::try_parse_from(["chansweep", "leave", "old-proj", "dead-chat", "-y"])
            .expect("parse");
        match cli.command {
            Commands::Leave(args) => {
                assert_eq!(args.channels, vec!["old-proj", "dead-chat"]);
                assert!(args.yes);
                assert!(!args.all);
            }
            other => panic!("expected leave, got {other:?}"),
        }
    }

    #[test]
    fn unit_global_flags_are_accepted_after_the_subcommand() {
        let cli = Cli::try_parse_from([
            "chansweep",
            "skiplist",
            "list",
            "--state-dir",
            "/tmp/sweep-state",
        ])
        .expect("parse");
        assert_eq!(cli.state_dir, PathBuf::from("/tmp/sweep-state"));
        assert!(matches!(cli.command, Commands::Skiplist { command: SkiplistCommands::List }));
    }

    #[test]
    fn unit_config_set_collects_optional_flags() {
        let cli = Cli::try_parse_from([
            "chansweep",
            "config",
            "set",
            "--days",
            "45",
            "--verbose",
            "true",
        ])
        .expect("parse");
        match cli.command {
            Commands::Config {
                command: ConfigCommands::Set(args),
            } => {
                assert_eq!(args.days, Some(45));
                assert_eq!(args.verbose, Some(true));
                assert!(args.limit.is_none());
                assert!(!args.is_empty());
            }
            other => panic!("expected config set, got {other:?}"),
        }
    }
}
