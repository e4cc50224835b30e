//! CLI definitions and entry point.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::config::CliOverrides;

pub mod commands;

/// Upper bound for `stats --days`.
pub const MAX_STATS_DAYS: u32 = 3650;

/// Bug tracker fed by an IMAP inbox (`SQLite`)
#[derive(Parser, Debug)]
#[command(name = "bugmail", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Database path (default: .bugmail/bugmail.db)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Actor name recorded on audit events
    #[arg(long, global = true)]
    pub actor: Option<String>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// `SQLite` busy timeout in ms
    #[arg(long, global = true)]
    pub lock_timeout: Option<u64>,

    /// Extra YAML config file, layered above .bugmail/config.yaml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Also write JSON logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

impl Cli {
    /// Config overrides carried by global flags.
    #[must_use]
    pub fn overrides(&self) -> CliOverrides {
        CliOverrides {
            db: self.db.clone(),
            lock_timeout: self.lock_timeout,
            config_file: self.config.clone(),
            poll_interval_secs: None,
            actor: self.actor.clone(),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a bugmail workspace
    Init {
        /// Overwrite existing DB
        #[arg(long)]
        force: bool,
    },

    /// Run one poll cycle against the configured mailbox
    Poll,

    /// Poll the mailbox on a fixed interval
    Watch(WatchArgs),

    /// Ingest raw .eml files without a mail server
    Ingest(IngestArgs),

    /// Show how a subject and body would be classified
    Classify(ClassifyArgs),

    /// List bugs
    List(ListArgs),

    /// Show bug details
    Show(ShowArgs),

    /// Set the status of one or more bugs
    Mark(MarkArgs),

    /// Delete bugs
    Delete(DeleteArgs),

    /// Show the audit trail of a bug
    History(HistoryArgs),

    /// Show totals and modifications per day
    Stats(StatsArgs),

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Show version information
    Version,

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Arguments for the watch command.
#[derive(Args, Debug, Default, Clone)]
pub struct WatchArgs {
    /// Seconds between cycles (default: poll.interval-secs)
    #[arg(long)]
    pub interval: Option<u64>,

    /// Stop after this many cycles
    #[arg(long)]
    pub max_cycles: Option<u64>,
}

/// Arguments for the ingest command.
#[derive(Args, Debug, Default, Clone)]
pub struct IngestArgs {
    /// Raw RFC 5322 message files
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Parse and classify only, do not write
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the classify command.
#[derive(Args, Debug, Default, Clone)]
pub struct ClassifyArgs {
    /// Message subject
    #[arg(long, short = 's')]
    pub subject: String,

    /// Message body
    #[arg(long, short = 'b', default_value = "")]
    pub body: String,
}

/// Arguments for the list command.
#[derive(Args, Debug, Default, Clone)]
pub struct ListArgs {
    /// Filter by status (can be repeated)
    #[arg(long, short = 's')]
    pub status: Vec<String>,

    /// Filter by priority (can be repeated)
    #[arg(long, short = 'p')]
    pub priority: Vec<String>,

    /// Match identifier, subject or description (case-insensitive)
    #[arg(long)]
    pub search: Option<String>,

    /// Only bugs updated at or after this time (RFC3339 or YYYY-MM-DD)
    #[arg(long)]
    pub since: Option<String>,

    /// Sort field (`updated`, `created`, `priority`, `modifications`, `id`)
    #[arg(long)]
    pub sort: Option<String>,

    /// Reverse sort order
    #[arg(long, short = 'r')]
    pub reverse: bool,

    /// Maximum number of results (0 = unlimited, default: 50)
    #[arg(long)]
    pub limit: Option<usize>,
}

/// Arguments for the show command.
#[derive(Args, Debug, Default, Clone)]
pub struct ShowArgs {
    /// Bug identifiers
    #[arg(required = true)]
    pub ids: Vec<String>,

    /// Number of recent events to include
    #[arg(long, default_value_t = 10)]
    pub events: usize,
}

/// Arguments for the mark command.
#[derive(Args, Debug, Default, Clone)]
pub struct MarkArgs {
    /// New status (`open`, `in_progress`, `resolved`, `closed`)
    pub status: String,

    /// Bug identifiers
    #[arg(required = true)]
    pub ids: Vec<String>,
}

/// Arguments for the delete command.
#[derive(Args, Debug, Default, Clone)]
pub struct DeleteArgs {
    /// Bug identifiers
    #[arg(required = true)]
    pub ids: Vec<String>,
}

/// Arguments for the history command.
#[derive(Args, Debug, Default, Clone)]
pub struct HistoryArgs {
    /// Bug identifier
    pub id: String,

    /// Maximum number of events (0 = all)
    #[arg(long, default_value_t = 0)]
    pub limit: usize,
}

/// Arguments for the stats command.
#[derive(Args, Debug, Clone)]
pub struct StatsArgs {
    /// Days covered by the modifications chart (1-3650)
    #[arg(
        long,
        default_value_t = 7,
        value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_STATS_DAYS))
    )]
    pub days: u32,
}

impl Default for StatsArgs {
    fn default() -> Self {
        Self { days: 7 }
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommands {
    /// Print the merged value of a key
    Get {
        key: String,
    },
    /// Store a runtime key in the database
    Set {
        key: String,
        value: String,
    },
    /// Remove a key from the database
    Unset {
        key: String,
    },
    /// Show every merged key
    List,
    /// Show config file locations
    Path,
}

/// Arguments for the completions command.
#[derive(Args, Debug, Clone)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: ShellType,

    /// Output file (default: stdout)
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

/// Supported shells for completion generation.
#[derive(ValueEnum, Debug, Clone, Copy, Eq, PartialEq)]
pub enum ShellType {
    /// Bash shell
    Bash,
    /// Zsh shell
    Zsh,
    /// Fish shell
    Fish,
    #[value(name = "powershell")]
    #[value(alias = "pwsh")]
    /// `PowerShell`
    PowerShell,
    /// Elvish shell
    Elvish,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["bugmail", "list", "--json", "-s", "open", "--limit", "5"])
            .unwrap();
        assert!(cli.json);
        match cli.command {
            Commands::List(args) => {
                assert_eq!(args.status, vec!["open"]);
                assert_eq!(args.limit, Some(5));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn mark_requires_ids() {
        assert!(Cli::try_parse_from(["bugmail", "mark", "resolved"]).is_err());
        let cli = Cli::try_parse_from(["bugmail", "mark", "resolved", "A-1", "A-2"]).unwrap();
        match cli.command {
            Commands::Mark(args) => assert_eq!(args.ids, vec!["A-1", "A-2"]),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn stats_days_is_bounded() {
        for days in ["0", "3651", "4294967295"] {
            assert!(
                Cli::try_parse_from(["bugmail", "stats", "--days", days]).is_err(),
                "accepted --days {days}"
            );
        }
        let cli = Cli::try_parse_from(["bugmail", "stats", "--days", "3650"]).unwrap();
        match cli.command {
            Commands::Stats(args) => assert_eq!(args.days, MAX_STATS_DAYS),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn overrides_carry_db_and_actor() {
        let cli =
            Cli::try_parse_from(["bugmail", "--db", "x.db", "--actor", "ops", "poll"]).unwrap();
        let overrides = cli.overrides();
        assert_eq!(overrides.db, Some(PathBuf::from("x.db")));
        assert_eq!(overrides.actor.as_deref(), Some("ops"));
    }
}
