//! CLI argument definitions using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::core::models::ActionKind;

/// Orchestrator watch - health, activity and actions for a background orchestrator.
#[derive(Parser, Debug)]
#[command(name = "orchwatch")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    // === Global flags ===
    /// Output format
    #[arg(long, value_enum, default_value = "human", global = true)]
    pub format: OutputFormat,

    /// Shorthand for --format json
    #[arg(long, global = true)]
    pub json: bool,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Config file to use instead of the default location
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Log level
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Emit JSONL logs to stderr
    #[arg(long, global = true)]
    pub json_output: bool,

    /// Verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl Cli {
    /// Resolve the effective output format.
    #[must_use]
    pub const fn effective_format(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else {
            self.format
        }
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the consolidated orchestrator status (default command)
    Status(StatusArgs),

    /// Show status, service health, recent activity and statistics together
    Report,

    /// Show recent normalized log activity
    Activity(ActivityArgs),

    /// Show raw recent log lines
    Logs(LogsArgs),

    /// Show result file statistics
    Stats,

    /// Run an orchestrator action now
    Trigger(TriggerArgs),

    /// Validate the API cookie
    Auth(AuthArgs),
}

/// Arguments for the `status` command.
#[derive(Parser, Debug, Default)]
pub struct StatusArgs {
    /// Run in watch mode, continuously updating display.
    #[arg(long, short = 'w')]
    pub watch: bool,

    /// Interval between updates in seconds.
    #[arg(long, default_value = "30")]
    pub interval: u64,
}

impl StatusArgs {
    /// Validate argument combinations.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for a zero watch interval.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.watch && self.interval == 0 {
            return Err(crate::error::WatchError::Config(
                "Watch interval must be greater than 0 seconds".to_string(),
            ));
        }
        Ok(())
    }
}

/// Arguments for the `activity` command.
#[derive(Parser, Debug)]
pub struct ActivityArgs {
    /// Maximum records to show (defaults to the configured window)
    #[arg(long, short = 'n', value_name = "N")]
    pub limit: Option<usize>,
}

/// Arguments for the `logs` command.
#[derive(Parser, Debug)]
pub struct LogsArgs {
    /// Number of lines to show
    #[arg(long, short = 'n', default_value = "50")]
    pub lines: usize,

    /// Show the alpha generator's log instead of the orchestrator's
    #[arg(long, short = 'g')]
    pub generator: bool,
}

/// Arguments for the `trigger` command.
#[derive(Parser, Debug)]
pub struct TriggerArgs {
    /// Action to run
    #[arg(value_enum)]
    pub action: ActionArg,
}

/// Arguments for the `auth` command.
#[derive(Parser, Debug)]
pub struct AuthArgs {
    /// Read the cookie from this file instead of searching for it
    #[arg(long, value_name = "PATH")]
    pub cookie_file: Option<PathBuf>,

    /// Never ask for the cookie on the terminal
    #[arg(long)]
    pub no_prompt: bool,
}

/// Action names accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ActionArg {
    #[value(alias = "mine", alias = "miner")]
    Mining,
    #[value(alias = "submit", alias = "submitter")]
    Submission,
    #[value(alias = "generate", alias = "generator")]
    Generation,
}

impl From<ActionArg> for ActionKind {
    fn from(arg: ActionArg) -> Self {
        match arg {
            ActionArg::Mining => Self::Mining,
            ActionArg::Submission => Self::Submission,
            ActionArg::Generation => Self::Generation,
        }
    }
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable colored output
    #[default]
    Human,
    /// JSON output
    Json,
    /// Markdown output
    Md,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_parses() {
        Cli::command().debug_assert();
    }

    #[test]
    fn status_args_validate() {
        let args = StatusArgs {
            watch: true,
            interval: 0,
        };
        assert!(args.validate().is_err());
    }

    #[test]
    fn trigger_accepts_aliases() {
        let cli = Cli::parse_from(["orchwatch", "trigger", "submit"]);
        match cli.command {
            Some(Commands::Trigger(args)) => {
                assert_eq!(ActionKind::from(args.action), ActionKind::Submission);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn logs_generator_flag() {
        let cli = Cli::parse_from(["orchwatch", "logs", "-g", "-n", "5"]);
        match cli.command {
            Some(Commands::Logs(args)) => {
                assert!(args.generator);
                assert_eq!(args.lines, 5);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn json_shorthand_wins() {
        let cli = Cli::parse_from(["orchwatch", "--json", "stats"]);
        assert_eq!(cli.effective_format(), OutputFormat::Json);
    }
}
