//! CLI argument parsing and command dispatch.

pub mod activity;
pub mod args;
pub mod auth;
pub mod report;
pub mod status;
pub mod trigger;
pub mod watch;

pub use args::{Cli, Commands, OutputFormat};

use crate::error::Result;
use crate::storage::ResolvedConfig;

/// Run the parsed command. No subcommand means `status`.
///
/// # Errors
///
/// Returns configuration and rendering errors; probe failures never surface
/// here.
pub async fn dispatch(command: Option<Commands>, resolved: &ResolvedConfig) -> Result<()> {
    match command {
        None => status::execute(&args::StatusArgs::default(), resolved).await,
        Some(Commands::Status(args)) => status::execute(&args, resolved).await,
        Some(Commands::Report) => report::execute(resolved).await,
        Some(Commands::Activity(args)) => activity::execute(&args, resolved).await,
        Some(Commands::Logs(args)) => activity::execute_logs(&args, resolved).await,
        Some(Commands::Stats) => report::execute_stats(resolved).await,
        Some(Commands::Trigger(args)) => trigger::execute(&args, resolved).await,
        Some(Commands::Auth(args)) => auth::execute(&args, resolved).await,
    }
}
