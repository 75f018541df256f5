//! Trigger command implementation.

use crate::cli::args::TriggerArgs;
use crate::core::dashboard::Dashboard;
use crate::core::models::ActionKind;
use crate::error::{ExitCode, Result};
use crate::render;
use crate::storage::ResolvedConfig;

/// Execute the trigger command.
///
/// Exits non-zero when the action itself fails, after printing its output.
pub async fn execute(args: &TriggerArgs, resolved: &ResolvedConfig) -> Result<()> {
    let kind = ActionKind::from(args.action);
    let dashboard = Dashboard::from_config(&resolved.config)?;

    let outcome = dashboard.trigger_action(kind).await;
    let output = render::render_action(&outcome, resolved.format, resolved.pretty, resolved.no_color)?;
    println!("{}", output.trim_end());

    if !outcome.success {
        // Non-zero exit for scripting
        std::process::exit(ExitCode::GeneralError.into());
    }
    Ok(())
}
