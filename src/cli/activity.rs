//! Activity and logs commands.

use crate::cli::args::{ActivityArgs, LogsArgs};
use crate::core::dashboard::Dashboard;
use crate::error::Result;
use crate::render;
use crate::storage::ResolvedConfig;

/// Execute the activity command.
pub async fn execute(args: &ActivityArgs, resolved: &ResolvedConfig) -> Result<()> {
    let dashboard = Dashboard::from_config(&resolved.config)?;
    let limit = args.limit.unwrap_or_else(|| dashboard.activity_window());
    let records = dashboard.recent_activity(limit).await;
    tracing::debug!(limit, found = records.len(), "Collected activity");

    let output = render::render_activity(&records, resolved.format, resolved.pretty, resolved.no_color)?;
    println!("{}", output.trim_end());
    Ok(())
}

/// Execute the logs command.
pub async fn execute_logs(args: &LogsArgs, resolved: &ResolvedConfig) -> Result<()> {
    let dashboard = Dashboard::from_config(&resolved.config)?;
    let lines = if args.generator {
        dashboard.generator_logs(args.lines).await
    } else {
        dashboard.logs(args.lines).await
    };
    tracing::debug!(generator = args.generator, found = lines.len(), "Collected log lines");

    let output = render::render_logs(&lines, resolved.format, resolved.pretty, resolved.no_color)?;
    println!("{}", output.trim_end());
    Ok(())
}
