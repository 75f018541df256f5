//! Report and stats commands.

use crate::core::dashboard::Dashboard;
use crate::error::Result;
use crate::render;
use crate::storage::ResolvedConfig;

/// Execute the report command.
pub async fn execute(resolved: &ResolvedConfig) -> Result<()> {
    let dashboard = Dashboard::from_config(&resolved.config)?;
    let report = dashboard.system_report().await;
    let output = render::render_report(&report, resolved.format, resolved.pretty, resolved.no_color)?;
    println!("{}", output.trim_end());
    Ok(())
}

/// Execute the stats command.
pub async fn execute_stats(resolved: &ResolvedConfig) -> Result<()> {
    let dashboard = Dashboard::from_config(&resolved.config)?;
    let stats = dashboard.statistics().await;
    let output = render::render_stats(&stats, resolved.format, resolved.pretty, resolved.no_color)?;
    println!("{}", output.trim_end());
    Ok(())
}
