//! Status command implementation.

use tokio::time::Duration;

use crate::cli::args::StatusArgs;
use crate::cli::watch::run_watch;
use crate::core::dashboard::Dashboard;
use crate::error::Result;
use crate::render;
use crate::storage::ResolvedConfig;

/// Execute the status command.
pub async fn execute(args: &StatusArgs, resolved: &ResolvedConfig) -> Result<()> {
    args.validate()?;
    let dashboard = Dashboard::from_config(&resolved.config)?;

    if args.watch {
        tracing::debug!(interval = args.interval, "Starting watch mode");
        return run_watch(&dashboard, resolved, Duration::from_secs(args.interval)).await;
    }

    let snapshot = dashboard.snapshot().await;
    let output = render::render_status(&snapshot, resolved.format, resolved.pretty, resolved.no_color)?;
    println!("{}", output.trim_end());
    Ok(())
}
