//! Watch mode for the status command.
//!
//! Re-evaluates on a fixed interval until Ctrl+C.

use chrono::{DateTime, Local};
use tokio::time::{Duration, interval};

use crate::core::dashboard::Dashboard;
use crate::core::models::{StatusSnapshot, StatusValue};
use crate::error::Result;
use crate::render;
use crate::storage::ResolvedConfig;

/// State tracking across watch iterations.
#[derive(Debug, Default)]
pub struct WatchState {
    pub last_snapshot: Option<StatusSnapshot>,
    pub last_evaluated_at: Option<DateTime<Local>>,
    pub evaluation_count: u64,
    /// Evaluations whose status was not healthy.
    pub unhealthy_count: u64,
    /// Set when the status differs from the previous evaluation.
    pub status_changed: bool,
}

impl WatchState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the latest evaluation.
    pub fn update(&mut self, snapshot: StatusSnapshot) {
        self.evaluation_count += 1;
        if !snapshot.status.is_healthy() {
            self.unhealthy_count += 1;
        }
        let previous: Option<StatusValue> = self.last_snapshot.as_ref().map(|s| s.status);
        self.status_changed = previous.is_some_and(|prev| prev != snapshot.status);
        if self.status_changed {
            tracing::info!(
                from = %previous.unwrap_or_default(),
                to = %snapshot.status,
                "Orchestrator status changed"
            );
        }
        self.last_evaluated_at = Some(Local::now());
        self.last_snapshot = Some(snapshot);
    }
}

/// Run watch mode.
///
/// # Errors
///
/// Returns an error if rendering fails.
pub async fn run_watch(dashboard: &Dashboard, resolved: &ResolvedConfig, every: Duration) -> Result<()> {
    let mut state = WatchState::new();
    let mut ticker = interval(every);

    // Ctrl+C handler for clean shutdown.
    let (shutdown_tx, mut shutdown_rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        let _ = shutdown_tx.send(());
    });

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                state.update(dashboard.snapshot().await);
                render_watch_frame(&state, resolved)?;
            }
            _ = &mut shutdown_rx => {
                tracing::debug!(
                    evaluations = state.evaluation_count,
                    unhealthy = state.unhealthy_count,
                    "Watch mode stopped"
                );
                break;
            }
        }
    }

    Ok(())
}

fn render_watch_frame(state: &WatchState, resolved: &ResolvedConfig) -> Result<()> {
    if let Some(snapshot) = &state.last_snapshot {
        let output = render::render_status(snapshot, resolved.format, resolved.pretty, resolved.no_color)?;
        println!("{}", output.trim_end());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::make_test_snapshot;

    #[test]
    fn watch_state_counts_evaluations() {
        let mut state = WatchState::new();
        state.update(make_test_snapshot(StatusValue::Active));
        state.update(make_test_snapshot(StatusValue::Stopped));

        assert_eq!(state.evaluation_count, 2);
        assert_eq!(state.unhealthy_count, 1);
        assert!(state.status_changed);
        assert_eq!(state.last_snapshot.as_ref().unwrap().status, StatusValue::Stopped);
        assert!(state.last_evaluated_at.is_some());
    }

    #[test]
    fn unchanged_status_is_not_a_change() {
        let mut state = WatchState::new();
        state.update(make_test_snapshot(StatusValue::Idle));
        assert!(!state.status_changed);
        state.update(make_test_snapshot(StatusValue::Idle));
        assert!(!state.status_changed);
        assert_eq!(state.unhealthy_count, 0);
    }
}
