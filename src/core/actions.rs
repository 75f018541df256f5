//! Manual action triggers.
//!
//! Each action is one run of the orchestrator entry point in a specific
//! mode, with its output captured and a hard per-kind timeout.

use std::path::PathBuf;
use std::time::Duration;

use super::cli_runner::run_command_in;
use super::models::{ActionKind, ActionOutcome};

/// How to invoke the orchestrator.
#[derive(Debug, Clone)]
pub struct ActionSettings {
    /// Interpreter or binary to launch.
    pub program: String,
    /// First argument, usually the orchestrator script.
    pub script: String,
    /// Passed as `--credentials`.
    pub credentials_path: PathBuf,
    /// Working directory for the child; inherits ours when unset.
    pub working_dir: Option<PathBuf>,
    pub mining_timeout: Duration,
    pub submission_timeout: Duration,
    pub generation_timeout: Duration,
}

impl Default for ActionSettings {
    fn default() -> Self {
        Self {
            program: "python".to_string(),
            script: "alpha_orchestrator.py".to_string(),
            credentials_path: PathBuf::from("./cookie.txt"),
            working_dir: None,
            mining_timeout: Duration::from_secs(300),
            submission_timeout: Duration::from_secs(600),
            generation_timeout: Duration::from_secs(300),
        }
    }
}

impl ActionSettings {
    #[must_use]
    pub const fn timeout_for(&self, kind: ActionKind) -> Duration {
        match kind {
            ActionKind::Mining => self.mining_timeout,
            ActionKind::Submission => self.submission_timeout,
            ActionKind::Generation => self.generation_timeout,
        }
    }

    /// Full argument list after the program name.
    #[must_use]
    pub fn arguments(&self, kind: ActionKind) -> Vec<String> {
        let mode = match kind {
            ActionKind::Mining => "miner",
            ActionKind::Submission => "submitter",
            ActionKind::Generation => "generator",
        };
        let mut args = vec![
            self.script.clone(),
            "--mode".to_string(),
            mode.to_string(),
            "--credentials".to_string(),
            self.credentials_path.display().to_string(),
        ];
        let batch = match kind {
            ActionKind::Mining => None,
            ActionKind::Submission => Some("3"),
            ActionKind::Generation => Some("1"),
        };
        if let Some(batch) = batch {
            args.push("--batch-size".to_string());
            args.push(batch.to_string());
        }
        args
    }
}

/// Run one action to completion.
///
/// Spawn failures and timeouts produce `success = false` with the error in
/// `stderr`; nothing is returned as an error.
pub async fn run_action(settings: &ActionSettings, kind: ActionKind) -> ActionOutcome {
    let args = settings.arguments(kind);
    let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
    let timeout = settings.timeout_for(kind);

    tracing::info!(action = %kind, program = %settings.program, timeout_secs = timeout.as_secs(), "Triggering action");

    match run_command_in(&settings.program, &arg_refs, settings.working_dir.as_deref(), timeout).await {
        Ok(output) => {
            let success = output.success();
            if success {
                tracing::info!(action = %kind, "Action finished");
            } else {
                tracing::warn!(action = %kind, exit_code = output.exit_code, "Action exited with failure");
            }
            ActionOutcome {
                kind,
                success,
                exit_code: Some(output.exit_code),
                stdout: output.stdout,
                stderr: output.stderr,
            }
        }
        Err(e) => {
            tracing::warn!(action = %kind, code = e.error_code(), error = %e, "Action could not run");
            ActionOutcome {
                kind,
                success: false,
                exit_code: None,
                stdout: String::new(),
                stderr: e.to_string(),
            }
        }
    }
}
