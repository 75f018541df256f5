//! Auth command implementation.
//!
//! Loads the cookie, validates it once against the identity endpoint, prints
//! the outcome and clears the secret before returning.

use std::io::IsTerminal;

use crate::cli::args::AuthArgs;
use crate::core::credentials::CredentialManager;
use crate::core::models::AuthSummary;
use crate::error::{ExitCode, Result, WatchError};
use crate::render;
use crate::storage::ResolvedConfig;

/// Execute the auth command.
pub async fn execute(args: &AuthArgs, resolved: &ResolvedConfig) -> Result<()> {
    let mut manager = CredentialManager::new(resolved.config.credential_settings());
    let summary = check(&mut manager, args).await;
    manager.clear();

    let Some(summary) = summary else {
        return Err(WatchError::CredentialsMissing);
    };

    let output = render::render_auth(&summary, resolved.format, resolved.pretty, resolved.no_color)?;
    println!("{}", output.trim_end());

    if !summary.authenticated {
        std::process::exit(ExitCode::AuthFailed.into());
    }
    Ok(())
}

/// Load and validate. `None` when no secret could be obtained at all.
async fn check(manager: &mut CredentialManager, args: &AuthArgs) -> Option<AuthSummary> {
    let path = args.cookie_file.clone().or_else(|| manager.find_credential_file());

    let loaded = path
        .as_deref()
        .is_some_and(|path| manager.load_from_file(Some(path)));

    let may_prompt = !args.no_prompt && std::io::stdin().is_terminal();
    let (loaded, source) = if loaded {
        (true, path.map(|p| p.display().to_string()))
    } else if may_prompt {
        (manager.prompt_interactively(), None)
    } else {
        (false, None)
    };

    if !loaded {
        return None;
    }

    let authenticated = manager.validate().await;
    let session = manager.session();
    Some(AuthSummary {
        state: manager.state().to_string(),
        authenticated,
        credential_file: source,
        api_base: session.as_ref().map(|s| s.api_base().to_string()),
        validated_at: session.as_ref().map(|s| s.validated_at()),
    })
}
