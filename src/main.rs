//! orchwatch - Orchestrator Watch
//!
//! CLI entry point.

#![forbid(unsafe_code)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

use clap::Parser;
use std::process::ExitCode;

use orchwatch::cli::{self, Cli, OutputFormat};
use orchwatch::core::logging;
use orchwatch::render;
use orchwatch::storage::ResolvedConfig;

#[tokio::main]
async fn main() -> ExitCode {
    let mut cli = Cli::parse();

    let resolved = ResolvedConfig::resolve(&cli);

    // Initialize logging: CLI flag, then env, then config file
    let config_level = resolved
        .as_ref()
        .ok()
        .and_then(|r| r.config.general.log_level.as_deref())
        .and_then(logging::LogLevel::from_arg);
    let log_level = cli
        .log_level
        .as_deref()
        .and_then(logging::LogLevel::from_arg)
        .or_else(logging::parse_log_level_from_env)
        .or(config_level)
        .unwrap_or_default();
    let log_format = if cli.json_output {
        logging::LogFormat::Json
    } else {
        logging::parse_log_format_from_env().unwrap_or_default()
    };
    let log_file = logging::parse_log_file_from_env();
    let verbose = cli.verbose || resolved.as_ref().is_ok_and(|r| r.verbose);
    logging::init(log_level, log_format, log_file, verbose);

    let mut resolved = match resolved {
        Ok(resolved) => resolved,
        Err(e) => {
            tracing::error!(code = e.error_code(), "{}", e);
            let format = cli.effective_format();
            eprintln!("{}", render::error::render_error(&e, format, cli.no_color, cli.pretty));
            return ExitCode::from(e.exit_code() as u8);
        }
    };
    resolved.no_color = !render::should_use_color(resolved.no_color);
    tracing::debug!(
        config_file = ?resolved.sources.config_file,
        format = %resolved.sources.format,
        "Configuration resolved"
    );

    let command = cli.command.take();
    match cli::dispatch(command, &resolved).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(code = e.error_code(), "{}", e);
            let no_color = resolved.no_color || resolved.format != OutputFormat::Human;
            eprintln!("{}", render::error::render_error(&e, resolved.format, no_color, resolved.pretty));
            ExitCode::from(e.exit_code() as u8)
        }
    }
}
