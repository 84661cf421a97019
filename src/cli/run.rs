//! CLI entry point and dispatch
//!
//! `run()` parses arguments, loads `.env`, discovers configuration, installs
//! tracing, creates the tokio runtime and prints every error itself.

use anyhow::Result;
use clap::Parser;

use super::args::{Cli, Commands};
use super::commands;

use crate::{Config, ConfigError, ExitCode, OrchestrationError, UserFriendlyError};
use quartet_utils::logging::init_tracing;
use quartet_utils::redaction::redact_error_message;

/// Main CLI execution function.
///
/// Returns the exit code on failure after printing the report; main.rs only
/// calls `std::process::exit`.
pub fn run() -> Result<(), ExitCode> {
    let cli = Cli::parse();
    let cli_args = cli.to_cli_args();

    // Before the runtime exists: this writes the process environment
    let dotenv_path = match quartet_config::load_dotenv() {
        Ok(path) => path,
        Err(err) => return Err(report(&anyhow::Error::from(err), ExitCode::CONFIG)),
    };

    let config = match Config::discover(&cli_args) {
        Ok(config) => config,
        Err(err) => return Err(report(&err, ExitCode::CONFIG)),
    };

    if let Err(e) = init_tracing(config.verbose(), cli.log_json) {
        eprintln!("Warning: failed to initialise logging: {e}");
    }
    if let Some(path) = &dotenv_path {
        tracing::debug!(path = %path.display(), "Loaded environment file");
    }

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return Err(ExitCode::INTERNAL);
        }
    };

    let result = rt.block_on(async {
        match cli.command {
            Commands::Serve { .. } => commands::execute_serve_command(&config).await,
            Commands::Ask {
                mode,
                session,
                text,
            } => commands::execute_ask_command(&mode, session.as_deref(), &text, &config).await,
            Commands::Config { json } => commands::execute_config_command(json, &config),
        }
    });

    result.map_err(|err| report(&err, ExitCode::INTERNAL))
}

/// Print `err` for a terminal and pick the exit code.
///
/// Typed errors use their own report and code; anything else is redacted and
/// exits with `fallback`.
fn report(err: &anyhow::Error, fallback: ExitCode) -> ExitCode {
    if let Some(config_error) = err.downcast_ref::<ConfigError>() {
        eprintln!("{}", config_error.display_for_user());
        return ExitCode::from(config_error);
    }
    if let Some(orchestration_error) = err.downcast_ref::<OrchestrationError>() {
        eprintln!("{}", redact_error_message(&orchestration_error.display_for_user()));
        return ExitCode::from(orchestration_error);
    }

    eprintln!("Error: {}", redact_error_message(&format!("{err:#}")));
    if fallback == ExitCode::INTERNAL {
        eprintln!("\n  Run with --verbose for more detailed output");
    }
    fallback
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;
    use quartet_utils::error::LlmError;

    #[test]
    fn test_config_error_maps_to_config_code() {
        let err = anyhow::Error::new(ConfigError::MissingCredentials {
            variables: vec!["GEMINI_API_KEY".to_string()],
        });
        assert_eq!(report(&err, ExitCode::INTERNAL), ExitCode::CONFIG);
    }

    #[test]
    fn test_config_error_found_through_context() {
        let err: Result<()> = Err(ConfigError::InvalidFile("bad toml".to_string()).into());
        let err = err.context("Failed to load config").unwrap_err();
        assert_eq!(report(&err, ExitCode::INTERNAL), ExitCode::CONFIG);
    }

    #[test]
    fn test_provider_failure_maps_to_70() {
        let err = anyhow::Error::new(OrchestrationError::Provider {
            pipeline: "essay".to_string(),
            stage: "draft".to_string(),
            source: LlmError::Timeout {
                duration: std::time::Duration::from_secs(5),
            },
        });
        assert_eq!(report(&err, ExitCode::INTERNAL), ExitCode::PROVIDER_FAILURE);
    }

    #[test]
    fn test_validation_maps_to_usage_code() {
        let err = anyhow::Error::new(OrchestrationError::Validation("Unknown mode 'Z'".into()));
        assert_eq!(report(&err, ExitCode::INTERNAL), ExitCode::CONFIG);
    }

    #[test]
    fn test_untyped_error_uses_fallback() {
        let err = anyhow::anyhow!("Failed to bind 127.0.0.1:1");
        assert_eq!(report(&err, ExitCode::INTERNAL), ExitCode::INTERNAL);
        assert_eq!(report(&err, ExitCode::CONFIG), ExitCode::CONFIG);
    }
}
