//! Logging and observability for quartet
//!
//! Structured logging via `tracing`. Every pipeline stage runs inside a
//! `stage_execution` span carrying `pipeline`, `stage` and `role` fields, and
//! emits start/complete/error events with durations. Error text is redacted
//! before it reaches any subscriber.

use tracing::{Level, error, info, span};
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::redaction::redact_error_message;

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` wins when set. Otherwise `verbose` selects
/// `quartet=debug,info` over the default `quartet=info,warn`. With `json`
/// the fmt layer emits one JSON object per event, for log shippers.
///
/// Fails if a global subscriber has already been installed.
pub fn init_tracing(verbose: bool, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| {
            if verbose {
                EnvFilter::try_new("quartet=debug,info")
            } else {
                EnvFilter::try_new("quartet=info,warn")
            }
        })
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    if json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()?;
    } else if verbose {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_line_number(false)
                    .with_file(false)
                    .with_span_events(FmtSpan::CLOSE)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .try_init()?;
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_line_number(false)
                    .with_file(false)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .try_init()?;
    }

    Ok(())
}

/// Span wrapping one stage of one pipeline run.
pub fn stage_span(pipeline: &str, stage: &str, role: &str) -> tracing::Span {
    span!(
        Level::INFO,
        "stage_execution",
        pipeline = %pipeline,
        stage = %stage,
        role = %role,
    )
}

pub fn log_stage_start(pipeline: &str, stage: &str, role: &str) {
    info!(
        pipeline = %pipeline,
        stage = %stage,
        role = %role,
        "Starting stage"
    );
}

pub fn log_stage_complete(pipeline: &str, stage: &str, duration_ms: u128, output_chars: usize) {
    info!(
        pipeline = %pipeline,
        stage = %stage,
        duration_ms = %duration_ms,
        output_chars = output_chars,
        "Stage completed"
    );
}

/// Log a failed stage. The error text is redacted first.
pub fn log_stage_error(pipeline: &str, stage: &str, error: &str, duration_ms: u128) {
    let sanitized_error = redact_error_message(error);
    error!(
        pipeline = %pipeline,
        stage = %stage,
        duration_ms = %duration_ms,
        error = %sanitized_error,
        "Stage failed"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracing_initialization() {
        // Only the first init in a test process can succeed
        let first = init_tracing(false, false);
        let second = init_tracing(true, true);
        assert!(first.is_err() || second.is_err());
    }

    #[test]
    fn test_stage_span_creation() {
        let span = stage_span("essay", "draft", "reasoning");
        if let Some(metadata) = span.metadata() {
            assert_eq!(metadata.name(), "stage_execution");
        }
    }

    #[test]
    fn test_stage_logging_functions() {
        log_stage_start("ideas", "brainstorm", "reasoning");
        log_stage_complete("ideas", "brainstorm", 1200, 5321);
        log_stage_error(
            "ideas",
            "brainstorm",
            "401 for key sk-abcdefghijklmnopqrstuvwxyz",
            30,
        );
    }
}
