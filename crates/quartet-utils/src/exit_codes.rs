//! Exit code constants for the quartet binary.
//!
//! | Code | Constant | Description |
//! |------|----------|-------------|
//! | 0 | `SUCCESS` | Operation completed successfully |
//! | 1 | `INTERNAL` | General/internal failure |
//! | 2 | `CONFIG` | Invalid CLI arguments, configuration or missing credentials |
//! | 70 | `PROVIDER_FAILURE` | A provider call aborted the pipeline |

use crate::error::{ConfigError, OrchestrationError};

/// Process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(i32);

impl ExitCode {
    /// Success - operation completed successfully
    pub const SUCCESS: ExitCode = ExitCode(0);

    /// Internal error - general failure
    pub const INTERNAL: ExitCode = ExitCode(1);

    /// Configuration error - invalid flags, config file, or missing API keys
    pub const CONFIG: ExitCode = ExitCode(2);

    /// Provider failure - a stage's provider call failed
    pub const PROVIDER_FAILURE: ExitCode = ExitCode(70);

    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }
}

impl From<&ConfigError> for ExitCode {
    fn from(_: &ConfigError) -> Self {
        ExitCode::CONFIG
    }
}

impl From<&OrchestrationError> for ExitCode {
    fn from(err: &OrchestrationError) -> Self {
        match err {
            OrchestrationError::Validation(_) => ExitCode::CONFIG,
            OrchestrationError::Provider { .. } => ExitCode::PROVIDER_FAILURE,
            OrchestrationError::Internal(_) => ExitCode::INTERNAL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LlmError;

    #[test]
    fn test_orchestration_errors_map_to_exit_codes() {
        let validation = OrchestrationError::Validation("bad mode".into());
        assert_eq!(ExitCode::from(&validation), ExitCode::CONFIG);

        let provider = OrchestrationError::Provider {
            pipeline: "ideas".into(),
            stage: "brainstorm".into(),
            source: LlmError::ProviderQuota("429".into()),
        };
        assert_eq!(ExitCode::from(&provider).as_i32(), 70);

        let internal = OrchestrationError::Internal("oops".into());
        assert_eq!(ExitCode::from(&internal), ExitCode::INTERNAL);
    }
}
