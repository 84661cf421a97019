use std::path::PathBuf;

/// CLI values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    pub config_path: Option<PathBuf>,
    pub verbose: Option<bool>,
    pub bind: Option<String>,
    pub stage_timeout_secs: Option<u64>,
}
