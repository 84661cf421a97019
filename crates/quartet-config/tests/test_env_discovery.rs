//! `QUARTET_CONFIG` handling through `Config::discover`, which reads the
//! process environment. Serialized because env vars are process-global.

use quartet_config::{CliArgs, Config, ConfigSource, CONFIG_ENV_VAR};
use serial_test::serial;
use std::fs;
use tempfile::TempDir;

struct EnvGuard;

impl Drop for EnvGuard {
    fn drop(&mut self) {
        unsafe {
            std::env::remove_var(CONFIG_ENV_VAR);
        }
    }
}

#[test]
#[serial]
fn test_quartet_config_env_var_is_used() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("quartet.toml");
    fs::write(
        &path,
        r#"
[server]
bind = "127.0.0.1:7070"

[intent]
extra_keywords = ["compile the report"]
"#,
    )
    .unwrap();

    let _guard = EnvGuard;
    unsafe {
        std::env::set_var(CONFIG_ENV_VAR, &path);
    }

    let config = Config::discover(&CliArgs::default()).unwrap();
    assert_eq!(config.bind(), "127.0.0.1:7070");
    assert_eq!(config.intent.extra_keywords, vec!["compile the report"]);
    assert_eq!(
        config.source_attribution.get("intent_extra_keywords"),
        Some(&ConfigSource::Config)
    );
}

#[test]
#[serial]
fn test_quartet_config_env_var_pointing_nowhere_fails() {
    let temp_dir = TempDir::new().unwrap();
    let _guard = EnvGuard;
    unsafe {
        std::env::set_var(CONFIG_ENV_VAR, temp_dir.path().join("missing.toml"));
    }

    let err = Config::discover(&CliArgs::default()).unwrap_err();
    assert!(format!("{err:#}").contains("missing.toml"));
}
