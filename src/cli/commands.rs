//! Command implementations

use anyhow::Result;
use serde::Serialize;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, info};

use crate::{ChatRequest, Config, ConfigError, Dispatcher};

pub(super) async fn execute_serve_command(config: &Config) -> Result<()> {
    let addr: SocketAddr = config
        .bind()
        .parse()
        .map_err(|e| ConfigError::InvalidValue {
            key: "bind".to_string(),
            value: format!("{}: {e}", config.bind()),
        })?;

    let providers = quartet_llm::from_config(config)?;
    let dispatcher = Arc::new(Dispatcher::from_config(config, providers));
    info!(
        bind = %addr,
        stage_timeout_secs = config.stage_timeout().as_secs(),
        "Starting quartet server"
    );
    quartet_server::serve(dispatcher, addr).await
}

/// One request through a fresh dispatcher. Plans do not outlive the process.
pub(super) async fn execute_ask_command(
    mode: &str,
    session: Option<&str>,
    text: &[String],
    config: &Config,
) -> Result<()> {
    // Reject a bad mode before credentials are checked
    let request = ChatRequest::parse(mode, text.join(" "), session)?;

    let providers = quartet_llm::from_config(config)?;
    let dispatcher = Dispatcher::from_config(config, providers);
    let answer = dispatcher.handle(&request).await?;
    debug!(mode = request.mode.as_str(), chars = answer.chars().count(), "Answer ready");

    println!("{answer}");
    Ok(())
}

#[derive(Debug, Serialize)]
struct ConfigEntry {
    value: String,
    source: String,
}

pub(super) fn execute_config_command(json: bool, config: &Config) -> Result<()> {
    let entries: BTreeMap<String, ConfigEntry> = config
        .effective_config()
        .into_iter()
        .map(|(key, (value, source))| (key, ConfigEntry { value, source }))
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    println!("Effective configuration:");
    let width = entries.keys().map(String::len).max().unwrap_or(0);
    for (key, entry) in &entries {
        println!("  {key:<width$} = {}  [{}]", entry.value, entry.source);
    }
    Ok(())
}
