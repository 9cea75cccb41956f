//! CLI command implementations.

pub mod init;
pub mod plan;
pub mod publish;

pub use init::init_project;
pub use plan::plan_notes;
pub use publish::publish_notes;

use anyhow::{Context, Result};
use notepress_core::{Config, SiyuanStore};
use std::path::Path;

/// Load the config, letting a command-line token win over the file
fn load_config(config_path: &Path, token: Option<String>) -> Result<Config> {
    tracing::info!("Loading config from {:?}", config_path);
    let config = Config::from_file(config_path)
        .with_context(|| format!("Failed to load configuration from {:?}", config_path))?;

    Ok(match token {
        Some(token) => config.with_token(token),
        None => config,
    })
}

fn connect(config: &Config) -> Result<SiyuanStore> {
    tracing::debug!(api_url = %config.store.api_url, "Connecting to note store");
    SiyuanStore::new(&config.store.api_url, &config.store.token)
        .context("Failed to create note store client")
}
