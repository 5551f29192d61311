//! Shared helper functions for CLI commands

use std::path::Path;
use std::sync::Arc;

use miette::Result;
use seamless_core::config::{self, SeamlessConfig};
use seamless_core::{Credential, CredentialDiscovery, ProcessEnv};
use tracing::info;

/// Load config from an explicit path, or from the standard locations.
pub async fn load_config(path: Option<&Path>) -> Result<SeamlessConfig> {
    let config = if let Some(config_path) = path {
        info!("Loading config from: {:?}", config_path);
        config::load_config(config_path).await?
    } else {
        info!("Loading config from standard locations");
        config::load_config_from_standard_locations().await?
    };
    Ok(config)
}

/// The GitHub credential from the process environment, if any.
pub fn discover_credential(config: &SeamlessConfig) -> Option<Credential> {
    CredentialDiscovery::new(config.environment.clone(), Arc::new(ProcessEnv)).credential()
}
