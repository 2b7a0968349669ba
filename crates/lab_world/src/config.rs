use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use lab_assist::ServiceConfig;
use serde::{Deserialize, Serialize};

/// Environment variables checked, in order, when the config file carries no
/// API key.
pub const API_KEY_ENV_VARS: [&str; 2] = ["OPENAI_API_KEY", "VITE_OPENAI_API_KEY"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabConfig {
    pub service: ServiceConfig,
    /// Directory holding the saved workspace snapshot.
    pub data_dir: PathBuf,
    /// Fixed seed for ids and mock predictions. Random when absent.
    pub rng_seed: Option<u64>,
}

impl Default for LabConfig {
    fn default() -> Self {
        Self {
            service: ServiceConfig::default(),
            data_dir: PathBuf::from("./data"),
            rng_seed: None,
        }
    }
}

/// Loads the config file if one is given, then fills the API key from the
/// process environment.
pub fn load_config(path: Option<&Path>) -> Result<LabConfig> {
    let mut config = match path {
        Some(path) => serde_json::from_str(
            &std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?,
        )
        .with_context(|| format!("parsing config {}", path.display()))?,
        None => LabConfig::default(),
    };
    config.service.api_key =
        resolve_api_key(config.service.api_key.take(), |name| std::env::var(name).ok());
    Ok(config)
}

/// First non-blank key from the config file, then [`API_KEY_ENV_VARS`].
pub fn resolve_api_key(
    configured: Option<String>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Option<String> {
    std::iter::once(configured)
        .chain(API_KEY_ENV_VARS.iter().map(|name| lookup(name)))
        .flatten()
        .map(|key| key.trim().to_string())
        .find(|key| !key.is_empty())
}
