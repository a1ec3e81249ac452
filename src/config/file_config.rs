//! Optional TOML configuration file.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// TOML-file counterpart of the CLI options. Every field is optional;
/// present values override the CLI.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    pub track_list: Option<String>,
    pub catalog_base_url: Option<String>,
    pub streaming_base_url: Option<String>,
    pub country_code: Option<String>,
    pub search_limit: Option<usize>,
    pub request_delay_secs: Option<u64>,
    pub require_confirm: Option<bool>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&text)
            .with_context(|| format!("invalid TOML in config file {}", path.display()))
    }
}
