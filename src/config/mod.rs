//! Configuration resolution.
//!
//! CLI arguments can be overridden by an optional TOML file; the resolved
//! [`AppConfig`] is what the rest of the application consumes.

mod file_config;

pub use file_config::FileConfig;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::catalog;
use crate::client::DEFAULT_REQUEST_DELAY_SECS;
use crate::sources::streaming;

pub const DEFAULT_TRACK_LIST: &str = "tracks.list";

/// CLI arguments subject to config-file override.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub request_headers: PathBuf,
    pub track_list: Option<PathBuf>,
    pub country_code: String,
    pub search_limit: usize,
    pub request_delay_secs: u64,
    pub require_confirm: bool,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub request_headers: PathBuf,
    pub track_list: PathBuf,
    pub catalog_base_url: String,
    pub streaming_base_url: String,
    /// Storefront identifier used in catalog URLs, lowercased.
    pub storefront: String,
    pub search_limit: usize,
    pub request_delay_secs: u64,
    pub require_confirm: bool,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file
    /// config. TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        if !cli.request_headers.exists() {
            bail!(
                "Request headers file not found: {}",
                cli.request_headers.display()
            );
        }

        let track_list = file
            .track_list
            .map(PathBuf::from)
            .or_else(|| cli.track_list.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_TRACK_LIST));

        let catalog_base_url = file
            .catalog_base_url
            .unwrap_or_else(|| catalog::DEFAULT_BASE_URL.to_string());
        let streaming_base_url = file
            .streaming_base_url
            .unwrap_or_else(|| streaming::DEFAULT_BASE_URL.to_string());

        let storefront = file
            .country_code
            .unwrap_or_else(|| cli.country_code.clone())
            .to_lowercase();
        if storefront.is_empty() {
            bail!("country_code must not be empty");
        }

        let search_limit = file.search_limit.unwrap_or(cli.search_limit);
        if !(1..=10).contains(&search_limit) {
            bail!("search_limit must be between 1 and 10, got {}", search_limit);
        }

        let request_delay_secs = file.request_delay_secs.unwrap_or(cli.request_delay_secs);
        let require_confirm = file.require_confirm.unwrap_or(cli.require_confirm);

        Ok(Self {
            request_headers: cli.request_headers.clone(),
            track_list,
            catalog_base_url,
            streaming_base_url,
            storefront,
            search_limit,
            request_delay_secs,
            require_confirm,
        })
    }
}

/// Load the request-headers JSON file (header name to value).
pub fn read_request_headers(path: &Path) -> Result<HashMap<String, String>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read request headers file {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("invalid JSON in request headers file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn headers_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"authorization": "Bearer token"}}"#).unwrap();
        file
    }

    fn cli(headers: &Path) -> CliConfig {
        CliConfig {
            request_headers: headers.to_path_buf(),
            track_list: None,
            country_code: "US".to_string(),
            search_limit: 3,
            request_delay_secs: DEFAULT_REQUEST_DELAY_SECS,
            require_confirm: false,
        }
    }

    #[test]
    fn test_resolve_defaults() {
        let headers = headers_file();
        let config = AppConfig::resolve(&cli(headers.path()), None).unwrap();

        assert_eq!(config.track_list, PathBuf::from(DEFAULT_TRACK_LIST));
        assert_eq!(config.storefront, "us");
        assert_eq!(config.search_limit, 3);
        assert_eq!(config.catalog_base_url, catalog::DEFAULT_BASE_URL);
        assert!(!config.require_confirm);
    }

    #[test]
    fn test_file_overrides_cli() {
        let headers = headers_file();
        let file = FileConfig {
            country_code: Some("JP".to_string()),
            search_limit: Some(5),
            track_list: Some("custom.list".to_string()),
            ..Default::default()
        };
        let config = AppConfig::resolve(&cli(headers.path()), Some(file)).unwrap();

        assert_eq!(config.storefront, "jp");
        assert_eq!(config.search_limit, 5);
        assert_eq!(config.track_list, PathBuf::from("custom.list"));
    }

    #[test]
    fn test_resolve_rejects_missing_headers_file() {
        let mut args = cli(Path::new("/nonexistent/headers.json"));
        args.request_headers = PathBuf::from("/nonexistent/headers.json");
        assert!(AppConfig::resolve(&args, None).is_err());
    }

    #[test]
    fn test_resolve_rejects_out_of_range_search_limit() {
        let headers = headers_file();
        let mut args = cli(headers.path());
        args.search_limit = 0;
        assert!(AppConfig::resolve(&args, None).is_err());

        args.search_limit = 11;
        assert!(AppConfig::resolve(&args, None).is_err());
    }

    #[test]
    fn test_read_request_headers() {
        let headers = headers_file();
        let map = read_request_headers(headers.path()).unwrap();
        assert_eq!(map.get("authorization").unwrap(), "Bearer token");
    }
}
