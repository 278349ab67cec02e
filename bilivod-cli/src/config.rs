use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use bilivod_resolver::extractor::DEFAULT_TIMEOUT;

use crate::cli::OutputFormat;

const APP_NAME: &str = "bilivod";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Default output format
    pub default_output_format: OutputFormat,

    /// Default request timeout in seconds
    pub default_timeout: u64,

    /// Session cookies used when none are given on the command line
    pub default_cookies: Option<String>,

    /// User agent string for API and range requests
    pub user_agent: Option<String>,

    /// Address the `serve` command listens on
    pub bind_address: String,

    /// Enable colored output
    pub colored_output: bool,

    /// Default proxy URL (supports http, https, socks5)
    pub default_proxy: Option<String>,

    /// Default proxy username (if proxy requires authentication)
    pub default_proxy_username: Option<String>,

    /// Default proxy password (if proxy requires authentication)
    pub default_proxy_password: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_output_format: OutputFormat::Pretty,
            default_timeout: DEFAULT_TIMEOUT.as_secs(),
            default_cookies: None,
            user_agent: None,
            bind_address: "127.0.0.1:7878".to_string(),
            colored_output: true,
            default_proxy: None,
            default_proxy_username: None,
            default_proxy_password: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from file
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        match config_path {
            Some(path) => {
                if path.exists() {
                    let content = std::fs::read_to_string(path)
                        .context("Failed to read configuration file")?;
                    toml::from_str(&content).context("Failed to parse configuration file")
                } else {
                    Ok(Self::default())
                }
            }
            None => confy::load(APP_NAME, None).context("Failed to load configuration"),
        }
    }

    /// Get default configuration file path
    pub fn default_config_path() -> Option<PathBuf> {
        confy::get_configuration_file_path(APP_NAME, None).ok()
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let toml_string =
            toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        std::fs::write(path, toml_string).context("Failed to write configuration file")?;

        Ok(())
    }

    /// Reset configuration to defaults and save
    pub fn reset(config_path: Option<&Path>) -> Result<()> {
        let path = config_path
            .map(|p| p.to_path_buf())
            .or_else(Self::default_config_path)
            .context("No configuration path available")?;

        Self::default().save(&path)
    }

    /// Show current configuration as a formatted string
    pub fn show(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration for display")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            default_timeout = 30
            default_output_format = "json-compact"
            "#,
        )
        .unwrap();
        assert_eq!(config.default_timeout, 30);
        assert_eq!(config.default_output_format, OutputFormat::JsonCompact);
        assert_eq!(config.bind_address, "127.0.0.1:7878");
    }

    #[test]
    fn test_missing_file_is_default() {
        let config = AppConfig::load(Some(Path::new("/nonexistent/bilivod.toml"))).unwrap();
        assert_eq!(config.default_timeout, 15);
    }

    #[test]
    fn test_round_trip_through_toml() {
        let text = AppConfig::default().show().unwrap();
        let config: AppConfig = toml::from_str(&text).unwrap();
        assert_eq!(config.bind_address, AppConfig::default().bind_address);
    }
}
