//! Main application configuration
//!
//! This module defines the configuration structures for the image arena
//! service, including environment variable loading, TOML file loading and
//! validation.

use crate::discovery::DEFAULT_EXTENSIONS;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceSettings,
    pub storage: StorageSettings,
    pub images: ImageSettings,
}

/// Service-level settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Service name for logging and health reports
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Address the HTTP server binds to
    pub host: String,
    /// Port the HTTP server listens on
    pub port: u16,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,
}

/// Rating store settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// SQLite database file
    pub database_path: PathBuf,
    /// Keep everything in memory; nothing survives a restart
    pub in_memory: bool,
}

/// Image ingestion and serving settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageSettings {
    /// Directory scanned for images and served under `url_prefix`
    pub directory: PathBuf,
    /// URL path under which image files are served
    pub url_prefix: String,
    /// File extensions recognised as images
    pub extensions: Vec<String>,
    /// Seed images from `directory` at startup
    pub auto_discover: bool,
    /// Accept new images through `POST /submit`
    pub allow_submissions: bool,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "image-arena".to_string(),
            log_level: "info".to_string(),
            host: "0.0.0.0".to_string(),
            port: 5000,
            shutdown_timeout_seconds: 30,
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("database.db"),
            in_memory: false,
        }
    }
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("static/images"),
            url_prefix: "/static/images".to_string(),
            extensions: DEFAULT_EXTENSIONS.iter().map(|ext| ext.to_string()).collect(),
            auto_discover: true,
            allow_submissions: true,
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| anyhow!("Invalid {} value: {}", name, value))
}

impl AppConfig {
    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML file; environment variables still
    /// override values from the file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config = Self::from_toml_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.apply_env()?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Parse configuration from TOML text. Missing sections and fields keep
    /// their defaults.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    fn apply_env(&mut self) -> Result<()> {
        // Service settings
        if let Ok(name) = env::var("SERVICE_NAME") {
            self.service.name = name;
        }
        if let Ok(log_level) = env::var("LOG_LEVEL") {
            self.service.log_level = log_level;
        }
        if let Ok(host) = env::var("HTTP_HOST") {
            self.service.host = host;
        }
        if let Ok(port) = env::var("HTTP_PORT") {
            self.service.port = parse_var("HTTP_PORT", &port)?;
        }
        if let Ok(timeout) = env::var("SHUTDOWN_TIMEOUT_SECONDS") {
            self.service.shutdown_timeout_seconds =
                parse_var("SHUTDOWN_TIMEOUT_SECONDS", &timeout)?;
        }

        // Storage settings
        if let Ok(path) = env::var("DATABASE_PATH") {
            self.storage.database_path = PathBuf::from(path);
        }
        if let Ok(in_memory) = env::var("IN_MEMORY_STORE") {
            self.storage.in_memory = parse_var("IN_MEMORY_STORE", &in_memory)?;
        }

        // Image settings
        if let Ok(dir) = env::var("IMAGE_DIR") {
            self.images.directory = PathBuf::from(dir);
        }
        if let Ok(prefix) = env::var("IMAGE_URL_PREFIX") {
            self.images.url_prefix = prefix;
        }
        if let Ok(extensions) = env::var("IMAGE_EXTENSIONS") {
            self.images.extensions = extensions
                .split(',')
                .map(|ext| ext.trim().to_string())
                .filter(|ext| !ext.is_empty())
                .collect();
        }
        if let Ok(discover) = env::var("AUTO_DISCOVER_IMAGES") {
            self.images.auto_discover = parse_var("AUTO_DISCOVER_IMAGES", &discover)?;
        }
        if let Ok(submissions) = env::var("ALLOW_SUBMISSIONS") {
            self.images.allow_submissions = parse_var("ALLOW_SUBMISSIONS", &submissions)?;
        }

        Ok(())
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.service.shutdown_timeout_seconds)
    }

    /// Address the HTTP server binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.service.host, self.service.port)
    }
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    // Validate log level
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow!("Invalid log level: {}", config.service.log_level)),
    }

    if config.service.port == 0 {
        return Err(anyhow!("HTTP port cannot be 0"));
    }
    if config.service.host.is_empty() {
        return Err(anyhow!("HTTP host cannot be empty"));
    }
    if config.service.shutdown_timeout_seconds == 0 {
        return Err(anyhow!("Shutdown timeout must be greater than 0"));
    }

    if !config.storage.in_memory && config.storage.database_path.as_os_str().is_empty() {
        return Err(anyhow!("Database path cannot be empty"));
    }

    let prefix = &config.images.url_prefix;
    if !prefix.starts_with('/') || prefix.ends_with('/') {
        return Err(anyhow!(
            "Image URL prefix must start with '/' and must not end with '/': {}",
            prefix
        ));
    }
    if config.images.extensions.is_empty() {
        return Err(anyhow!("At least one image extension must be configured"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(validate_config(&config).is_ok());
        assert_eq!(config.bind_address(), "0.0.0.0:5000");
        assert_eq!(config.shutdown_timeout(), Duration::from_secs(30));
        assert_eq!(config.images.extensions, vec!["jpg", "jpeg", "png", "webp"]);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = AppConfig::default();
        config.service.log_level = "loud".to_string();
        assert!(validate_config(&config).is_err());

        let mut config = AppConfig::default();
        config.service.port = 0;
        assert!(validate_config(&config).is_err());

        let mut config = AppConfig::default();
        config.images.url_prefix = "static/images".to_string();
        assert!(validate_config(&config).is_err());

        let mut config = AppConfig::default();
        config.images.url_prefix = "/static/".to_string();
        assert!(validate_config(&config).is_err());

        let mut config = AppConfig::default();
        config.images.extensions.clear();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_empty_database_path_allowed_in_memory() {
        let mut config = AppConfig::default();
        config.storage.database_path = PathBuf::new();
        assert!(validate_config(&config).is_err());

        config.storage.in_memory = true;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AppConfig::from_toml_str(
            r#"
            [service]
            port = 8081

            [images]
            directory = "/srv/arena/images"
            allow_submissions = false
            "#,
        )
        .unwrap();

        assert_eq!(config.service.port, 8081);
        assert_eq!(config.service.name, "image-arena");
        assert_eq!(config.images.directory, PathBuf::from("/srv/arena/images"));
        assert!(!config.images.allow_submissions);
        assert!(config.images.auto_discover);
        assert_eq!(config.storage, StorageSettings::default());
    }

    #[test]
    fn test_config_roundtrips_through_toml() {
        let config = AppConfig::default();
        let text = toml::to_string(&config).unwrap();
        assert_eq!(AppConfig::from_toml_str(&text).unwrap(), config);
    }
}
