use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::ConfigError;

/// Default Teamup API endpoint.
pub const TEAMUP_API_BASE: &str = "https://api.teamup.com";

const API_KEY_ENV: &str = "TEAMUP_API_KEY";
const CALENDAR_ID_ENV: &str = "TEAMUP_CALENDAR_ID";

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Add an error
    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Add a warning
    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        if self.errors.is_empty() {
            return String::new();
        }
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application configuration directory
    #[serde(default = "default_config_dir")]
    pub config_dir: PathBuf,

    /// Teamup API access
    #[serde(default)]
    pub teamup: TeamupConfig,

    /// Local cache storage
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamupConfig {
    /// API key sent as the `Teamup-Token` header.
    #[serde(default)]
    pub api_key: String,

    /// Calendar key, the first path segment of every API call.
    #[serde(default)]
    pub calendar_id: String,

    /// API base URL (override for staging or mock servers)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// HTTP timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    TEAMUP_API_BASE.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for TeamupConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            calendar_id: String::new(),
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite file holding the weekly snapshot and persisted options
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("teamup")
}

fn default_database_path() -> PathBuf {
    default_config_dir().join("teamup.db")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_dir: default_config_dir(),
            teamup: TeamupConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file, creating default if it doesn't exist
    pub fn load() -> Result<Self> {
        Self::load_or_create(&Self::config_path()?)
    }

    /// Load `path`, writing a default file there first if it is missing.
    ///
    /// Credentials from the environment are applied in memory only and never
    /// written to the file.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if !path.exists() {
            let mut config = Self::default();
            config.save_to(path)?;
            config.apply_env_overrides();
            return Ok(config);
        }

        Self::load_from(path)
    }

    /// Load configuration from an explicit path.
    ///
    /// Environment credentials take precedence over the file.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()).into());
        }

        let contents = std::fs::read_to_string(path).context("Failed to read config file")?;

        let mut config: Config = toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.apply_env_overrides();

        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            self.teamup.api_key = key;
        }
        if let Ok(calendar) = std::env::var(CALENDAR_ID_ENV) {
            self.teamup.calendar_id = calendar;
        }
    }

    /// Validate the configuration
    ///
    /// Missing credentials are only warnings: a render without them falls back
    /// to whatever is cached.
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_url(&self.teamup.base_url, "teamup.base_url", &mut result);

        if self.teamup.api_key.trim().is_empty() {
            result.add_warning(
                "teamup.api_key",
                format!("Teamup API key not set (config file or {})", API_KEY_ENV),
            );
        }

        if self.teamup.calendar_id.trim().is_empty() {
            result.add_warning(
                "teamup.calendar_id",
                format!("Teamup calendar id not set (config file or {})", CALENDAR_ID_ENV),
            );
        }

        if self.teamup.timeout_secs == 0 {
            result.add_warning("teamup.timeout_secs", "HTTP timeout disabled (0 seconds)");
        }

        if self.storage.database_path.as_os_str().is_empty() {
            result.add_error("storage.database_path", "Database path must not be empty");
        } else if self.storage.database_path.is_dir() {
            result.add_error(
                "storage.database_path",
                format!(
                    "Path is a directory: {}",
                    self.storage.database_path.display()
                ),
            );
        }

        result
    }

    /// Validate a URL field
    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Save configuration to an explicit path
    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        // Ensure config directory exists
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(config_path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Get the path to the configuration file
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("teamup");

        Ok(config_dir.join("config.toml"))
    }
}
