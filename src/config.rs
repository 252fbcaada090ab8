use anyhow::Result;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_BASE_URL: &str = "http://localhost:4000";
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// A validation error in the configuration
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]: {}", self.field, self.message)
    }
}

/// Remote booking API settings
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ApiConfig {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

/// Where the session token is persisted
#[derive(Debug, Clone, Deserialize, Default)]
pub struct StorageConfig {
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Session transcript settings
#[derive(Debug, Clone, Deserialize, Default)]
pub struct LoggingConfig {
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn bookdesk_home() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".bookdesk"))
}

impl Config {
    /// Load configuration from default paths
    /// Priority: local (.bookdesk/config.local.toml) > project (.bookdesk/config.toml) > user (~/.bookdesk/config.toml)
    pub fn load() -> Result<Self> {
        let mut layers = Vec::new();
        if let Some(home) = bookdesk_home() {
            layers.push(home.join("config.toml"));
        }
        let project_dir = Path::new(".bookdesk");
        layers.push(project_dir.join("config.toml"));
        // should be gitignored
        layers.push(project_dir.join("config.local.toml"));

        Self::load_layered(&layers)
    }

    /// Merge every existing file in `layers`, later files taking priority
    pub fn load_layered(layers: &[PathBuf]) -> Result<Self> {
        let mut config = Self::default();
        for path in layers {
            if path.exists() {
                config.merge(Self::load_from(path)?);
            }
        }
        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Merge another config into this one (other takes priority for every field it sets)
    pub fn merge(&mut self, other: Config) {
        if other.api.base_url.is_some() {
            self.api.base_url = other.api.base_url;
        }
        if other.api.timeout_ms.is_some() {
            self.api.timeout_ms = other.api.timeout_ms;
        }
        if other.storage.path.is_some() {
            self.storage.path = other.storage.path;
        }
        if other.logging.enabled.is_some() {
            self.logging.enabled = other.logging.enabled;
        }
        if other.logging.dir.is_some() {
            self.logging.dir = other.logging.dir;
        }
    }

    pub fn base_url(&self) -> &str {
        self.api.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn timeout_ms(&self) -> u64 {
        self.api.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS)
    }

    /// Storage file, defaulting to ~/.bookdesk/storage.json
    pub fn storage_path(&self) -> PathBuf {
        self.storage
            .path
            .clone()
            .unwrap_or_else(crate::storage::FileStorage::default_path)
    }

    pub fn logging_enabled(&self) -> bool {
        self.logging.enabled.unwrap_or(true)
    }

    /// Transcript directory, defaulting to ~/.bookdesk/sessions
    pub fn transcripts_dir(&self) -> PathBuf {
        self.logging.dir.clone().unwrap_or_else(|| {
            bookdesk_home()
                .unwrap_or_else(|| PathBuf::from(".bookdesk"))
                .join("sessions")
        })
    }

    /// Validate configuration and return any errors found
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        let base_url = self.base_url();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            errors.push(ValidationError {
                field: "api.base_url".to_string(),
                message: format!("Expected an http(s) URL, got '{}'", base_url),
            });
        }

        if self.timeout_ms() == 0 {
            errors.push(ValidationError {
                field: "api.timeout_ms".to_string(),
                message: "Must be greater than 0".to_string(),
            });
        }

        if let Some(path) = &self.storage.path {
            if path.as_os_str().is_empty() {
                errors.push(ValidationError {
                    field: "storage.path".to_string(),
                    message: "Must not be empty".to_string(),
                });
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
