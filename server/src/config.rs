use std::path::{Path, PathBuf};
use std::time::Duration;

use connect4_engine::SessionConfig;
use serde::{Deserialize, Serialize};

pub const CONFIG_ENV: &str = "CONNECT4_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "connect4.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("config validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub static_dir: PathBuf,
    pub log_filter: String,
    /// Games untouched for this long are dropped.
    pub idle_ttl_secs: u64,
    pub sweep_interval_secs: u64,
    pub session: SessionConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:3000".to_string(),
            static_dir: PathBuf::from("web/dist"),
            log_filter: "info,tower_http=debug".to_string(),
            idle_ttl_secs: 1800,
            sweep_interval_secs: 60,
            session: SessionConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: ServerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml(&content)
    }

    /// Falls back to defaults when the file does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// `$CONNECT4_CONFIG`, else `connect4.toml` in the working directory.
    pub fn path_from_env() -> PathBuf {
        std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    pub fn idle_ttl(&self) -> Duration {
        Duration::from_secs(self.idle_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bind.trim().is_empty() {
            return Err(ConfigError::Validation("bind must not be empty".into()));
        }
        if self.idle_ttl_secs == 0 {
            return Err(ConfigError::Validation("idle_ttl_secs must be greater than 0".into()));
        }
        if self.sweep_interval_secs == 0 {
            return Err(ConfigError::Validation(
                "sweep_interval_secs must be greater than 0".into(),
            ));
        }
        self.session
            .validate()
            .map_err(|e| ConfigError::Validation(format!("session.search: {e}")))?;
        if self.session.labels.a == self.session.labels.b {
            return Err(ConfigError::Validation(
                "session.labels.a and session.labels.b must differ".into(),
            ));
        }
        Ok(())
    }
}
