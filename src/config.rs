//! Configuration loading
//!
//! Values come from a YAML file with environment variable overrides. The
//! completion endpoint's base URL and model are mandatory; the server
//! refuses to start without them.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable naming the config file
pub const CONFIG_PATH_ENV: &str = "CHAT_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("Missing required setting: {0}")]
    Missing(&'static str),
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub ollama: OllamaConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Completion endpoint settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OllamaConfig {
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub model: String,
}

/// HTTP server and storage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
    /// File holding the fixed system instruction
    #[serde(default = "default_prompt_path")]
    pub prompt_path: PathBuf,
    /// Upper bound on a single completion call
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_port() -> u16 {
    8081
}

fn default_db_path() -> PathBuf {
    PathBuf::from("chat_history.db")
}

fn default_prompt_path() -> PathBuf {
    PathBuf::from("prompt.md")
}

fn default_request_timeout_secs() -> u64 {
    120
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            db_path: default_db_path(),
            prompt_path: default_prompt_path(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Config {
    /// Load configuration using the process environment
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::resolve(Path::new(&path), |key| std::env::var(key).ok())
    }

    /// Resolve configuration from `path` and an environment lookup.
    ///
    /// The file is only consulted when the environment leaves the base URL
    /// or model unset; environment values always win over file values.
    pub fn resolve<F>(path: &Path, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let needs_file = env("OLLAMA_BASE_URL").is_none() || env("OLLAMA_MODEL").is_none();
        let mut config = if needs_file {
            Self::from_file(path)?
        } else {
            Self::default()
        };

        config.apply_env(env);
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    fn apply_env<F>(&mut self, env: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(base_url) = env("OLLAMA_BASE_URL") {
            self.ollama.base_url = base_url;
        }
        if let Some(model) = env("OLLAMA_MODEL") {
            self.ollama.model = model;
        }
        if let Some(port) = env("CHAT_PORT") {
            match port.parse() {
                Ok(value) => self.server.port = value,
                Err(_) => tracing::warn!(value = %port, "Invalid CHAT_PORT, keeping {}", self.server.port),
            }
        }
        if let Some(db_path) = env("CHAT_DB_PATH") {
            self.server.db_path = PathBuf::from(db_path);
        }
        if let Some(prompt_path) = env("CHAT_PROMPT_PATH") {
            self.server.prompt_path = PathBuf::from(prompt_path);
        }
        if let Some(timeout) = env("CHAT_REQUEST_TIMEOUT_SECS") {
            match timeout.parse() {
                Ok(value) => self.server.request_timeout_secs = value,
                Err(_) => tracing::warn!(value = %timeout, "Invalid CHAT_REQUEST_TIMEOUT_SECS"),
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.ollama.base_url.trim().is_empty() {
            return Err(ConfigError::Missing("ollama.base_url (OLLAMA_BASE_URL)"));
        }
        if self.ollama.model.trim().is_empty() {
            return Err(ConfigError::Missing("ollama.model (OLLAMA_MODEL)"));
        }
        Ok(())
    }
}
