use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Default HTTP port, matching the portfolio site's Express server
pub const DEFAULT_PORT: u16 = 4267;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub ollama: OllamaConfig,
    pub embedding: EmbeddingConfig,
    pub server: ServerConfig,
    pub content: ContentConfig,
    pub search: SearchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OllamaConfig {
    pub protocol: String,
    pub host: String,
    pub port: u16,
    pub model: String,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderKind {
    #[default]
    Ollama,
    Hashing,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProviderKind,
    /// Vector width for the hashing provider; Ollama models pick their own
    pub dimensions: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ContentConfig {
    /// Directory holding blog.json and portfolio.json
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SearchConfig {
    pub default_top_k: usize,
    pub max_top_k: usize,
    pub query_timeout_ms: u64,
    pub ingest_concurrency: usize,
    pub record_timeout_ms: u64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found or could not be created")]
    DirectoryError,
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),
    #[error("Invalid port: {0} (must be between 1 and 65535)")]
    InvalidPort(u16),
    #[error("Invalid model name: {0} (cannot be empty)")]
    InvalidModel(String),
    #[error("Invalid embedding dimensions: {0} (must be between 8 and 8192)")]
    InvalidDimensions(usize),
    #[error("Invalid top_k: default {default} must be between 1 and max {max}")]
    InvalidTopK { default: usize, max: usize },
    #[error("Invalid ingest concurrency: {0} (must be between 1 and 64)")]
    InvalidConcurrency(usize),
    #[error("Invalid timeout for {name}: must be greater than zero")]
    InvalidTimeout { name: &'static str },
    #[error("Invalid value for environment variable {name}: {value}")]
    InvalidOverride { name: &'static str, value: String },
}

impl Default for OllamaConfig {
    #[inline]
    fn default() -> Self {
        Self {
            protocol: "http".to_string(),
            host: "localhost".to_string(),
            port: 11434,
            model: "nomic-embed-text:latest".to_string(),
        }
    }
}

impl Default for EmbeddingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderKind::Ollama,
            dimensions: 384,
        }
    }
}

impl Default for ServerConfig {
    #[inline]
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl Default for SearchConfig {
    #[inline]
    fn default() -> Self {
        Self {
            default_top_k: 10,
            max_top_k: 50,
            query_timeout_ms: 5_000,
            ingest_concurrency: 4,
            record_timeout_ms: 30_000,
        }
    }
}

impl Config {
    #[inline]
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        dirs::home_dir()
            .map(|home| home.join(".portfolio-search"))
            .or({
                #[cfg(windows)]
                {
                    dirs::data_dir().map(|data| data.join("portfolio-search"))
                }
                #[cfg(not(windows))]
                {
                    None
                }
            })
            .ok_or(ConfigError::DirectoryError)
    }

    #[inline]
    pub fn config_file_path() -> Result<PathBuf, ConfigError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load the user's config file (or defaults) and apply environment overrides
    #[inline]
    pub fn load() -> Result<Self> {
        let config_path =
            Self::config_file_path().context("Failed to determine config file path")?;

        let mut config = Self::load_from(&config_path)?;
        config
            .apply_overrides(|name| std::env::var(name).ok())
            .context("Failed to apply environment overrides")?;

        config
            .validate()
            .with_context(|| "Configuration validation failed")?;

        Ok(config)
    }

    /// Load a config file from an explicit path, falling back to defaults when absent
    #[inline]
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;

        config
            .validate()
            .with_context(|| "Configuration validation failed")?;

        Ok(config)
    }

    /// Apply `PORT` and `PORTFOLIO_DATA_DIR` style overrides from a variable lookup
    #[inline]
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidOverride {
                    name: "PORT",
                    value: port.clone(),
                })?;
        }

        if let Some(dir) = lookup("PORTFOLIO_DATA_DIR") {
            if dir.trim().is_empty() {
                return Err(ConfigError::InvalidOverride {
                    name: "PORTFOLIO_DATA_DIR",
                    value: dir,
                });
            }
            self.content.data_dir = Some(PathBuf::from(dir));
        }

        Ok(())
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.ollama.validate()?;
        self.embedding.validate()?;
        self.server.validate()?;
        self.search.validate()
    }

    #[inline]
    pub fn ollama_url(&self) -> Result<Url, ConfigError> {
        self.ollama.url()
    }

    /// Directory the content sources read from
    #[inline]
    pub fn data_dir(&self) -> PathBuf {
        self.content
            .data_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("data"))
    }

    #[inline]
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.server.host, self.server.port);
        addr.parse().map_err(|_| ConfigError::InvalidUrl(addr))
    }
}

impl OllamaConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::InvalidPort(self.port));
        }

        if self.model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.model.clone()));
        }

        self.url()?;

        Ok(())
    }

    #[inline]
    pub fn url(&self) -> Result<Url, ConfigError> {
        let url_str = format!("{}://{}:{}", self.protocol, self.host, self.port);
        Url::parse(&url_str).map_err(|_| ConfigError::InvalidUrl(url_str))
    }
}

impl EmbeddingConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(8..=8192).contains(&self.dimensions) {
            return Err(ConfigError::InvalidDimensions(self.dimensions));
        }
        Ok(())
    }
}

impl ServerConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::InvalidPort(self.port));
        }
        Ok(())
    }
}

impl SearchConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_top_k == 0 || self.default_top_k > self.max_top_k {
            return Err(ConfigError::InvalidTopK {
                default: self.default_top_k,
                max: self.max_top_k,
            });
        }

        if self.ingest_concurrency == 0 || self.ingest_concurrency > 64 {
            return Err(ConfigError::InvalidConcurrency(self.ingest_concurrency));
        }

        if self.query_timeout_ms == 0 {
            return Err(ConfigError::InvalidTimeout {
                name: "query_timeout_ms",
            });
        }

        if self.record_timeout_ms == 0 {
            return Err(ConfigError::InvalidTimeout {
                name: "record_timeout_ms",
            });
        }

        Ok(())
    }

    #[inline]
    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }

    #[inline]
    pub fn record_timeout(&self) -> Duration {
        Duration::from_millis(self.record_timeout_ms)
    }
}
