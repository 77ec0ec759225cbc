use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;
use url::Url;

use crate::chunker::SplitterConfig;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    /// Override for the data directory; defaults to `~/.docchat`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_dir: Option<PathBuf>,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub openai: OpenAiConfig,
    #[serde(default)]
    pub gemini: GeminiConfig,
    #[serde(default)]
    pub chunking: SplitterConfig,
}

/// Where the vector index lives: an on-disk LanceDB directory under the base
/// dir, or a remote LanceDB URI. The store contract is identical in both modes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct StorageConfig {
    #[serde(default)]
    pub mode: StorageMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_uri: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageMode {
    #[default]
    Embedded,
    Remote,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingConfig {
    /// Falls back to `openai.api_key` when empty.
    #[serde(default)]
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub dimension: usize,
    pub batch_size: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OpenAiConfig {
    #[serde(default)]
    pub api_key: String,
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeminiConfig {
    #[serde(default)]
    pub api_key: String,
    pub base_url: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found or could not be created")]
    DirectoryError,
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),
    #[error("Invalid batch size: {0} (must be between 1 and 1000)")]
    InvalidBatchSize(u32),
    #[error("Invalid embedding dimension: {0} (must be greater than 0)")]
    InvalidDimension(usize),
    #[error("Invalid model name: {0} (cannot be empty)")]
    InvalidModel(String),
    #[error("Invalid chunking parameters: {0}")]
    InvalidChunking(String),
    #[error("Remote storage mode requires storage.remote_uri to be set")]
    MissingRemoteUri,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl EmbeddingConfig {
    /// Key to use for embedding requests, falling back to the OpenAI chat key.
    #[inline]
    pub fn resolved_api_key(&self, openai: &OpenAiConfig) -> Option<String> {
        if !self.api_key.is_empty() {
            Some(self.api_key.clone())
        } else if !openai.api_key.is_empty() {
            Some(openai.api_key.clone())
        } else {
            None
        }
    }
}

impl Default for EmbeddingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.openai.com".to_string(),
            model: "text-embedding-3-small".to_string(),
            dimension: 1536,
            batch_size: 64,
        }
    }
}

impl Default for OpenAiConfig {
    #[inline]
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.openai.com".to_string(),
        }
    }
}

impl Default for GeminiConfig {
    #[inline]
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
        }
    }
}

impl Config {
    #[inline]
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        dirs::home_dir()
            .map(|home| home.join(".docchat"))
            .ok_or(ConfigError::DirectoryError)
    }

    #[inline]
    pub fn config_file_path() -> Result<PathBuf, ConfigError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Data directory for the sqlite registry and the embedded vector index.
    #[inline]
    pub fn base_dir(&self) -> Result<PathBuf, ConfigError> {
        match &self.base_dir {
            Some(dir) => Ok(dir.clone()),
            None => Self::config_dir(),
        }
    }

    #[inline]
    pub fn database_path(&self) -> Result<PathBuf, ConfigError> {
        Ok(self.base_dir()?.join("docchat.db"))
    }

    /// LanceDB connection URI for the configured storage mode.
    #[inline]
    pub fn vector_db_uri(&self) -> Result<String, ConfigError> {
        match self.storage.mode {
            StorageMode::Embedded => {
                let path = self.base_dir()?.join("vectors");
                Ok(format!("file://{}", path.display()))
            }
            StorageMode::Remote => self
                .storage
                .remote_uri
                .clone()
                .ok_or(ConfigError::MissingRemoteUri),
        }
    }

    #[inline]
    pub fn load() -> Result<Self> {
        let config_path =
            Self::config_file_path().context("Failed to determine config file path")?;

        let mut config = if config_path.exists() {
            let content = fs::read_to_string(&config_path).with_context(|| {
                format!("Failed to read config file: {}", config_path.display())
            })?;
            toml::from_str(&content).with_context(|| {
                format!("Failed to parse config file: {}", config_path.display())
            })?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        config
            .validate()
            .context("Configuration validation failed")?;

        Ok(config)
    }

    /// API keys may come from the environment instead of the config file.
    #[inline]
    pub fn apply_env_overrides(&mut self) {
        if self.openai.api_key.is_empty() {
            if let Ok(key) = env::var("OPENAI_API_KEY") {
                self.openai.api_key = key;
            }
        }
        if self.gemini.api_key.is_empty() {
            if let Ok(key) = env::var("GEMINI_API_KEY") {
                self.gemini.api_key = key;
            }
        }
        if self.embedding.api_key.is_empty() {
            self.embedding.api_key = self.openai.api_key.clone();
        }
    }

    #[inline]
    pub fn save(&self) -> Result<()> {
        self.validate()
            .context("Configuration validation failed before saving")?;

        let config_dir = Self::config_dir().context("Failed to determine config directory")?;

        fs::create_dir_all(&config_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                config_dir.display()
            )
        })?;

        let config_path = config_dir.join("config.toml");
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.embedding.model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.embedding.model.clone()));
        }
        if self.embedding.batch_size == 0 || self.embedding.batch_size > 1000 {
            return Err(ConfigError::InvalidBatchSize(self.embedding.batch_size));
        }
        if self.embedding.dimension == 0 {
            return Err(ConfigError::InvalidDimension(self.embedding.dimension));
        }
        if self.chunking.chunk_size == 0 {
            return Err(ConfigError::InvalidChunking(
                "chunk_size must be greater than 0".to_string(),
            ));
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(ConfigError::InvalidChunking(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            )));
        }
        if self.storage.mode == StorageMode::Remote && self.storage.remote_uri.is_none() {
            return Err(ConfigError::MissingRemoteUri);
        }

        Self::parse_url(&self.embedding.base_url)?;
        Self::parse_url(&self.openai.base_url)?;
        Self::parse_url(&self.gemini.base_url)?;

        Ok(())
    }

    fn parse_url(url: &str) -> Result<Url, ConfigError> {
        Url::parse(url).map_err(|_| ConfigError::InvalidUrl(url.to_string()))
    }
}
