
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub const DEFAULT_MIN_CONTENT_CHARS: usize = 500;
pub const DEFAULT_TOP_K: usize = 3;
pub const DEFAULT_MAX_DOCUMENTS: usize = 5;

const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default = "ProviderConfig::default_embedding")]
    pub embedding: ProviderConfig,
    #[serde(default = "ProviderConfig::default_completion")]
    pub completion: ProviderConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(skip)]
    pub base_dir: PathBuf,
}

/// Connection settings for one externally hosted model service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderConfig {
    /// Base URL of an OpenAI-compatible API, e.g. `https://api.mistral.ai/v1/`
    pub base_url: Url,
    pub model: String,
    /// Name of the environment variable holding the API key. Empty disables auth.
    #[serde(default)]
    pub api_key_env: String,
    /// Upper bound on one whole request, from connecting until the last
    /// byte of the body. For `[completion]` this includes the entire
    /// streamed answer, so a slow model that is still writing when it
    /// expires yields a cut-off answer.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Pages whose trimmed content is shorter than this score zero
    pub min_content_chars: usize,
    pub top_k: usize,
    /// Upper bound on documents searched by one question
    pub max_documents: usize,
    /// Expected embedding length; checked against the corpus when set
    pub embedding_dimension: Option<usize>,
}

impl Default for RetrievalConfig {
    #[inline]
    fn default() -> Self {
        Self {
            min_content_chars: DEFAULT_MIN_CONTENT_CHARS,
            top_k: DEFAULT_TOP_K,
            max_documents: DEFAULT_MAX_DOCUMENTS,
            embedding_dimension: None,
        }
    }
}

const fn default_timeout_seconds() -> u64 {
    30
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found or could not be created")]
    DirectoryError,
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Invalid protocol: {0} (must be 'http' or 'https')")]
    InvalidProtocol(String),
    #[error("Invalid model name: {0} (cannot be empty)")]
    InvalidModel(String),
    #[error("Invalid timeout: {0} (must be between 1 and 600 seconds)")]
    InvalidTimeout(u64),
    #[error("Invalid top-k: {0} (must be between 1 and 50)")]
    InvalidTopK(usize),
    #[error("Invalid max documents: {0} (must be between 1 and 20)")]
    InvalidMaxDocuments(usize),
    #[error("Invalid embedding dimension: {0} (must be between 1 and 8192)")]
    InvalidEmbeddingDimension(usize),
    #[error("Environment variable {0} is not set")]
    MissingApiKey(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Default for Config {
    #[inline]
    fn default() -> Self {
        Self {
            embedding: ProviderConfig::default_embedding(),
            completion: ProviderConfig::default_completion(),
            retrieval: RetrievalConfig::default(),
            base_dir: Self::config_dir().unwrap_or_default(),
        }
    }
}

impl Config {
    /// Directory holding `config.toml`, `~/.report-search` by default
    #[inline]
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        dirs::home_dir()
            .map(|home| home.join(".report-search"))
            .or_else(|| dirs::data_dir().map(|data| data.join("report-search")))
            .ok_or(ConfigError::DirectoryError)
    }

    /// Load from the default configuration directory
    #[inline]
    pub fn load() -> Result<Self> {
        let config_dir = Self::config_dir().context("Failed to determine config directory")?;
        Self::load_from(config_dir)
    }

    #[inline]
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            return Ok(Self {
                base_dir: config_dir.as_ref().to_path_buf(),
                ..Self::default()
            });
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;
        config.base_dir = config_dir.as_ref().to_path_buf();

        config
            .validate()
            .with_context(|| "Configuration validation failed")?;

        Ok(config)
    }

    #[inline]
    pub fn save(&self) -> Result<()> {
        self.validate()
            .context("Configuration validation failed before saving")?;

        fs::create_dir_all(&self.base_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                self.base_dir.display()
            )
        })?;

        let config_path = self.config_file_path();
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    #[inline]
    pub fn config_file_path(&self) -> PathBuf {
        self.base_dir.join(CONFIG_FILE_NAME)
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.embedding.validate()?;
        self.completion.validate()?;
        self.retrieval.validate()?;
        Ok(())
    }
}

impl ProviderConfig {
    /// Mistral embeddings, as used when the corpus pages were embedded
    #[inline]
    pub fn default_embedding() -> Self {
        Self {
            base_url: Url::parse("https://api.mistral.ai/v1/").expect("static URL is valid"),
            model: "mistral-embed".to_string(),
            api_key_env: "MISTRAL_API_KEY".to_string(),
            timeout_seconds: default_timeout_seconds(),
        }
    }

    #[inline]
    pub fn default_completion() -> Self {
        Self {
            base_url: Url::parse("https://api.openai.com/v1/").expect("static URL is valid"),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_seconds: 120,
        }
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        let scheme = self.base_url.scheme();
        if scheme != "http" && scheme != "https" {
            return Err(ConfigError::InvalidProtocol(scheme.to_string()));
        }

        if self.base_url.cannot_be_a_base() || self.base_url.host_str().is_none() {
            return Err(ConfigError::InvalidUrl(self.base_url.to_string()));
        }

        if self.model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.model.clone()));
        }

        if !(1..=600).contains(&self.timeout_seconds) {
            return Err(ConfigError::InvalidTimeout(self.timeout_seconds));
        }

        Ok(())
    }

    #[inline]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Resolve the API key from the configured environment variable
    #[inline]
    pub fn api_key(&self) -> Result<Option<String>, ConfigError> {
        let name = self.api_key_env.trim();
        if name.is_empty() {
            return Ok(None);
        }

        match env::var(name) {
            Ok(key) if !key.trim().is_empty() => Ok(Some(key.trim().to_string())),
            _ => Err(ConfigError::MissingApiKey(name.to_string())),
        }
    }

    pub fn set_base_url(&mut self, base_url: &str) -> Result<(), ConfigError> {
        let parsed =
            Url::parse(base_url).map_err(|_| ConfigError::InvalidUrl(base_url.to_string()))?;
        let candidate = Self {
            base_url: parsed,
            ..self.clone()
        };
        candidate.validate()?;
        self.base_url = candidate.base_url;
        Ok(())
    }

    pub fn set_model(&mut self, model: String) -> Result<(), ConfigError> {
        if model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(model));
        }
        self.model = model;
        Ok(())
    }

    pub fn set_timeout_seconds(&mut self, timeout_seconds: u64) -> Result<(), ConfigError> {
        if !(1..=600).contains(&timeout_seconds) {
            return Err(ConfigError::InvalidTimeout(timeout_seconds));
        }
        self.timeout_seconds = timeout_seconds;
        Ok(())
    }
}

impl RetrievalConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=50).contains(&self.top_k) {
            return Err(ConfigError::InvalidTopK(self.top_k));
        }

        if !(1..=20).contains(&self.max_documents) {
            return Err(ConfigError::InvalidMaxDocuments(self.max_documents));
        }

        match self.embedding_dimension {
            Some(dimension) if !(1..=8192).contains(&dimension) => {
                return Err(ConfigError::InvalidEmbeddingDimension(dimension));
            }
            _ => {}
        }

        Ok(())
    }

    pub fn set_top_k(&mut self, top_k: usize) -> Result<(), ConfigError> {
        if !(1..=50).contains(&top_k) {
            return Err(ConfigError::InvalidTopK(top_k));
        }
        self.top_k = top_k;
        Ok(())
    }

    pub fn set_max_documents(&mut self, max_documents: usize) -> Result<(), ConfigError> {
        if !(1..=20).contains(&max_documents) {
            return Err(ConfigError::InvalidMaxDocuments(max_documents));
        }
        self.max_documents = max_documents;
        Ok(())
    }
}
