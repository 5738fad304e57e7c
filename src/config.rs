//! Configuration management for Promptbench
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{PromptbenchError, Result};
use crate::models::{default_catalog, ModelConfig, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure for Promptbench
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Model backend configuration
    pub provider: ProviderConfig,
    /// Durable storage configuration
    #[serde(default)]
    pub storage: StorageConfig,
    /// Default sampling settings
    #[serde(default)]
    pub defaults: DefaultsConfig,
    /// Available-model catalog
    #[serde(default = "default_catalog")]
    pub models: Vec<ModelConfig>,
    /// Log output settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Provider configuration
///
/// Specifies which model backend to use and its settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Type of provider to use
    #[serde(rename = "type")]
    pub provider_type: String,

    /// Request timeout for every backend call (seconds)
    #[serde(default = "default_provider_timeout")]
    pub timeout_seconds: u64,

    /// Ollama configuration
    #[serde(default)]
    pub ollama: OllamaConfig,

    /// Playground backend configuration
    #[serde(default)]
    pub backend: BackendConfig,
}

fn default_provider_timeout() -> u64 {
    120
}

/// Ollama provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// Ollama server host
    #[serde(default = "default_ollama_host")]
    pub host: String,
}

fn default_ollama_host() -> String {
    "http://localhost:11434".to_string()
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: default_ollama_host(),
        }
    }
}

/// HTTP playground backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL the `/api/*` routes hang off
    #[serde(default = "default_backend_url")]
    pub base_url: String,
}

fn default_backend_url() -> String {
    "http://localhost:8000".to_string()
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_backend_url(),
        }
    }
}

/// Durable storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Storage engine: "sled", "sqlite", or "memory"
    #[serde(default = "default_storage_backend")]
    pub backend: String,

    /// Database location; the platform data directory is used when unset
    #[serde(default)]
    pub path: Option<PathBuf>,
}

fn default_storage_backend() -> String {
    "sled".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_storage_backend(),
            path: None,
        }
    }
}

/// Default model and sampling parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Model used when a command does not name one
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum output tokens
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_model() -> String {
    "gpt-4".to_string()
}

fn default_temperature() -> f32 {
    DEFAULT_TEMPERATURE
}

fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

/// Log output configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Emit JSON log lines instead of human-readable text
    #[serde(default)]
    pub json: bool,
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default_config()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn default_config() -> Self {
        Self {
            provider: ProviderConfig {
                provider_type: "backend".to_string(),
                timeout_seconds: default_provider_timeout(),
                ollama: OllamaConfig::default(),
                backend: BackendConfig::default(),
            },
            storage: StorageConfig::default(),
            defaults: DefaultsConfig::default(),
            models: default_catalog(),
            logging: LoggingConfig::default(),
        }
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| PromptbenchError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| PromptbenchError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(provider_type) = std::env::var("PROMPTBENCH_PROVIDER") {
            self.provider.provider_type = provider_type;
        }

        if let Ok(host) = std::env::var("PROMPTBENCH_OLLAMA_HOST") {
            self.provider.ollama.host = host;
        }

        if let Ok(url) = std::env::var("PROMPTBENCH_BACKEND_URL") {
            self.provider.backend.base_url = url;
        }

        if let Ok(backend) = std::env::var("PROMPTBENCH_STORAGE_BACKEND") {
            self.storage.backend = backend;
        }

        if let Ok(path) = std::env::var("PROMPTBENCH_STORAGE_PATH") {
            tracing::debug!(path = %path, "Env override: PROMPTBENCH_STORAGE_PATH");
            self.storage.path = Some(PathBuf::from(path));
        }

        if let Ok(model) = std::env::var("PROMPTBENCH_DEFAULT_MODEL") {
            self.defaults.model = model;
        }

        if let Ok(temperature) = std::env::var("PROMPTBENCH_TEMPERATURE") {
            if let Ok(value) = temperature.parse() {
                self.defaults.temperature = value;
            } else {
                tracing::warn!("Invalid PROMPTBENCH_TEMPERATURE: {}", temperature);
            }
        }

        if let Ok(max_tokens) = std::env::var("PROMPTBENCH_MAX_TOKENS") {
            if let Ok(value) = max_tokens.parse() {
                self.defaults.max_tokens = value;
            } else {
                tracing::warn!("Invalid PROMPTBENCH_MAX_TOKENS: {}", max_tokens);
            }
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if cli.verbose {
            tracing::debug!("Verbose mode enabled");
        }
        if let Some(path) = &cli.storage_path {
            self.storage.path = Some(PathBuf::from(path));
        }
    }

    /// Look up a catalog entry by model name
    pub fn model(&self, name: &str) -> Option<&ModelConfig> {
        self.models.iter().find(|m| m.name == name)
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        let valid_providers = ["ollama", "backend"];
        if !valid_providers.contains(&self.provider.provider_type.as_str()) {
            return Err(PromptbenchError::Config(format!(
                "Invalid provider type: {}. Must be one of: {}",
                self.provider.provider_type,
                valid_providers.join(", ")
            ))
            .into());
        }

        if self.provider.timeout_seconds == 0 {
            return Err(PromptbenchError::Config(
                "provider.timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        let url = match self.provider.provider_type.as_str() {
            "ollama" => &self.provider.ollama.host,
            _ => &self.provider.backend.base_url,
        };
        url::Url::parse(url).map_err(|e| {
            PromptbenchError::Config(format!("Invalid provider URL '{}': {}", url, e))
        })?;

        let valid_storage = ["sled", "sqlite", "memory"];
        if !valid_storage.contains(&self.storage.backend.as_str()) {
            return Err(PromptbenchError::Config(format!(
                "Invalid storage backend: {}. Must be one of: {}",
                self.storage.backend,
                valid_storage.join(", ")
            ))
            .into());
        }

        if self.defaults.model.trim().is_empty() {
            return Err(
                PromptbenchError::Config("defaults.model cannot be empty".to_string()).into(),
            );
        }

        if !(0.0..=2.0).contains(&self.defaults.temperature) {
            return Err(PromptbenchError::Config(
                "defaults.temperature must be between 0.0 and 2.0".to_string(),
            )
            .into());
        }

        if self.defaults.max_tokens == 0 {
            return Err(PromptbenchError::Config(
                "defaults.max_tokens must be greater than 0".to_string(),
            )
            .into());
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.provider.provider_type, "backend");
        assert_eq!(config.storage.backend, "sled");
        assert_eq!(config.defaults.model, "gpt-4");
        assert_eq!(config.defaults.max_tokens, 1000);
        assert_eq!(config.models.len(), 4);
    }

    #[test]
    fn test_config_validation_success() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_config_validation_invalid_provider() {
        let mut config = Config::default();
        config.provider.provider_type = "invalid".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_invalid_storage() {
        let mut config = Config::default();
        config.storage.backend = "redis".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_bad_url() {
        let mut config = Config::default();
        config.provider.backend.base_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_temperature_range() {
        let mut config = Config::default();
        config.defaults.temperature = 2.5;
        assert!(config.validate().is_err());

        config.defaults.temperature = -0.1;
        assert!(config.validate().is_err());

        config.defaults.temperature = 0.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_zero_max_tokens() {
        let mut config = Config::default();
        config.defaults.max_tokens = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_empty_model() {
        let mut config = Config::default();
        config.defaults.model = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_yaml() {
        let yaml = r#"
provider:
  type: ollama
  timeout_seconds: 30
  ollama:
    host: http://gpu-box:11434

storage:
  backend: sqlite
  path: /tmp/promptbench.db

defaults:
  model: llama3.2:latest
  temperature: 0.2
  max_tokens: 512

models:
  - name: llama3.2:latest
    provider: ollama
    display_name: Llama 3.2
    max_tokens: 4096
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.provider.provider_type, "ollama");
        assert_eq!(config.provider.timeout_seconds, 30);
        assert_eq!(config.provider.ollama.host, "http://gpu-box:11434");
        assert_eq!(config.provider.backend.base_url, "http://localhost:8000");
        assert_eq!(config.storage.backend, "sqlite");
        assert_eq!(
            config.storage.path,
            Some(PathBuf::from("/tmp/promptbench.db"))
        );
        assert_eq!(config.defaults.max_tokens, 512);
        assert_eq!(config.models.len(), 1);
        assert!(config.model("llama3.2:latest").is_some());
        assert!(config.model("gpt-4").is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_minimal_yaml_uses_defaults() {
        let yaml = "provider:\n  type: backend\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.storage.backend, "sled");
        assert_eq!(config.defaults.temperature, 0.7);
        assert_eq!(config.models.len(), 4);
        assert!(!config.logging.json);
    }

    #[test]
    fn test_load_nonexistent_file_uses_defaults() {
        let cli = crate::cli::Cli::default();
        let config = Config::load("nonexistent.yaml", &cli).unwrap();
        assert_eq!(config.defaults.model, "gpt-4");
    }

    #[test]
    fn test_cli_storage_path_override() {
        let cli = crate::cli::Cli {
            storage_path: Some("/tmp/override.db".to_string()),
            ..Default::default()
        };
        let config = Config::load("nonexistent.yaml", &cli).unwrap();
        assert_eq!(config.storage.path, Some(PathBuf::from("/tmp/override.db")));
    }

    #[test]
    #[serial]
    fn test_apply_env_vars_overrides() {
        std::env::set_var("PROMPTBENCH_PROVIDER", "ollama");
        std::env::set_var("PROMPTBENCH_TEMPERATURE", "1.1");
        std::env::set_var("PROMPTBENCH_MAX_TOKENS", "not-a-number");

        let mut config = Config::default();
        config.apply_env_vars();

        std::env::remove_var("PROMPTBENCH_PROVIDER");
        std::env::remove_var("PROMPTBENCH_TEMPERATURE");
        std::env::remove_var("PROMPTBENCH_MAX_TOKENS");

        assert_eq!(config.provider.provider_type, "ollama");
        assert_eq!(config.defaults.temperature, 1.1);
        // invalid value ignored
        assert_eq!(config.defaults.max_tokens, 1000);
    }
}
