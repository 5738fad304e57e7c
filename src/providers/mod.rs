//! Provider module for Promptbench
//!
//! This module contains the model backend abstraction and implementations
//! for the playground HTTP backend and Ollama.

pub mod backend;
pub mod base;
pub mod ollama;

pub use backend::{BackendProvider, RagAnswer, RagSource};
pub use base::{ChatTurn, CompletionRequest, CompletionResponse, PromptInput, Provider};
pub use ollama::OllamaProvider;

use crate::config::ProviderConfig;
use crate::error::{PromptbenchError, Result};
use std::sync::Arc;

/// Create a provider instance based on configuration
///
/// # Arguments
///
/// * `config` - Provider configuration
///
/// # Returns
///
/// Returns a shared provider instance
///
/// # Errors
///
/// Returns error if provider type is invalid or initialization fails
///
/// # Examples
///
/// ```
/// use promptbench::config::Config;
/// use promptbench::providers::create_provider;
///
/// let config = Config::default();
/// let provider = create_provider(&config.provider).unwrap();
/// assert_eq!(provider.name(), "backend");
/// ```
pub fn create_provider(config: &ProviderConfig) -> Result<Arc<dyn Provider>> {
    match config.provider_type.as_str() {
        "backend" => Ok(Arc::new(BackendProvider::new(
            config.backend.clone(),
            config.timeout_seconds,
        )?)),
        "ollama" => Ok(Arc::new(OllamaProvider::new(
            config.ollama.clone(),
            config.timeout_seconds,
        )?)),
        other => Err(PromptbenchError::Provider(format!("Unknown provider type: {}", other)).into()),
    }
}
