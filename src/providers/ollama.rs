//! Ollama provider implementation for Promptbench
//!
//! Connects to a local or remote Ollama server. The model is chosen per
//! request, so one provider instance can serve every branch of a comparison.

use crate::config::OllamaConfig;
use crate::error::{PromptbenchError, Result};
use crate::models::{ModelConfig, ModelProvider, Role, TokenUsage};
use crate::providers::{CompletionRequest, CompletionResponse, Provider};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Ollama API provider
///
/// # Examples
///
/// ```no_run
/// use promptbench::config::OllamaConfig;
/// use promptbench::models::SamplingParams;
/// use promptbench::providers::{CompletionRequest, OllamaProvider, Provider};
///
/// # async fn example() -> promptbench::error::Result<()> {
/// let provider = OllamaProvider::new(OllamaConfig::default(), 120)?;
/// let request = CompletionRequest::prompt("llama3.2:latest", "Hello!", SamplingParams::default());
/// let response = provider.complete(&request).await?;
/// println!("{}", response.content);
/// # Ok(())
/// # }
/// ```
pub struct OllamaProvider {
    client: Client,
    config: OllamaConfig,
}

/// Response from Ollama's /api/tags endpoint
#[derive(Debug, Deserialize)]
struct OllamaTagsResponse {
    models: Vec<OllamaModelTag>,
}

/// Model metadata from /api/tags
#[derive(Debug, Deserialize)]
struct OllamaModelTag {
    name: String,
}

/// Request structure for Ollama API
#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    stream: bool,
    options: OllamaOptions,
}

/// Sampling options for Ollama API
#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

/// Message structure for Ollama API
#[derive(Debug, Serialize, Deserialize)]
struct OllamaMessage {
    role: String,
    #[serde(default)]
    content: String,
}

/// Response structure from Ollama API
#[derive(Debug, Deserialize)]
struct OllamaResponse {
    message: OllamaMessage,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    prompt_eval_count: u64,
    #[serde(default)]
    eval_count: u64,
}

impl OllamaProvider {
    /// Create a new Ollama provider instance
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails
    ///
    /// # Examples
    ///
    /// ```
    /// use promptbench::config::OllamaConfig;
    /// use promptbench::providers::OllamaProvider;
    ///
    /// let provider = OllamaProvider::new(OllamaConfig::default(), 60);
    /// assert!(provider.is_ok());
    /// ```
    pub fn new(config: OllamaConfig, timeout_seconds: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .user_agent(concat!("promptbench/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                PromptbenchError::Provider(format!("Failed to create HTTP client: {}", e))
            })?;

        tracing::info!("Initialized Ollama provider: host={}", config.host);

        Ok(Self { client, config })
    }

    /// Get the configured Ollama host
    pub fn host(&self) -> &str {
        &self.config.host
    }

    /// Convert a request into Ollama chat messages
    fn convert_messages(&self, request: &CompletionRequest) -> Vec<OllamaMessage> {
        request
            .turns()
            .into_iter()
            .map(|turn| OllamaMessage {
                role: turn.role.as_str().to_string(),
                content: turn.content,
            })
            .collect()
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
        let url = format!("{}/api/chat", self.config.host.trim_end_matches('/'));

        let ollama_request = OllamaRequest {
            model: request.model.clone(),
            messages: self.convert_messages(request),
            stream: false,
            options: OllamaOptions {
                temperature: request.params.temperature,
                num_predict: request.params.max_tokens,
            },
        };

        tracing::debug!(
            "Sending Ollama request: model={}, {} messages",
            ollama_request.model,
            ollama_request.messages.len()
        );

        let response = self
            .client
            .post(&url)
            .json(&ollama_request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Ollama request failed: {}", e);
                PromptbenchError::Provider(format!("Ollama request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("Ollama returned error {}: {}", status, error_text);
            return Err(PromptbenchError::Provider(format!(
                "Ollama returned error {}: {}",
                status, error_text
            ))
            .into());
        }

        let ollama_response: OllamaResponse = response.json().await.map_err(|e| {
            tracing::error!("Failed to parse Ollama response: {}", e);
            PromptbenchError::Provider(format!("Failed to parse Ollama response: {}", e))
        })?;

        tracing::debug!(
            "Ollama response: done={}, prompt_tokens={}, completion_tokens={}",
            ollama_response.done,
            ollama_response.prompt_eval_count,
            ollama_response.eval_count
        );

        if ollama_response.message.role != Role::Assistant.as_str() {
            tracing::warn!(
                "Ollama replied with unexpected role: {}",
                ollama_response.message.role
            );
        }

        let content = ollama_response.message.content;
        let response = if ollama_response.prompt_eval_count > 0 || ollama_response.eval_count > 0
        {
            let usage = TokenUsage::new(
                ollama_response.prompt_eval_count,
                ollama_response.eval_count,
            );
            CompletionResponse::with_usage(content, usage)
        } else {
            CompletionResponse::new(content)
        };

        Ok(response)
    }

    async fn list_models(&self) -> Result<Vec<ModelConfig>> {
        let url = format!("{}/api/tags", self.config.host.trim_end_matches('/'));
        tracing::debug!("Fetching models from Ollama: {}", url);

        let response = self.client.get(&url).send().await.map_err(|e| {
            tracing::warn!("Failed to fetch Ollama models: {}", e);
            PromptbenchError::Provider(format!("Failed to connect to Ollama server: {}", e))
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(PromptbenchError::Provider(format!(
                "Ollama returned error {}: {}",
                status, error_text
            ))
            .into());
        }

        let tags: OllamaTagsResponse = response.json().await.map_err(|e| {
            PromptbenchError::Provider(format!("Failed to parse Ollama response: {}", e))
        })?;

        Ok(tags
            .models
            .into_iter()
            .map(|tag| ModelConfig {
                display_name: tag.name.clone(),
                max_tokens: get_context_window_for_model(&tag.name),
                name: tag.name,
                provider: ModelProvider::Ollama,
                supports_streaming: true,
            })
            .collect())
    }
}

/// Get context window size for a model based on its name
fn get_context_window_for_model(model_name: &str) -> u32 {
    if model_name.contains("70b")
        || model_name.contains("mistral")
        || model_name.contains("neural-chat")
    {
        8192
    } else {
        4096
    }
}
