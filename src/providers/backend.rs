//! Playground backend provider
//!
//! Talks to the HTTP service that fronts the hosted model vendors. Prompt and
//! chat calls share one reply shape; the service also exposes retrieval
//! augmented queries, a health check, and its model list.

use crate::config::BackendConfig;
use crate::error::{PromptbenchError, Result};
use crate::models::{ModelConfig, ModelProvider, TokenUsage};
use crate::providers::{ChatTurn, CompletionRequest, CompletionResponse, PromptInput, Provider};

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// HTTP playground backend provider
pub struct BackendProvider {
    client: Client,
    config: BackendConfig,
}

#[derive(Debug, Serialize)]
struct ExecuteRequest<'a> {
    prompt: &'a str,
    model: &'a str,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    messages: Vec<ChatTurn>,
    model: &'a str,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    content: String,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
    #[serde(default)]
    total_tokens: Option<u64>,
}

impl From<ApiUsage> for TokenUsage {
    fn from(usage: ApiUsage) -> Self {
        match usage.total_tokens {
            Some(total) => {
                TokenUsage::with_total(usage.prompt_tokens, usage.completion_tokens, total)
            }
            None => TokenUsage::new(usage.prompt_tokens, usage.completion_tokens),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    models: Vec<String>,
}

#[derive(Debug, Serialize)]
struct RagRequest<'a> {
    query: &'a str,
    top_k: usize,
    model: &'a str,
}

#[derive(Debug, Deserialize)]
struct RagApiResponse {
    answer: String,
    #[serde(default)]
    sources: Vec<RagSource>,
}

/// Retrieved passage backing a RAG answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagSource {
    /// Passage text
    pub content: String,
    /// Arbitrary metadata attached at indexing time
    #[serde(default)]
    pub metadata: serde_json::Value,
    /// Similarity score
    #[serde(default)]
    pub score: f64,
}

/// Answer to a retrieval augmented query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagAnswer {
    /// Generated answer
    pub answer: String,
    /// Passages the answer was grounded on, best first
    pub sources: Vec<RagSource>,
    /// Model that generated the answer
    pub model: String,
    /// Round-trip latency in milliseconds
    pub latency_ms: u64,
}

impl BackendProvider {
    /// Create a new backend provider
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails
    pub fn new(config: BackendConfig, timeout_seconds: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .user_agent(concat!("promptbench/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                PromptbenchError::Provider(format!("Failed to create HTTP client: {}", e))
            })?;

        tracing::info!("Initialized backend provider: base_url={}", config.base_url);

        Ok(Self { client, config })
    }

    /// Base URL of the service
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn endpoint(&self, route: &str) -> String {
        format!("{}/api/{}", self.config.base_url.trim_end_matches('/'), route)
    }

    async fn read_json<T: DeserializeOwned>(route: &str, response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("Backend /api/{} returned {}: {}", route, status, error_text);
            return Err(PromptbenchError::Provider(format!(
                "Backend returned error {}: {}",
                status, error_text
            ))
            .into());
        }

        response.json::<T>().await.map_err(|e| {
            tracing::error!("Failed to parse backend /api/{} response: {}", route, e);
            PromptbenchError::Provider(format!("Failed to parse backend response: {}", e)).into()
        })
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        route: &str,
        body: &B,
    ) -> Result<T> {
        let response = self
            .client
            .post(self.endpoint(route))
            .json(body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Backend request to /api/{} failed: {}", route, e);
                PromptbenchError::Provider(format!("Backend request failed: {}", e))
            })?;
        Self::read_json(route, response).await
    }

    /// Check the service health endpoint
    ///
    /// # Returns
    ///
    /// Returns `true` when the service answers with a success status
    pub async fn health(&self) -> bool {
        match self.client.get(self.endpoint("health")).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!("Backend health check failed: {}", e);
                false
            }
        }
    }

    /// Ask a question answered from the service's document index
    ///
    /// # Arguments
    ///
    /// * `query` - Question text
    /// * `top_k` - Number of passages to retrieve
    /// * `model` - Model that writes the answer
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the reply cannot be parsed
    pub async fn rag_query(&self, query: &str, top_k: usize, model: &str) -> Result<RagAnswer> {
        let start = Instant::now();
        let reply: RagApiResponse = self
            .post(
                "rag",
                &RagRequest {
                    query,
                    top_k,
                    model,
                },
            )
            .await?;

        Ok(RagAnswer {
            answer: reply.answer,
            sources: reply.sources,
            model: model.to_string(),
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }
}

#[async_trait]
impl Provider for BackendProvider {
    fn name(&self) -> &str {
        "backend"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
        tracing::debug!("Sending backend request: model={}", request.model);

        let reply: ApiResponse = match &request.input {
            PromptInput::Text(prompt) => {
                self.post(
                    "execute",
                    &ExecuteRequest {
                        prompt,
                        model: &request.model,
                        temperature: request.params.temperature,
                        max_tokens: request.params.max_tokens,
                    },
                )
                .await?
            }
            PromptInput::Chat(turns) => {
                self.post(
                    "chat",
                    &ChatRequest {
                        messages: turns.clone(),
                        model: &request.model,
                    },
                )
                .await?
            }
        };

        Ok(CompletionResponse {
            content: reply.content,
            usage: reply.usage.map(TokenUsage::from),
        })
    }

    async fn list_models(&self) -> Result<Vec<ModelConfig>> {
        let response = self
            .client
            .get(self.endpoint("models"))
            .send()
            .await
            .map_err(|e| {
                PromptbenchError::Provider(format!("Failed to connect to backend: {}", e))
            })?;
        let reply: ModelsResponse = Self::read_json("models", response).await?;

        Ok(reply
            .models
            .into_iter()
            .map(|name| ModelConfig {
                provider: infer_vendor(&name),
                display_name: name.clone(),
                max_tokens: 4096,
                name,
                supports_streaming: false,
            })
            .collect())
    }
}

/// Guess the vendor from a model name
fn infer_vendor(name: &str) -> ModelProvider {
    if name.starts_with("gpt") || name.starts_with("o1") {
        ModelProvider::OpenAi
    } else if name.starts_with("claude") {
        ModelProvider::Anthropic
    } else if name.starts_with("gemini") {
        ModelProvider::Google
    } else {
        ModelProvider::HuggingFace
    }
}
