//! Base provider trait and request/response types for Promptbench
//!
//! This module defines the Provider trait that every model backend must
//! implement. The session store treats a provider as an opaque, possibly slow,
//! possibly failing collaborator.

use crate::error::{PromptbenchError, Result};
use crate::models::{Message, ModelConfig, Role, SamplingParams, TokenUsage};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Role/content pair sent to a backend as chat history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    /// Author role
    pub role: Role,
    /// Message text
    pub content: String,
}

impl From<&Message> for ChatTurn {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role,
            content: message.content.clone(),
        }
    }
}

/// What the backend should generate from
#[derive(Debug, Clone, PartialEq)]
pub enum PromptInput {
    /// A single free-standing prompt
    Text(String),
    /// Full conversation history, oldest first
    Chat(Vec<ChatTurn>),
}

/// A single invocation request
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Model identifier
    pub model: String,
    /// Prompt or history
    pub input: PromptInput,
    /// Sampling parameters
    pub params: SamplingParams,
}

impl CompletionRequest {
    /// Build a single-prompt request
    ///
    /// # Examples
    ///
    /// ```
    /// use promptbench::models::SamplingParams;
    /// use promptbench::providers::{CompletionRequest, PromptInput};
    ///
    /// let req = CompletionRequest::prompt("gpt-4", "Hello", SamplingParams::default());
    /// assert_eq!(req.input, PromptInput::Text("Hello".to_string()));
    /// ```
    pub fn prompt(
        model: impl Into<String>,
        prompt: impl Into<String>,
        params: SamplingParams,
    ) -> Self {
        Self {
            model: model.into(),
            input: PromptInput::Text(prompt.into()),
            params,
        }
    }

    /// Build a chat request from stored conversation messages
    pub fn chat(model: impl Into<String>, history: &[Message], params: SamplingParams) -> Self {
        Self {
            model: model.into(),
            input: PromptInput::Chat(history.iter().map(ChatTurn::from).collect()),
            params,
        }
    }

    /// Flatten the input into chat turns
    ///
    /// A text prompt becomes a single user turn.
    pub fn turns(&self) -> Vec<ChatTurn> {
        match &self.input {
            PromptInput::Text(text) => vec![ChatTurn {
                role: Role::User,
                content: text.clone(),
            }],
            PromptInput::Chat(turns) => turns.clone(),
        }
    }
}

/// Generated text with optional token usage
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionResponse {
    /// Generated text
    pub content: String,
    /// Token usage, when the backend reports it
    pub usage: Option<TokenUsage>,
}

impl CompletionResponse {
    /// Create a response without usage information
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            usage: None,
        }
    }

    /// Create a response with token usage
    ///
    /// # Examples
    ///
    /// ```
    /// use promptbench::models::TokenUsage;
    /// use promptbench::providers::CompletionResponse;
    ///
    /// let response = CompletionResponse::with_usage("Hello!", TokenUsage::new(100, 50));
    /// assert_eq!(response.usage.unwrap().total, 150);
    /// ```
    pub fn with_usage(content: impl Into<String>, usage: TokenUsage) -> Self {
        Self {
            content: content.into(),
            usage: Some(usage),
        }
    }
}

/// Provider trait for model backends
///
/// # Examples
///
/// ```no_run
/// use promptbench::providers::{CompletionRequest, CompletionResponse, Provider};
/// use promptbench::error::Result;
/// use async_trait::async_trait;
///
/// struct EchoProvider;
///
/// #[async_trait]
/// impl Provider for EchoProvider {
///     fn name(&self) -> &str {
///         "echo"
///     }
///
///     async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
///         Ok(CompletionResponse::new(format!("{:?}", request.input)))
///     }
/// }
/// ```
#[async_trait]
pub trait Provider: Send + Sync {
    /// Short provider name used in logs
    fn name(&self) -> &str;

    /// Generate text for the request
    ///
    /// # Errors
    ///
    /// Returns error if the backend is unreachable, rejects the request, or
    /// replies with an unparseable body
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse>;

    /// List models the backend can serve
    ///
    /// # Default Implementation
    ///
    /// Returns an error indicating that model listing is not supported.
    async fn list_models(&self) -> Result<Vec<ModelConfig>> {
        Err(PromptbenchError::Provider(format!(
            "Model listing is not supported by the {} provider",
            self.name()
        ))
        .into())
    }
}
