//! Core data model for Promptbench
//!
//! Executions, conversations, and comparisons are the three record types the
//! session store owns. All timestamps are UTC and serialize as RFC-3339
//! strings, so a persisted snapshot parses straight back into `DateTime<Utc>`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Default sampling temperature used when the caller does not supply one
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Default maximum output tokens used when the caller does not supply one
pub const DEFAULT_MAX_TOKENS: u32 = 1000;

/// Generate a new record identifier
///
/// ULIDs combine a millisecond timestamp with 80 bits of randomness, so ids
/// are unique within the process and sort by creation time.
///
/// # Examples
///
/// ```
/// use promptbench::models::new_id;
///
/// let a = new_id();
/// let b = new_id();
/// assert_ne!(a, b);
/// assert_eq!(a.len(), 26);
/// ```
pub fn new_id() -> String {
    Ulid::new().to_string()
}

/// Token usage information for one invocation
///
/// Counts are supplied by the model backend; Promptbench never computes them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Number of tokens in the prompt
    pub prompt: u64,
    /// Number of tokens in the completion
    pub completion: u64,
    /// Total tokens used
    pub total: u64,
}

impl TokenUsage {
    /// Create a new TokenUsage with total = prompt + completion
    ///
    /// # Examples
    ///
    /// ```
    /// use promptbench::models::TokenUsage;
    ///
    /// let usage = TokenUsage::new(100, 50);
    /// assert_eq!(usage.total, 150);
    /// ```
    pub fn new(prompt: u64, completion: u64) -> Self {
        Self {
            prompt,
            completion,
            total: prompt + completion,
        }
    }

    /// Create a TokenUsage with an explicit total as reported by a backend
    pub fn with_total(prompt: u64, completion: u64, total: u64) -> Self {
        Self {
            prompt,
            completion,
            total,
        }
    }
}

/// Sampling parameters sent with every invocation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplingParams {
    /// Sampling temperature
    pub temperature: f32,
    /// Maximum output tokens
    pub max_tokens: u32,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

/// One prompt/response round trip against a single model
///
/// Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Execution {
    /// Unique identifier
    pub id: String,
    /// Prompt text sent to the model
    pub prompt: String,
    /// Generated response text
    pub response: String,
    /// Model identifier
    pub model: String,
    /// Sampling parameters used for the call
    #[serde(flatten)]
    pub params: SamplingParams,
    /// When the execution completed
    pub timestamp: DateTime<Utc>,
    /// Wall-clock latency in milliseconds
    pub latency_ms: u64,
    /// Token usage reported by the backend
    pub tokens: TokenUsage,
    /// Free-form labels
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// Author of a conversation message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Message typed by the user
    User,
    /// Message generated by the model
    Assistant,
    /// Instruction message
    System,
}

impl Role {
    /// Wire name of the role
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single entry in a conversation
///
/// `model`, `tokens`, and `latency_ms` are only set on assistant messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique identifier
    pub id: String,
    /// Author role
    pub role: Role,
    /// Message text
    pub content: String,
    /// When the message was created
    pub timestamp: DateTime<Utc>,
    /// Model that generated the message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Total tokens reported for the generating call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens: Option<u64>,
    /// Latency of the generating call in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

impl Message {
    fn with_role(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
            model: None,
            tokens: None,
            latency_ms: None,
        }
    }

    /// Creates a new user message
    ///
    /// # Examples
    ///
    /// ```
    /// use promptbench::models::{Message, Role};
    ///
    /// let msg = Message::user("Hello!");
    /// assert_eq!(msg.role, Role::User);
    /// assert!(msg.tokens.is_none());
    /// ```
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, content)
    }

    /// Creates a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(Role::System, content)
    }

    /// Creates a new assistant message carrying invocation metadata
    ///
    /// # Examples
    ///
    /// ```
    /// use promptbench::models::{Message, Role};
    ///
    /// let msg = Message::assistant("Hi there", "gpt-4", Some(42), 350);
    /// assert_eq!(msg.role, Role::Assistant);
    /// assert_eq!(msg.tokens, Some(42));
    /// assert_eq!(msg.latency_ms, Some(350));
    /// ```
    pub fn assistant(
        content: impl Into<String>,
        model: impl Into<String>,
        tokens: Option<u64>,
        latency_ms: u64,
    ) -> Self {
        Self {
            model: Some(model.into()),
            tokens,
            latency_ms: Some(latency_ms),
            ..Self::with_role(Role::Assistant, content)
        }
    }
}

/// An ordered, append-only multi-turn exchange with one model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    /// Unique identifier
    pub id: String,
    /// Display title
    pub title: String,
    /// Messages in append order
    pub messages: Vec<Message>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
    /// Model shared by every turn
    pub model: String,
    /// Running sum of `tokens` across messages
    pub total_tokens: u64,
}

impl Conversation {
    /// Create an empty conversation
    ///
    /// When no title is given a timestamped label is generated.
    ///
    /// # Examples
    ///
    /// ```
    /// use promptbench::models::Conversation;
    ///
    /// let conv = Conversation::new("gpt-4", None);
    /// assert!(conv.title.starts_with("Conversation "));
    /// assert_eq!(conv.total_tokens, 0);
    ///
    /// let named = Conversation::new("gpt-4", Some("Draft".to_string()));
    /// assert_eq!(named.title, "Draft");
    /// ```
    pub fn new(model: impl Into<String>, title: Option<String>) -> Self {
        let now = Utc::now();
        let title = title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| format!("Conversation {}", now.format("%Y-%m-%d %H:%M:%S")));
        Self {
            id: new_id(),
            title,
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
            model: model.into(),
            total_tokens: 0,
        }
    }

    /// Append a message and update the running token total
    pub fn push_message(&mut self, message: Message) {
        if let Some(tokens) = message.tokens {
            self.total_tokens += tokens;
        }
        self.updated_at = Utc::now();
        self.messages.push(message);
    }

    /// Sum of `tokens` across messages, computed from scratch
    pub fn message_token_sum(&self) -> u64 {
        self.messages.iter().filter_map(|m| m.tokens).sum()
    }
}

/// One prompt evaluated against several models
///
/// `executions[i]` always holds the result for the i-th requested model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    /// Unique identifier
    pub id: String,
    /// Prompt shared by every branch
    pub prompt: String,
    /// Results in requested-model order
    pub executions: Vec<Execution>,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

/// Vendor behind a catalog model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelProvider {
    /// OpenAI hosted models
    OpenAi,
    /// Hugging Face hosted models
    HuggingFace,
    /// Anthropic hosted models
    Anthropic,
    /// Google hosted models
    Google,
    /// Locally served models
    Ollama,
}

impl std::fmt::Display for ModelProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::OpenAi => "openai",
            Self::HuggingFace => "huggingface",
            Self::Anthropic => "anthropic",
            Self::Google => "google",
            Self::Ollama => "ollama",
        };
        f.write_str(name)
    }
}

/// Entry in the available-model catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model identifier sent to the backend
    pub name: String,
    /// Vendor
    pub provider: ModelProvider,
    /// User-facing name
    pub display_name: String,
    /// Maximum output tokens supported
    pub max_tokens: u32,
    /// Whether the backend can stream this model
    #[serde(default)]
    pub supports_streaming: bool,
}

impl ModelConfig {
    fn new(
        name: &str,
        provider: ModelProvider,
        display_name: &str,
        max_tokens: u32,
        supports_streaming: bool,
    ) -> Self {
        Self {
            name: name.to_string(),
            provider,
            display_name: display_name.to_string(),
            max_tokens,
            supports_streaming,
        }
    }
}

/// Built-in model catalog
pub fn default_catalog() -> Vec<ModelConfig> {
    vec![
        ModelConfig::new("gpt-4", ModelProvider::OpenAi, "GPT-4", 8192, true),
        ModelConfig::new(
            "gpt-3.5-turbo",
            ModelProvider::OpenAi,
            "GPT-3.5 Turbo",
            4096,
            true,
        ),
        ModelConfig::new(
            "claude-3-opus",
            ModelProvider::Anthropic,
            "Claude 3 Opus",
            4096,
            true,
        ),
        ModelConfig::new(
            "mistral-7b",
            ModelProvider::HuggingFace,
            "Mistral 7B",
            2048,
            false,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_execution() -> Execution {
        Execution {
            id: new_id(),
            prompt: "Explain ownership".to_string(),
            response: "Ownership is...".to_string(),
            model: "gpt-4".to_string(),
            params: SamplingParams::default(),
            timestamp: Utc::now(),
            latency_ms: 420,
            tokens: TokenUsage::new(12, 88),
            tags: Vec::new(),
        }
    }

    #[test]
    fn test_new_id_is_unique() {
        let ids: std::collections::HashSet<String> = (0..1000).map(|_| new_id()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn test_token_usage_with_total_keeps_reported_total() {
        let usage = TokenUsage::with_total(10, 20, 35);
        assert_eq!(usage.total, 35);
    }

    #[test]
    fn test_sampling_params_default() {
        let params = SamplingParams::default();
        assert_eq!(params.temperature, 0.7);
        assert_eq!(params.max_tokens, 1000);
    }

    #[test]
    fn test_execution_dates_serialize_as_rfc3339() {
        let execution = sample_execution();
        let value = serde_json::to_value(&execution).unwrap();
        let ts = value["timestamp"].as_str().expect("timestamp is a string");
        assert!(DateTime::parse_from_rfc3339(ts).is_ok());
        // flattened sampling params
        assert_eq!(value["max_tokens"], 1000);
        assert!(value.get("tags").is_none());

        let back: Execution = serde_json::from_value(value).unwrap();
        assert_eq!(back, execution);
    }

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Assistant).unwrap(), "\"assistant\"");
        let role: Role = serde_json::from_str("\"system\"").unwrap();
        assert_eq!(role, Role::System);
    }

    #[test]
    fn test_user_message_omits_assistant_fields() {
        let json = serde_json::to_value(Message::user("hi")).unwrap();
        assert!(json.get("model").is_none());
        assert!(json.get("tokens").is_none());
        assert!(json.get("latency_ms").is_none());
    }

    #[test]
    fn test_push_message_tracks_token_total() {
        let mut conv = Conversation::new("gpt-4", None);
        conv.push_message(Message::user("a"));
        conv.push_message(Message::assistant("b", "gpt-4", Some(120), 10));
        conv.push_message(Message::user("c"));
        conv.push_message(Message::assistant("d", "gpt-4", None, 10));
        conv.push_message(Message::assistant("e", "gpt-4", Some(30), 10));
        assert_eq!(conv.total_tokens, 150);
        assert_eq!(conv.total_tokens, conv.message_token_sum());
        assert_eq!(conv.messages.len(), 5);
    }

    #[test]
    fn test_push_message_advances_updated_at() {
        let mut conv = Conversation::new("gpt-4", None);
        let before = conv.updated_at;
        std::thread::sleep(std::time::Duration::from_millis(5));
        conv.push_message(Message::user("a"));
        assert!(conv.updated_at > before);
        assert_eq!(conv.created_at, before);
    }

    #[test]
    fn test_blank_title_falls_back_to_timestamp() {
        let conv = Conversation::new("gpt-4", Some("   ".to_string()));
        assert!(conv.title.starts_with("Conversation "));
    }

    #[test]
    fn test_default_catalog() {
        let catalog = default_catalog();
        assert_eq!(catalog.len(), 4);
        assert_eq!(catalog[0].name, "gpt-4");
        assert_eq!(catalog[2].provider, ModelProvider::Anthropic);
        assert!(!catalog[3].supports_streaming);
    }

    #[test]
    fn test_model_config_from_yaml() {
        let yaml = r#"
name: llama3.2:latest
provider: ollama
display_name: Llama 3.2
max_tokens: 4096
"#;
        let model: ModelConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(model.provider, ModelProvider::Ollama);
        assert!(!model.supports_streaming);
    }
}
