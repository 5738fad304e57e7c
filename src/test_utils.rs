//! Test utilities for Promptbench
//!
//! Provides a scripted model backend, a durable store that always fails,
//! and builders for fixture records.

use crate::error::{PromptbenchError, Result};
use crate::models::{new_id, Execution, SamplingParams, TokenUsage};
use crate::providers::{CompletionRequest, CompletionResponse, Provider};
use crate::storage::{CollectionName, DurableStore};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone, Default)]
struct Behavior {
    content: Option<String>,
    usage: Option<TokenUsage>,
    delay_ms: u64,
    failure: Option<String>,
}

#[derive(Debug, Default)]
struct Script {
    behaviors: HashMap<String, Behavior>,
    requests: Vec<CompletionRequest>,
}

/// Model backend double with per-model canned behavior
///
/// Unscripted models answer immediately with `"<model> says hi"` and no
/// usage. Clones share the same script and request log.
#[derive(Debug, Clone, Default)]
pub struct ScriptedProvider {
    script: Arc<Mutex<Script>>,
}

impl ScriptedProvider {
    /// Create a provider with no scripted models
    pub fn new() -> Self {
        Self::default()
    }

    fn edit(self, model: &str, apply: impl FnOnce(&mut Behavior)) -> Self {
        {
            let mut script = self.script.lock().unwrap();
            apply(script.behaviors.entry(model.to_string()).or_default());
        }
        self
    }

    /// Reply to `model` with fixed content and usage
    pub fn respond(self, model: &str, content: &str, usage: Option<TokenUsage>) -> Self {
        let content = content.to_string();
        self.edit(model, |b| {
            b.content = Some(content);
            b.usage = usage;
        })
    }

    /// Wait before answering `model`
    pub fn delay(self, model: &str, delay_ms: u64) -> Self {
        self.edit(model, |b| b.delay_ms = delay_ms)
    }

    /// Fail every call to `model`
    pub fn fail(self, model: &str, message: &str) -> Self {
        let message = message.to_string();
        self.edit(model, |b| b.failure = Some(message))
    }

    /// Number of calls received
    pub fn call_count(&self) -> usize {
        self.script.lock().unwrap().requests.len()
    }

    /// Most recent request received
    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.script.lock().unwrap().requests.last().cloned()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
        let behavior = {
            let mut script = self.script.lock().unwrap();
            script.requests.push(request.clone());
            script
                .behaviors
                .get(&request.model)
                .cloned()
                .unwrap_or_default()
        };

        if behavior.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(behavior.delay_ms)).await;
        }

        if let Some(message) = behavior.failure {
            return Err(PromptbenchError::Provider(message).into());
        }

        let content = behavior
            .content
            .unwrap_or_else(|| format!("{} says hi", request.model));
        Ok(CompletionResponse {
            content,
            usage: behavior.usage,
        })
    }
}

/// Durable store whose writes always fail
///
/// Loads report nothing saved, so a session store can still be built on it.
pub struct FailingStore;

impl DurableStore for FailingStore {
    fn name(&self) -> &str {
        "failing"
    }

    fn save(&self, collection: CollectionName, _snapshot: &str) -> Result<()> {
        Err(PromptbenchError::Storage(format!("disk full while saving {}", collection)).into())
    }

    fn load(&self, _collection: CollectionName) -> Result<Option<String>> {
        Ok(None)
    }

    fn clear(&self) -> Result<()> {
        Err(PromptbenchError::Storage("disk full while clearing".to_string()).into())
    }
}

/// Build an execution fixture
pub fn execution(model: &str, timestamp: DateTime<Utc>, latency_ms: u64, total: u64) -> Execution {
    Execution {
        id: new_id(),
        prompt: "prompt".to_string(),
        response: "response".to_string(),
        model: model.to_string(),
        params: SamplingParams::default(),
        timestamp,
        latency_ms,
        tokens: TokenUsage::with_total(0, total, total),
        tags: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_provider_defaults() {
        let provider = ScriptedProvider::new();
        let response = provider
            .complete(&CompletionRequest::prompt("m", "p", SamplingParams::default()))
            .await
            .unwrap();
        assert_eq!(response.content, "m says hi");
        assert!(response.usage.is_none());
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_scripted_provider_clones_share_log() {
        let provider = ScriptedProvider::new().fail("bad", "nope");
        let clone = provider.clone();
        assert!(clone
            .complete(&CompletionRequest::prompt("bad", "p", SamplingParams::default()))
            .await
            .is_err());
        assert_eq!(provider.call_count(), 1);
        assert_eq!(provider.last_request().unwrap().model, "bad");
    }
}
