use async_trait::async_trait;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

use promptbench::error::{PromptbenchError, Result};
use promptbench::models::TokenUsage;
use promptbench::providers::{CompletionRequest, CompletionResponse, Provider};
use promptbench::session::SessionStore;
use promptbench::storage::{DurableStore, MemoryStore, SledStore, SqliteStore};

/// Canned per-model answers for integration tests
#[derive(Debug, Clone, Default)]
#[allow(dead_code)]
pub struct CannedProvider {
    replies: Arc<Mutex<HashMap<String, (u64, std::result::Result<String, String>)>>>,
    usage: Option<TokenUsage>,
}

#[allow(dead_code)]
impl CannedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = Some(usage);
        self
    }

    pub fn answer(self, model: &str, delay_ms: u64, content: &str) -> Self {
        self.replies
            .lock()
            .unwrap()
            .insert(model.to_string(), (delay_ms, Ok(content.to_string())));
        self
    }

    pub fn failure(self, model: &str, delay_ms: u64, message: &str) -> Self {
        self.replies
            .lock()
            .unwrap()
            .insert(model.to_string(), (delay_ms, Err(message.to_string())));
        self
    }
}

#[async_trait]
impl Provider for CannedProvider {
    fn name(&self) -> &str {
        "canned"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
        let (delay_ms, reply) = self
            .replies
            .lock()
            .unwrap()
            .get(&request.model)
            .cloned()
            .unwrap_or((0, Ok(format!("{} answered", request.model))));

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        match reply {
            Ok(content) => Ok(CompletionResponse {
                content,
                usage: self.usage,
            }),
            Err(message) => Err(PromptbenchError::Provider(message).into()),
        }
    }
}

#[allow(dead_code)]
pub fn memory_session(provider: CannedProvider) -> Arc<SessionStore> {
    Arc::new(
        SessionStore::new(Arc::new(provider), Arc::new(MemoryStore::new()))
            .expect("failed to build session store"),
    )
}

#[allow(dead_code)]
pub fn open_sled(tmp: &TempDir) -> Arc<dyn DurableStore> {
    Arc::new(SledStore::new(tmp.path().join("sessions.sled")).expect("failed to open sled store"))
}

#[allow(dead_code)]
pub fn open_sqlite(tmp: &TempDir) -> Arc<dyn DurableStore> {
    Arc::new(
        SqliteStore::new_with_path(tmp.path().join("sessions.db"))
            .expect("failed to open sqlite store"),
    )
}

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}
