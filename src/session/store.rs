//! Session store
//!
//! Owns the executions, conversations, and comparisons collections. Every
//! mutation builds a new collection value, swaps it in, publishes it to
//! observers, and then writes the whole collection to the durable store.
//! Durable writes from the async flows run on the blocking pool.

use crate::error::{PromptbenchError, Result};
use crate::models::{
    Comparison, Conversation, Execution, Message, SamplingParams, TokenUsage,
};
use crate::providers::{CompletionRequest, CompletionResponse, Provider};
use crate::session::subscription::{Observable, Snapshot, Subscription};
use crate::storage::{encode_collection, load_collection, CollectionName, DurableStore};
use crate::telemetry::InvocationMetrics;

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// An entity kept in one of the store's collections
pub trait Record: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Collection the entity is persisted under
    const COLLECTION: CollectionName;

    /// Unique identifier
    fn id(&self) -> &str;

    /// The store slot holding this entity type
    fn slot(store: &SessionStore) -> &Mutex<Observable<Self>>;
}

impl Record for Execution {
    const COLLECTION: CollectionName = CollectionName::Executions;

    fn id(&self) -> &str {
        &self.id
    }

    fn slot(store: &SessionStore) -> &Mutex<Observable<Self>> {
        &store.executions
    }
}

impl Record for Conversation {
    const COLLECTION: CollectionName = CollectionName::Conversations;

    fn id(&self) -> &str {
        &self.id
    }

    fn slot(store: &SessionStore) -> &Mutex<Observable<Self>> {
        &store.conversations
    }
}

impl Record for Comparison {
    const COLLECTION: CollectionName = CollectionName::Comparisons;

    fn id(&self) -> &str {
        &self.id
    }

    fn slot(store: &SessionStore) -> &Mutex<Observable<Self>> {
        &store.comparisons
    }
}

/// A panic while a slot was held cannot leave a half-built collection behind,
/// because the value is only ever swapped whole.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Serialized durable writes of versioned collection values
///
/// A value older than the newest one already saved for its collection is
/// skipped, so writes that finish out of order never roll the store back.
#[derive(Clone)]
struct SnapshotWriter {
    durable: Arc<dyn DurableStore>,
    saved: Arc<Mutex<HashMap<CollectionName, u64>>>,
}

impl SnapshotWriter {
    fn new(durable: Arc<dyn DurableStore>) -> Self {
        Self {
            durable,
            saved: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn write<R: Record>(&self, version: u64, snapshot: &[R]) {
        let mut saved = lock(&self.saved);
        let newest = saved.entry(R::COLLECTION).or_insert(0);
        if version <= *newest {
            tracing::debug!(
                store.collection = R::COLLECTION.as_str(),
                store.version = version,
                store.saved_version = *newest,
                "Skipping stale snapshot"
            );
            return;
        }

        let result = encode_collection(snapshot)
            .and_then(|json| self.durable.save(R::COLLECTION, &json));
        match result {
            Ok(()) => *newest = version,
            Err(e) => tracing::warn!(
                store.collection = R::COLLECTION.as_str(),
                store.error = %e,
                "Failed to persist collection; in-memory state remains authoritative"
            ),
        }
    }
}

/// Process-wide state container for session history
///
/// Construct one instance, wrap it in an `Arc`, and pass it to whatever needs
/// it. Collection order is most-recent-first.
///
/// # Examples
///
/// ```
/// use promptbench::session::SessionStore;
/// use promptbench::storage::MemoryStore;
/// use promptbench::providers::{CompletionRequest, CompletionResponse, Provider};
/// use async_trait::async_trait;
/// use std::sync::Arc;
///
/// struct Echo;
///
/// #[async_trait]
/// impl Provider for Echo {
///     fn name(&self) -> &str { "echo" }
///     async fn complete(&self, _r: &CompletionRequest) -> promptbench::Result<CompletionResponse> {
///         Ok(CompletionResponse::new("echo"))
///     }
/// }
///
/// let store = SessionStore::new(Arc::new(Echo), Arc::new(MemoryStore::new())).unwrap();
/// let conversation = store.create_conversation("gpt-4", None);
/// assert_eq!(store.conversations()[0].id, conversation.id);
/// ```
pub struct SessionStore {
    provider: Arc<dyn Provider>,
    writer: SnapshotWriter,
    defaults: SamplingParams,
    executions: Mutex<Observable<Execution>>,
    conversations: Mutex<Observable<Conversation>>,
    comparisons: Mutex<Observable<Comparison>>,
}

impl SessionStore {
    /// Create a store seeded from durable storage
    ///
    /// # Arguments
    ///
    /// * `provider` - Model backend used by the invocation flows
    /// * `durable` - Adapter the collections are loaded from and saved to
    ///
    /// # Errors
    ///
    /// Returns `PromptbenchError::Storage` if a stored collection cannot be
    /// read or decoded
    pub fn new(provider: Arc<dyn Provider>, durable: Arc<dyn DurableStore>) -> Result<Self> {
        let executions: Vec<Execution> = load_collection(durable.as_ref(), Execution::COLLECTION)?;
        let conversations: Vec<Conversation> =
            load_collection(durable.as_ref(), Conversation::COLLECTION)?;
        let comparisons: Vec<Comparison> =
            load_collection(durable.as_ref(), Comparison::COLLECTION)?;

        tracing::info!(
            store.backend = durable.name(),
            store.provider = provider.name(),
            store.executions = executions.len(),
            store.conversations = conversations.len(),
            store.comparisons = comparisons.len(),
            "Session store loaded"
        );

        Ok(Self {
            provider,
            writer: SnapshotWriter::new(durable),
            defaults: SamplingParams::default(),
            executions: Mutex::new(Observable::new(executions)),
            conversations: Mutex::new(Observable::new(conversations)),
            comparisons: Mutex::new(Observable::new(comparisons)),
        })
    }

    /// Use these sampling parameters for chat turns
    pub fn with_defaults(mut self, defaults: SamplingParams) -> Self {
        self.defaults = defaults;
        self
    }

    /// Sampling parameters used for chat turns
    pub fn defaults(&self) -> SamplingParams {
        self.defaults
    }

    /// The model backend
    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    /// Current value of a collection
    pub fn snapshot<R: Record>(&self) -> Snapshot<R> {
        lock(R::slot(self)).snapshot()
    }

    /// Current executions, most recent first
    pub fn executions(&self) -> Snapshot<Execution> {
        self.snapshot()
    }

    /// Current conversations, most recent first
    pub fn conversations(&self) -> Snapshot<Conversation> {
        self.snapshot()
    }

    /// Current comparisons, most recent first
    pub fn comparisons(&self) -> Snapshot<Comparison> {
        self.snapshot()
    }

    /// Subscribe to a collection
    ///
    /// The feed yields the current value immediately, then the new value after
    /// every mutation.
    pub fn subscribe<R: Record>(&self) -> Subscription<R> {
        lock(R::slot(self)).subscribe()
    }

    /// Subscribe to the executions collection
    pub fn subscribe_executions(&self) -> Subscription<Execution> {
        self.subscribe()
    }

    /// Subscribe to the conversations collection
    pub fn subscribe_conversations(&self) -> Subscription<Conversation> {
        self.subscribe()
    }

    /// Subscribe to the comparisons collection
    pub fn subscribe_comparisons(&self) -> Subscription<Comparison> {
        self.subscribe()
    }

    /// Apply `edit` to a copy of the collection and publish it if it reports
    /// a change. Returns the published value and its version.
    fn stage<R, F>(&self, edit: F) -> Option<(u64, Snapshot<R>)>
    where
        R: Record,
        F: FnOnce(&mut Vec<R>) -> bool,
    {
        let mut slot = lock(R::slot(self));
        let mut items = slot.snapshot().as_ref().clone();
        if !edit(&mut items) {
            return None;
        }
        let snapshot = slot.replace(items);
        Some((slot.version(), snapshot))
    }

    /// Stage a change and write it through on the calling thread
    fn mutate<R, F>(&self, edit: F) -> bool
    where
        R: Record,
        F: FnOnce(&mut Vec<R>) -> bool,
    {
        match self.stage(edit) {
            Some((version, snapshot)) => {
                self.writer.write(version, snapshot.as_slice());
                true
            }
            None => false,
        }
    }

    /// Stage a change and write it on the blocking pool
    async fn mutate_async<R, F>(&self, edit: F) -> bool
    where
        R: Record,
        F: FnOnce(&mut Vec<R>) -> bool,
    {
        let Some((version, snapshot)) = self.stage(edit) else {
            return false;
        };

        let writer = self.writer.clone();
        let written =
            tokio::task::spawn_blocking(move || writer.write(version, snapshot.as_slice())).await;
        if let Err(e) = written {
            tracing::warn!(
                store.collection = R::COLLECTION.as_str(),
                store.error = %e,
                "Durable write task did not complete"
            );
        }
        true
    }

    fn insert_front<R: Record>(&self, record: R) {
        tracing::debug!(
            store.collection = R::COLLECTION.as_str(),
            store.id = record.id(),
            "Recording"
        );
        self.mutate::<R, _>(|items| {
            items.insert(0, record);
            true
        });
    }

    /// Insert at the front of a collection from an async flow
    pub(crate) async fn record_async<R: Record>(&self, record: R) {
        tracing::debug!(
            store.collection = R::COLLECTION.as_str(),
            store.id = record.id(),
            "Recording"
        );
        self.mutate_async::<R, _>(|items| {
            items.insert(0, record);
            true
        })
        .await;
    }

    fn remove<R: Record>(&self, id: &str) -> bool {
        let removed = self.mutate::<R, _>(|items| {
            let before = items.len();
            items.retain(|item| item.id() != id);
            items.len() != before
        });
        if removed {
            tracing::debug!(store.collection = R::COLLECTION.as_str(), store.id = id, "Deleted");
        }
        removed
    }

    /// Create an empty conversation at the front of the collection
    ///
    /// # Arguments
    ///
    /// * `model` - Model every turn of the conversation will use
    /// * `title` - Display title; a timestamped label is used when absent
    pub fn create_conversation(&self, model: &str, title: Option<String>) -> Conversation {
        let conversation = Conversation::new(model, title);
        self.insert_front(conversation.clone());
        conversation
    }

    /// Look up a conversation by id
    pub fn get_conversation(&self, id: &str) -> Option<Conversation> {
        self.conversations().iter().find(|c| c.id == id).cloned()
    }

    /// Look up an execution by id
    pub fn get_execution(&self, id: &str) -> Option<Execution> {
        self.executions().iter().find(|e| e.id == id).cloned()
    }

    /// Look up a comparison by id
    pub fn get_comparison(&self, id: &str) -> Option<Comparison> {
        self.comparisons().iter().find(|c| c.id == id).cloned()
    }

    /// Delete a conversation; unknown ids are ignored
    ///
    /// # Returns
    ///
    /// Returns `true` if something was removed
    pub fn delete_conversation(&self, id: &str) -> bool {
        self.remove::<Conversation>(id)
    }

    /// Delete an execution; unknown ids are ignored
    pub fn delete_execution(&self, id: &str) -> bool {
        self.remove::<Execution>(id)
    }

    /// Delete a comparison; unknown ids are ignored
    pub fn delete_comparison(&self, id: &str) -> bool {
        self.remove::<Comparison>(id)
    }

    /// Rename a conversation; unknown ids are ignored
    pub fn update_conversation_title(&self, id: &str, title: &str) -> bool {
        self.mutate::<Conversation, _>(|items| match items.iter_mut().find(|c| c.id == id) {
            Some(conversation) => {
                conversation.title = title.to_string();
                conversation.updated_at = Utc::now();
                true
            }
            None => false,
        })
    }

    /// Append a message to a conversation
    ///
    /// If the conversation no longer exists the message is dropped; this is
    /// the expected outcome when a conversation is deleted while a reply is
    /// in flight.
    ///
    /// # Returns
    ///
    /// Returns `true` if the message was stored
    pub fn append_message_to_conversation(&self, id: &str, message: Message) -> bool {
        let message_id = message.id.clone();
        let appended = self.mutate(append_to(id, message));
        note_dropped(id, &message_id, appended)
    }

    async fn append_message_async(&self, id: &str, message: Message) -> bool {
        let message_id = message.id.clone();
        let appended = self.mutate_async(append_to(id, message)).await;
        note_dropped(id, &message_id, appended)
    }

    /// Insert an execution at the front of the collection
    pub fn record_execution(&self, execution: Execution) {
        self.insert_front(execution);
    }

    /// Insert a comparison at the front of the collection
    pub fn record_comparison(&self, comparison: Comparison) {
        self.insert_front(comparison);
    }

    /// Empty every collection and erase durable storage
    ///
    /// # Errors
    ///
    /// Returns `PromptbenchError::Storage` if the durable store cannot be
    /// cleared; the in-memory collections are empty either way
    pub fn clear_all(&self) -> Result<()> {
        {
            let mut saved = lock(&self.writer.saved);
            saved.insert(Execution::COLLECTION, self.empty_slot::<Execution>());
            saved.insert(Conversation::COLLECTION, self.empty_slot::<Conversation>());
            saved.insert(Comparison::COLLECTION, self.empty_slot::<Comparison>());
            self.writer.durable.clear()?;
        }
        tracing::info!("Cleared all session history");
        Ok(())
    }

    fn empty_slot<R: Record>(&self) -> u64 {
        let mut slot = lock(R::slot(self));
        slot.replace(Vec::new());
        slot.version()
    }

    /// Call the model backend with telemetry and error logging
    async fn invoke(&self, request: &CompletionRequest) -> Result<(CompletionResponse, u64)> {
        let metrics = InvocationMetrics::start(request.model.as_str());
        let result = self.provider.complete(request).await;

        match result {
            Ok(response) => Ok((response, metrics.record_success())),
            Err(e) => {
                let latency_ms = metrics.record_error();
                tracing::error!(
                    invoke.model = %request.model,
                    invoke.latency_ms = latency_ms,
                    "Invocation failed: {:#}",
                    e
                );
                Err(e)
            }
        }
    }

    /// Run one prompt against one model and record the execution
    ///
    /// # Arguments
    ///
    /// * `prompt` - Prompt text
    /// * `model` - Model identifier
    /// * `params` - Sampling parameters
    ///
    /// # Errors
    ///
    /// Returns the backend's error; nothing is recorded in that case
    pub async fn execute_prompt(
        &self,
        prompt: &str,
        model: &str,
        params: SamplingParams,
    ) -> Result<Execution> {
        self.execute_tagged(prompt, model, params, Vec::new()).await
    }

    /// Like [`execute_prompt`](Self::execute_prompt) but labels the execution
    pub async fn execute_tagged(
        &self,
        prompt: &str,
        model: &str,
        params: SamplingParams,
        tags: Vec<String>,
    ) -> Result<Execution> {
        let request = CompletionRequest::prompt(model, prompt, params);
        let (response, latency_ms) = self.invoke(&request).await?;

        let execution = Execution {
            id: crate::models::new_id(),
            prompt: prompt.to_string(),
            response: response.content,
            model: model.to_string(),
            params,
            timestamp: Utc::now(),
            latency_ms,
            tokens: response.usage.unwrap_or_default(),
            tags,
        };

        self.record_async(execution.clone()).await;
        Ok(execution)
    }

    /// Send a user message and append the model's reply
    ///
    /// The full conversation history goes to the conversation's model. The
    /// reply is returned even if the conversation was deleted while waiting,
    /// in which case it is not stored.
    ///
    /// # Errors
    ///
    /// Returns `PromptbenchError::NotFound` if the conversation does not exist
    /// when the message is sent, or the backend's error
    pub async fn send_message(&self, conversation_id: &str, content: &str) -> Result<Message> {
        let model = self
            .get_conversation(conversation_id)
            .map(|c| c.model)
            .ok_or_else(|| {
                PromptbenchError::NotFound(format!("conversation {}", conversation_id))
            })?;

        self.append_message_async(conversation_id, Message::user(content))
            .await;

        let history = self
            .get_conversation(conversation_id)
            .map(|c| c.messages)
            .ok_or_else(|| {
                PromptbenchError::NotFound(format!("conversation {}", conversation_id))
            })?;

        let request = CompletionRequest::chat(model.as_str(), &history, self.defaults);
        let (response, latency_ms) = self.invoke(&request).await?;

        let reply = Message::assistant(
            response.content,
            model,
            response.usage.map(|u: TokenUsage| u.total),
            latency_ms,
        );
        self.append_message_async(conversation_id, reply.clone())
            .await;
        Ok(reply)
    }
}

fn append_to(id: &str, message: Message) -> impl FnOnce(&mut Vec<Conversation>) -> bool + '_ {
    move |items| match items.iter_mut().find(|c| c.id == id) {
        Some(conversation) => {
            conversation.push_message(message);
            true
        }
        None => false,
    }
}

fn note_dropped(id: &str, message_id: &str, appended: bool) -> bool {
    if !appended {
        tracing::warn!(
            store.conversation = id,
            store.message = message_id,
            "Conversation no longer exists, dropping message"
        );
    }
    appended
}
