//! Integration tests for durable session state
//!
//! Tests that every collection survives a restart on both on-disk engines
//! and that clearing erases the durable copy too.

mod common;

use common::{open_sled, open_sqlite, CannedProvider};
use promptbench::models::{Message, SamplingParams, TokenUsage};
use promptbench::session::SessionStore;
use promptbench::storage::DurableStore;
use std::sync::Arc;
use tempfile::TempDir;

async fn populate(store: &Arc<SessionStore>) {
    store
        .execute_prompt("first", "gpt-4", SamplingParams::default())
        .await
        .expect("execution should succeed");

    let conversation = store.create_conversation("llama3", Some("Notes".to_string()));
    store
        .send_message(&conversation.id, "hello")
        .await
        .expect("message should succeed");

    store
        .compare_models(
            "compare me",
            &["gpt-4".to_string(), "llama3".to_string()],
            SamplingParams::default(),
        )
        .await
        .expect("comparison should succeed");
}

async fn assert_round_trip(open: impl Fn() -> Arc<dyn DurableStore>) {
    let provider = CannedProvider::new().with_usage(TokenUsage::new(4, 6));

    let (executions, conversations, comparisons) = {
        let store = Arc::new(SessionStore::new(Arc::new(provider.clone()), open()).unwrap());
        populate(&store).await;
        (
            store.executions(),
            store.conversations(),
            store.comparisons(),
        )
    };

    let reopened = SessionStore::new(Arc::new(provider), open()).unwrap();
    assert_eq!(reopened.executions(), executions);
    assert_eq!(reopened.conversations(), conversations);
    assert_eq!(reopened.comparisons(), comparisons);

    let conversation = &reopened.conversations()[0];
    assert_eq!(conversation.title, "Notes");
    assert_eq!(conversation.messages.len(), 2);
    assert_eq!(conversation.total_tokens, 10);
    assert_eq!(reopened.executions().len(), 3);
}

#[tokio::test]
async fn test_sled_round_trip() {
    let tmp = TempDir::new().expect("failed to create tempdir");
    let durable = open_sled(&tmp);
    assert_round_trip(|| Arc::clone(&durable)).await;
}

#[tokio::test]
async fn test_sqlite_round_trip() {
    let tmp = TempDir::new().expect("failed to create tempdir");
    assert_round_trip(|| open_sqlite(&tmp)).await;
}

#[tokio::test]
async fn test_clear_all_erases_durable_copy() {
    let tmp = TempDir::new().expect("failed to create tempdir");
    let provider = CannedProvider::new();

    {
        let store = Arc::new(SessionStore::new(Arc::new(provider.clone()), open_sqlite(&tmp)).unwrap());
        populate(&store).await;
        store.clear_all().expect("clear should succeed");
        assert!(store.executions().is_empty());
        assert!(store.conversations().is_empty());
        assert!(store.comparisons().is_empty());
    }

    let reopened = SessionStore::new(Arc::new(provider), open_sqlite(&tmp)).unwrap();
    assert!(reopened.executions().is_empty());
    assert!(reopened.conversations().is_empty());
    assert!(reopened.comparisons().is_empty());
}

#[tokio::test]
async fn test_appended_messages_survive_restart() {
    let tmp = TempDir::new().expect("failed to create tempdir");
    let provider = CannedProvider::new();

    let id = {
        let store = SessionStore::new(Arc::new(provider.clone()), open_sqlite(&tmp)).unwrap();
        let conversation = store.create_conversation("gpt-4", None);
        assert!(store.append_message_to_conversation(&conversation.id, Message::system("be brief")));
        assert!(store.update_conversation_title(&conversation.id, "Renamed"));
        conversation.id
    };

    let reopened = SessionStore::new(Arc::new(provider), open_sqlite(&tmp)).unwrap();
    let conversation = reopened.get_conversation(&id).expect("conversation should persist");
    assert_eq!(conversation.title, "Renamed");
    assert_eq!(conversation.messages.len(), 1);
    assert_eq!(conversation.messages[0].content, "be brief");
}
