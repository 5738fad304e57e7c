use crate::cli::{HistoryCommand, HistoryKind};
use crate::commands::{short_id, truncate};
use crate::error::{PromptbenchError, Result};
use crate::models::{Comparison, Conversation, Execution};
use crate::session::{Record, SessionStore};
use colored::Colorize;
use prettytable::{format, Table};
use std::sync::Arc;

/// A saved record of any kind
#[derive(Debug, Clone, PartialEq)]
pub enum HistoryRecord {
    /// Single-shot execution
    Execution(Execution),
    /// Conversation
    Conversation(Conversation),
    /// Comparison
    Comparison(Comparison),
}

fn matching<R: Record>(items: &[R], fragment: &str) -> Vec<R> {
    items
        .iter()
        .filter(|item| item.id().starts_with(fragment) || item.id().ends_with(fragment))
        .cloned()
        .collect()
}

/// Find a record by full id, or by a fragment that uniquely starts or ends
/// one id across all collections
///
/// The short ids printed by the CLI are id tails, so both forms resolve.
///
/// # Errors
///
/// Returns `PromptbenchError::NotFound` when nothing matches and
/// `PromptbenchError::InvalidRequest` when the fragment is ambiguous
pub fn find_record(store: &SessionStore, fragment: &str) -> Result<HistoryRecord> {
    if fragment.is_empty() {
        return Err(PromptbenchError::InvalidRequest("Record id cannot be empty".into()).into());
    }

    if let Some(execution) = store.get_execution(fragment) {
        return Ok(HistoryRecord::Execution(execution));
    }
    if let Some(conversation) = store.get_conversation(fragment) {
        return Ok(HistoryRecord::Conversation(conversation));
    }
    if let Some(comparison) = store.get_comparison(fragment) {
        return Ok(HistoryRecord::Comparison(comparison));
    }

    let mut found: Vec<HistoryRecord> = Vec::new();
    found.extend(
        matching(&store.executions(), fragment)
            .into_iter()
            .map(HistoryRecord::Execution),
    );
    found.extend(
        matching(&store.conversations(), fragment)
            .into_iter()
            .map(HistoryRecord::Conversation),
    );
    found.extend(
        matching(&store.comparisons(), fragment)
            .into_iter()
            .map(HistoryRecord::Comparison),
    );

    match found.len() {
        0 => Err(PromptbenchError::NotFound(format!("no record matches '{}'", fragment)).into()),
        1 => Ok(found.remove(0)),
        n => Err(PromptbenchError::InvalidRequest(format!(
            "'{}' matches {} records, use a longer id",
            fragment, n
        ))
        .into()),
    }
}

/// Find a conversation by full id or unique id prefix
///
/// # Errors
///
/// Returns `PromptbenchError::NotFound` if the id does not name a conversation
pub fn resolve_conversation(store: &SessionStore, prefix: &str) -> Result<Conversation> {
    match find_record(store, prefix)? {
        HistoryRecord::Conversation(conversation) => Ok(conversation),
        _ => Err(PromptbenchError::NotFound(format!("conversation '{}'", prefix)).into()),
    }
}

/// Handle history commands
pub fn handle_history(store: &Arc<SessionStore>, command: HistoryCommand) -> Result<()> {
    match command {
        HistoryCommand::List { kind, limit } => {
            let show = |k: HistoryKind| kind.map_or(true, |wanted| wanted == k);
            let mut printed = false;

            if show(HistoryKind::Executions) {
                printed |= print_executions(&store.executions(), limit);
            }
            if show(HistoryKind::Conversations) {
                printed |= print_conversations(&store.conversations(), limit);
            }
            if show(HistoryKind::Comparisons) {
                printed |= print_comparisons(&store.comparisons(), limit);
            }

            if !printed {
                println!("{}", "No history found.".yellow());
            } else {
                println!(
                    "Use {} to see a record in full.",
                    "promptbench history show <ID>".cyan()
                );
                println!();
            }
        }
        HistoryCommand::Show { id } => match find_record(store, &id)? {
            HistoryRecord::Execution(execution) => show_execution(&execution),
            HistoryRecord::Conversation(conversation) => show_conversation(&conversation),
            HistoryRecord::Comparison(comparison) => show_comparison(&comparison),
        },
        HistoryCommand::Delete { id } => {
            let (label, full_id) = match find_record(store, &id)? {
                HistoryRecord::Execution(e) => {
                    store.delete_execution(&e.id);
                    ("execution", e.id)
                }
                HistoryRecord::Conversation(c) => {
                    store.delete_conversation(&c.id);
                    ("conversation", c.id)
                }
                HistoryRecord::Comparison(c) => {
                    store.delete_comparison(&c.id);
                    ("comparison", c.id)
                }
            };
            println!("{}", format!("Deleted {} {}", label, full_id).green());
        }
        HistoryCommand::Rename { id, title } => {
            let conversation = resolve_conversation(store, &id)?;
            store.update_conversation_title(&conversation.id, &title);
            println!(
                "{}",
                format!("Renamed conversation {} to '{}'", short_id(&conversation.id), title)
                    .green()
            );
        }
    }

    Ok(())
}

fn new_table() -> Table {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
    table
}

fn print_executions(executions: &[Execution], limit: usize) -> bool {
    if executions.is_empty() {
        return false;
    }

    let mut table = new_table();
    table.add_row(prettytable::row![
        "ID".bold(),
        "Model".bold(),
        "Prompt".bold(),
        "Latency".bold(),
        "Tokens".bold(),
        "When".bold()
    ]);
    for execution in executions.iter().take(limit) {
        table.add_row(prettytable::row![
            short_id(&execution.id).cyan(),
            execution.model,
            truncate(&execution.prompt, 40),
            format!("{} ms", execution.latency_ms),
            execution.tokens.total,
            execution.timestamp.format("%Y-%m-%d %H:%M")
        ]);
    }

    println!("\nExecutions ({}):", executions.len());
    table.printstd();
    true
}

fn print_conversations(conversations: &[Conversation], limit: usize) -> bool {
    if conversations.is_empty() {
        return false;
    }

    let mut table = new_table();
    table.add_row(prettytable::row![
        "ID".bold(),
        "Title".bold(),
        "Model".bold(),
        "Messages".bold(),
        "Tokens".bold(),
        "Last Updated".bold()
    ]);
    for conversation in conversations.iter().take(limit) {
        table.add_row(prettytable::row![
            short_id(&conversation.id).cyan(),
            truncate(&conversation.title, 40),
            conversation.model,
            conversation.messages.len(),
            conversation.total_tokens,
            conversation.updated_at.format("%Y-%m-%d %H:%M")
        ]);
    }

    println!("\nConversations ({}):", conversations.len());
    table.printstd();
    true
}

fn print_comparisons(comparisons: &[Comparison], limit: usize) -> bool {
    if comparisons.is_empty() {
        return false;
    }

    let mut table = new_table();
    table.add_row(prettytable::row![
        "ID".bold(),
        "Prompt".bold(),
        "Models".bold(),
        "When".bold()
    ]);
    for comparison in comparisons.iter().take(limit) {
        let models: Vec<&str> = comparison
            .executions
            .iter()
            .map(|e| e.model.as_str())
            .collect();
        table.add_row(prettytable::row![
            short_id(&comparison.id).cyan(),
            truncate(&comparison.prompt, 40),
            models.join(", "),
            comparison.created_at.format("%Y-%m-%d %H:%M")
        ]);
    }

    println!("\nComparisons ({}):", comparisons.len());
    table.printstd();
    true
}

fn show_execution(execution: &Execution) {
    println!("{} {}", "Execution".bold(), execution.id.cyan());
    println!(
        "Model: {}  Temperature: {}  Max tokens: {}",
        execution.model, execution.params.temperature, execution.params.max_tokens
    );
    println!(
        "Latency: {} ms  Tokens: {} ({} prompt / {} completion)",
        execution.latency_ms,
        execution.tokens.total,
        execution.tokens.prompt,
        execution.tokens.completion
    );
    if !execution.tags.is_empty() {
        println!("Tags: {}", execution.tags.join(", "));
    }
    println!("\n{}\n{}\n", "Prompt:".bold(), execution.prompt);
    println!("{}\n{}\n", "Response:".bold(), execution.response);
}

fn show_conversation(conversation: &Conversation) {
    println!(
        "{} {} ({})",
        "Conversation".bold(),
        conversation.title,
        conversation.id.cyan()
    );
    println!(
        "Model: {}  Messages: {}  Tokens: {}",
        conversation.model,
        conversation.messages.len(),
        conversation.total_tokens
    );
    println!();
    for message in &conversation.messages {
        println!(
            "[{}] {}: {}",
            message.timestamp.format("%H:%M:%S"),
            message.role.to_string().bold(),
            message.content
        );
    }
    println!();
}

fn show_comparison(comparison: &Comparison) {
    println!("{} {}", "Comparison".bold(), comparison.id.cyan());
    println!("\n{}\n{}\n", "Prompt:".bold(), comparison.prompt);
    for execution in &comparison.executions {
        println!(
            "{} ({} ms, {} tokens)",
            execution.model.bold(),
            execution.latency_ms,
            execution.tokens.total
        );
        println!("{}\n", execution.response);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use crate::models::SamplingParams;
    use crate::test_utils::{execution, ScriptedProvider};
    use chrono::Utc;

    fn store() -> Arc<SessionStore> {
        Arc::new(
            SessionStore::new(
                Arc::new(ScriptedProvider::new()),
                Arc::new(MemoryStore::new()),
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_find_record_by_prefix() {
        let store = store();
        let conversation = store.create_conversation("gpt-4", None);
        let found = find_record(&store, &conversation.id[..20]).unwrap();
        assert_eq!(found, HistoryRecord::Conversation(conversation));
    }

    #[test]
    fn test_find_record_by_full_id() {
        let store = store();
        let exec = execution("m", Utc::now(), 1, 1);
        store.record_execution(exec.clone());
        assert_eq!(
            find_record(&store, &exec.id).unwrap(),
            HistoryRecord::Execution(exec)
        );
    }

    #[tokio::test]
    async fn test_printed_comparison_id_resolves() {
        let store = store();
        let comparison = store
            .compare_models(
                "p",
                &["a".to_string(), "b".to_string()],
                SamplingParams::default(),
            )
            .await
            .unwrap();

        // the comparison and both branch executions share a creation second
        let found = find_record(&store, short_id(&comparison.id)).unwrap();
        assert_eq!(found, HistoryRecord::Comparison(comparison.clone()));

        for execution in &comparison.executions {
            let found = find_record(&store, short_id(&execution.id)).unwrap();
            assert_eq!(found, HistoryRecord::Execution(execution.clone()));
        }
    }

    #[test]
    fn test_find_record_missing() {
        let store = store();
        let err = find_record(&store, "ZZZZ").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PromptbenchError>(),
            Some(PromptbenchError::NotFound(_))
        ));
    }

    #[test]
    fn test_find_record_ambiguous_fragment() {
        let store = store();
        let mut a = execution("m", Utc::now(), 1, 1);
        a.id = "AAAA1Z".to_string();
        let mut b = execution("m", Utc::now(), 1, 1);
        b.id = "AAAA2Z".to_string();
        store.record_execution(a);
        store.record_execution(b);

        let err = find_record(&store, "AAAA").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PromptbenchError>(),
            Some(PromptbenchError::InvalidRequest(_))
        ));
        assert!(find_record(&store, "AAAA2").is_ok());

        // tails resolve the same way
        match find_record(&store, "1Z").unwrap() {
            HistoryRecord::Execution(e) => assert_eq!(e.id, "AAAA1Z"),
            other => panic!("unexpected record {:?}", other),
        }
        assert!(find_record(&store, "Z").is_err());
    }

    #[test]
    fn test_resolve_conversation_rejects_other_kinds() {
        let store = store();
        let exec = execution("m", Utc::now(), 1, 1);
        store.record_execution(exec.clone());
        assert!(resolve_conversation(&store, &exec.id).is_err());
    }

    #[test]
    fn test_delete_and_rename() {
        let store = store();
        let conversation = store.create_conversation("gpt-4", Some("before".to_string()));

        handle_history(
            &store,
            HistoryCommand::Rename {
                id: conversation.id.clone(),
                title: "after".to_string(),
            },
        )
        .unwrap();
        assert_eq!(store.conversations()[0].title, "after");

        handle_history(
            &store,
            HistoryCommand::Delete {
                id: conversation.id.clone(),
            },
        )
        .unwrap();
        assert!(store.conversations().is_empty());
    }

    #[test]
    fn test_list_empty_history() {
        let store = store();
        handle_history(
            &store,
            HistoryCommand::List {
                kind: None,
                limit: 10,
            },
        )
        .unwrap();
    }
}
