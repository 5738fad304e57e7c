/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint.

- `run`     — Run one prompt against one model
- `chat`    — Interactive conversation
- `compare` — One prompt against several models
- `history` — Browse, show, delete, and rename saved records
- `stats`   — Usage dashboard
- `models`  — Model catalog
- `rag`     — Retrieval augmented question answering
- `clear`   — Erase all history

Handlers receive the loaded configuration and the shared session store.
*/

use crate::config::Config;
use crate::error::Result;
use crate::models::SamplingParams;
use crate::session::SessionStore;
use colored::Colorize;
use std::sync::Arc;

pub mod history;
pub mod models;
pub mod rag;
pub mod stats;

/// Sampling parameters from CLI flags, falling back to configured defaults
pub fn sampling_params(
    config: &Config,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
) -> SamplingParams {
    SamplingParams {
        temperature: temperature.unwrap_or(config.defaults.temperature),
        max_tokens: max_tokens.unwrap_or(config.defaults.max_tokens),
    }
}

/// Shorten text to `max` characters for table cells
pub fn truncate(text: &str, max: usize) -> String {
    let single_line = text.replace('\n', " ");
    if single_line.chars().count() > max {
        let kept: String = single_line.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    } else {
        single_line
    }
}

/// Last eight characters of an id
///
/// ULIDs lead with their timestamp, so records created in the same second
/// share a prefix; the random tail tells them apart.
pub fn short_id(id: &str) -> &str {
    id.get(id.len().saturating_sub(8)..).unwrap_or(id)
}

// Single prompt handler
pub mod r#run {
    //! Runs one prompt and prints the response with its metrics.

    use super::*;

    /// Execute a single prompt
    ///
    /// # Arguments
    ///
    /// * `config` - Global configuration
    /// * `store` - Session store the execution is recorded in
    /// * `prompt` - Prompt text
    /// * `model` - Optional model override
    /// * `params` - Sampling parameters
    /// * `tags` - Labels attached to the execution
    ///
    /// # Errors
    ///
    /// Returns error if the model backend fails
    pub async fn run_prompt(
        config: &Config,
        store: &Arc<SessionStore>,
        prompt: &str,
        model: Option<String>,
        params: SamplingParams,
        tags: Vec<String>,
    ) -> Result<()> {
        let model = model.unwrap_or_else(|| config.defaults.model.clone());
        if config.model(&model).is_none() {
            tracing::debug!("Model {} is not in the configured catalog", model);
        }

        tracing::info!("Running prompt against {}", model);
        let execution = store.execute_tagged(prompt, &model, params, tags).await?;

        println!("\n{}\n", execution.response);
        println!(
            "{}",
            format!(
                "{} | {} ms | {} tokens ({} prompt / {} completion) | id {}",
                execution.model,
                execution.latency_ms,
                execution.tokens.total,
                execution.tokens.prompt,
                execution.tokens.completion,
                short_id(&execution.id)
            )
            .dimmed()
        );
        Ok(())
    }
}

// Comparison handler
pub mod compare {
    //! Runs one prompt against several models and prints the results side by side.

    use super::*;
    use prettytable::{format, row, Table};

    /// Compare several models on one prompt
    ///
    /// # Errors
    ///
    /// Returns error if fewer than two models are given or any model fails
    pub async fn run_compare(
        store: &Arc<SessionStore>,
        prompt: &str,
        models: &[String],
        params: SamplingParams,
    ) -> Result<()> {
        println!(
            "Comparing {} models: {}",
            models.len(),
            models.join(", ").cyan()
        );

        let comparison = store.compare_models(prompt, models, params).await?;

        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
        table.add_row(row![b => "Model", "Latency", "Tokens", "Response"]);
        for execution in &comparison.executions {
            table.add_row(row![
                execution.model,
                format!("{} ms", execution.latency_ms),
                execution.tokens.total,
                truncate(&execution.response, 60)
            ]);
        }
        table.printstd();

        if let Some(fastest) = comparison.executions.iter().min_by_key(|e| e.latency_ms) {
            println!(
                "\nFastest: {} ({} ms)",
                fastest.model.green(),
                fastest.latency_ms
            );
        }
        println!("Comparison {} saved.", short_id(&comparison.id).cyan());
        Ok(())
    }
}

// Interactive conversation handler
pub mod chat {
    //! readline loop that sends each line to the conversation's model.

    use super::*;
    use crate::commands::history::resolve_conversation;
    use rustyline::error::ReadlineError;
    use rustyline::DefaultEditor;

    /// Start or resume an interactive conversation
    ///
    /// # Arguments
    ///
    /// * `config` - Global configuration
    /// * `store` - Session store holding the conversation
    /// * `model` - Model for a new conversation
    /// * `resume` - Id, or the short id shown in history, of a conversation to continue
    /// * `title` - Title for a new conversation
    ///
    /// # Errors
    ///
    /// Returns error if the conversation to resume does not exist or the
    /// terminal cannot be opened
    pub async fn run_chat(
        config: &Config,
        store: &Arc<SessionStore>,
        model: Option<String>,
        resume: Option<String>,
        title: Option<String>,
    ) -> Result<()> {
        let conversation = match resume {
            Some(prefix) => resolve_conversation(store, &prefix)?,
            None => {
                let model = model.unwrap_or_else(|| config.defaults.model.clone());
                store.create_conversation(&model, title)
            }
        };

        tracing::info!("Starting chat in conversation {}", conversation.id);
        println!(
            "{} {} ({})",
            "Conversation".bold(),
            conversation.title,
            conversation.model.cyan()
        );
        for message in &conversation.messages {
            println!("{}: {}", message.role.to_string().dimmed(), message.content);
        }
        println!("Type {} to leave.\n", "/exit".yellow());

        let mut rl = DefaultEditor::new()?;

        loop {
            match rl.readline("you> ") {
                Ok(line) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    if trimmed == "/exit" || trimmed == "/quit" {
                        break;
                    }
                    let _ = rl.add_history_entry(trimmed);

                    match store.send_message(&conversation.id, trimmed).await {
                        Ok(reply) => {
                            println!("\n{}\n", reply.content);
                            println!(
                                "{}",
                                format!(
                                    "{} ms | {} tokens",
                                    reply.latency_ms.unwrap_or_default(),
                                    reply.tokens.unwrap_or_default()
                                )
                                .dimmed()
                            );
                        }
                        Err(e) => {
                            eprintln!("{} {}\n", "Error:".red(), e);
                        }
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("CTRL-C");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    println!("CTRL-D");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {:?}", err);
                    break;
                }
            }
        }

        if let Some(saved) = store.get_conversation(&conversation.id) {
            println!(
                "Saved {} messages ({} tokens) to {}",
                saved.messages.len(),
                saved.total_tokens,
                short_id(&saved.id).cyan()
            );
        }
        Ok(())
    }
}

// History erase handler
pub mod clear {
    //! Erases every saved record after confirmation.

    use super::*;
    use std::io::{BufRead, Write};

    /// Clear all history
    ///
    /// # Errors
    ///
    /// Returns error if the durable store cannot be cleared
    pub fn run_clear(store: &Arc<SessionStore>, yes: bool) -> Result<()> {
        if !yes {
            print!(
                "Delete {} executions, {} conversations, and {} comparisons? [y/N] ",
                store.executions().len(),
                store.conversations().len(),
                store.comparisons().len()
            );
            std::io::stdout().flush()?;

            let mut answer = String::new();
            std::io::stdin().lock().read_line(&mut answer)?;
            if !matches!(answer.trim(), "y" | "Y" | "yes") {
                println!("Aborted.");
                return Ok(());
            }
        }

        store.clear_all()?;
        println!("{}", "All history cleared.".green());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sampling_params_fall_back_to_config() {
        let config = Config::default();
        let params = sampling_params(&config, None, Some(64));
        assert_eq!(params.temperature, 0.7);
        assert_eq!(params.max_tokens, 64);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("line one\nline two", 100), "line one line two");
        assert_eq!(truncate("abcdefghijkl", 8), "abcde...");
        assert_eq!(truncate("ééééééééé", 5), "éé...");
    }

    #[test]
    fn test_short_id() {
        assert_eq!(short_id("01HXABCDEFGH"), "ABCDEFGH");
        assert_eq!(short_id("abc"), "abc");
    }
}
