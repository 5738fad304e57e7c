//! Retrieval augmented query command

use crate::config::Config;
use crate::error::{PromptbenchError, Result};
use crate::providers::{BackendProvider, RagAnswer};
use colored::Colorize;

/// Ask the backend's document index a question
///
/// RAG answers are not saved to history.
///
/// # Arguments
///
/// * `config` - Global configuration
/// * `query` - Question text
/// * `top_k` - Number of passages to retrieve
/// * `model` - Optional model override
///
/// # Errors
///
/// Returns `PromptbenchError::Config` when the configured provider is not the
/// playground backend, or the backend's error
pub async fn run_rag(
    config: &Config,
    query: &str,
    top_k: usize,
    model: Option<String>,
) -> Result<RagAnswer> {
    if config.provider.provider_type != "backend" {
        return Err(PromptbenchError::Config(format!(
            "RAG queries need the backend provider, configured provider is {}",
            config.provider.provider_type
        ))
        .into());
    }
    if top_k == 0 {
        return Err(PromptbenchError::InvalidRequest("top_k must be at least 1".into()).into());
    }

    let model = model.unwrap_or_else(|| config.defaults.model.clone());
    let backend = BackendProvider::new(
        config.provider.backend.clone(),
        config.provider.timeout_seconds,
    )?;

    if !backend.health().await {
        tracing::warn!("Backend at {} did not pass its health check", backend.base_url());
    }

    let answer = backend.rag_query(query, top_k, &model).await?;
    print_answer(&answer);
    Ok(answer)
}

fn print_answer(answer: &RagAnswer) {
    println!("\n{}\n", answer.answer);
    println!(
        "{}",
        format!("{} | {} ms", answer.model, answer.latency_ms).dimmed()
    );

    if answer.sources.is_empty() {
        return;
    }
    println!("\n{}", "Sources:".bold());
    for (i, source) in answer.sources.iter().enumerate() {
        println!(
            "{}. [{:.2}] {}",
            i + 1,
            source.score,
            crate::commands::truncate(&source.content, 100)
        );
    }
    println!();
}
