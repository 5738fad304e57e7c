//! Promptbench - prompt playground CLI
//!
#![doc = "Promptbench - prompt playground CLI"]
#![doc = "Main entry point for the promptbench application."]

use anyhow::Result;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use promptbench::cli::{Cli, Commands};
use promptbench::commands;
use promptbench::config::Config;
use promptbench::models::SamplingParams;
use promptbench::providers::create_provider;
use promptbench::session::SessionStore;
use promptbench::storage::open_store;
use promptbench::telemetry;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Load configuration before logging so its logging section applies
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    init_tracing(cli.verbose, config.logging.json);
    tracing::debug!("Loaded configuration from {}", config_path);

    config.validate()?;
    telemetry::init_metrics_exporter();

    // RAG talks to the backend directly and never touches history
    if let Commands::Rag {
        query,
        top_k,
        model,
    } = &cli.command
    {
        tracing::info!("Starting RAG query");
        commands::rag::run_rag(&config, query, *top_k, model.clone()).await?;
        return Ok(());
    }

    let provider = create_provider(&config.provider)?;
    let durable = open_store(&config.storage)?;
    let store = Arc::new(
        SessionStore::new(provider.clone(), durable)?.with_defaults(SamplingParams {
            temperature: config.defaults.temperature,
            max_tokens: config.defaults.max_tokens,
        }),
    );

    match cli.command {
        Commands::Run {
            prompt,
            model,
            temperature,
            max_tokens,
            tags,
        } => {
            let params = commands::sampling_params(&config, temperature, max_tokens);
            commands::run::run_prompt(&config, &store, &prompt, model, params, tags).await?;
        }
        Commands::Chat {
            model,
            resume,
            title,
        } => {
            tracing::info!("Starting interactive chat");
            if let Some(r) = &resume {
                tracing::debug!("Resuming conversation: {}", r);
            }
            commands::chat::run_chat(&config, &store, model, resume, title).await?;
        }
        Commands::Compare {
            prompt,
            models,
            temperature,
            max_tokens,
        } => {
            let params = commands::sampling_params(&config, temperature, max_tokens);
            commands::compare::run_compare(&store, &prompt, &models, params).await?;
        }
        Commands::History { command } => {
            commands::history::handle_history(&store, command)?;
        }
        Commands::Stats { json } => {
            commands::stats::show_stats(&store, json)?;
        }
        Commands::Models { remote } => {
            commands::models::list_models(&config, provider.as_ref(), remote).await?;
        }
        Commands::Clear { yes } => {
            commands::clear::run_clear(&store, yes)?;
        }
        Commands::Rag { .. } => {}
    }

    Ok(())
}

/// Initialize tracing subscriber with environment filter
fn init_tracing(verbose: bool, json: bool) {
    let default_level = if verbose {
        "promptbench=debug"
    } else {
        "promptbench=info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
