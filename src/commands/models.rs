//! Model catalog listing

use crate::config::Config;
use crate::error::Result;
use crate::models::ModelConfig;
use crate::providers::Provider;
use colored::Colorize;
use prettytable::{row, Table};

/// List models from the configured catalog or the live backend
///
/// # Arguments
///
/// * `config` - Global configuration holding the catalog
/// * `provider` - Model backend queried when `remote` is set
/// * `remote` - Ask the backend instead of reading the catalog
///
/// # Errors
///
/// Returns error if the backend cannot list its models
pub async fn list_models(config: &Config, provider: &dyn Provider, remote: bool) -> Result<()> {
    let (models, source) = if remote {
        (provider.list_models().await?, provider.name().to_string())
    } else {
        (config.models.clone(), "configuration".to_string())
    };

    if models.is_empty() {
        println!("{}", "No models available.".yellow());
        return Ok(());
    }

    output_models_table(&models, &source, &config.defaults.model);
    Ok(())
}

fn output_models_table(models: &[ModelConfig], source: &str, default_model: &str) {
    let mut table = Table::new();
    table.add_row(row![
        "Model Name",
        "Display Name",
        "Provider",
        "Max Tokens",
        "Streaming"
    ]);

    for model in models {
        let name = if model.name == default_model {
            format!("{} *", model.name)
        } else {
            model.name.clone()
        };
        table.add_row(row![
            name,
            model.display_name,
            model.provider,
            format!("{} tokens", model.max_tokens),
            if model.supports_streaming { "Yes" } else { "No" }
        ]);
    }

    println!("\nAvailable models from {}:\n", source);
    table.printstd();
    println!("* default model\n");
}
