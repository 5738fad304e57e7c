//! Command-line interface definition for Promptbench
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for running, chatting, comparing, and reviewing history.

use clap::{Parser, Subcommand, ValueEnum};

/// Promptbench - run, chat with, and compare text-generation models
///
/// Every run, conversation, and comparison is kept in a local history that
/// the `history` and `stats` commands report on.
#[derive(Parser, Debug, Clone)]
#[command(name = "promptbench")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Override the history database location
    #[arg(long, env = "PROMPTBENCH_STORAGE_PATH")]
    pub storage_path: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for Promptbench
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run one prompt against one model
    Run {
        /// Prompt text
        prompt: String,

        /// Model to use (defaults to the configured model)
        #[arg(short, long)]
        model: Option<String>,

        /// Sampling temperature
        #[arg(short, long)]
        temperature: Option<f32>,

        /// Maximum output tokens
        #[arg(long)]
        max_tokens: Option<u32>,

        /// Label the execution (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
    },

    /// Start an interactive conversation
    Chat {
        /// Model for a new conversation (defaults to the configured model)
        #[arg(short, long)]
        model: Option<String>,

        /// Continue an existing conversation by id or id prefix
        #[arg(short, long, conflicts_with = "model")]
        resume: Option<String>,

        /// Title for a new conversation
        #[arg(long)]
        title: Option<String>,
    },

    /// Run one prompt against several models at once
    Compare {
        /// Prompt text
        prompt: String,

        /// Models to compare (repeat or comma-separate, at least two)
        #[arg(short, long = "model", value_delimiter = ',', required = true)]
        models: Vec<String>,

        /// Sampling temperature
        #[arg(short, long)]
        temperature: Option<f32>,

        /// Maximum output tokens
        #[arg(long)]
        max_tokens: Option<u32>,
    },

    /// Browse and edit saved history
    History {
        /// History subcommand
        #[command(subcommand)]
        command: HistoryCommand,
    },

    /// Show usage statistics
    Stats {
        /// Print as JSON instead of tables
        #[arg(long)]
        json: bool,
    },

    /// List available models
    Models {
        /// Ask the backend instead of reading the configured catalog
        #[arg(short, long)]
        remote: bool,
    },

    /// Delete all saved history
    Clear {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Ask a question answered from the backend's document index
    Rag {
        /// Question text
        query: String,

        /// Number of passages to retrieve
        #[arg(short = 'k', long, default_value_t = 3)]
        top_k: usize,

        /// Model that writes the answer (defaults to the configured model)
        #[arg(short, long)]
        model: Option<String>,
    },
}

/// Which collection a history command addresses
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryKind {
    /// Single-shot executions
    Executions,
    /// Conversations
    Conversations,
    /// Comparisons
    Comparisons,
}

/// History subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum HistoryCommand {
    /// List saved records, most recent first
    List {
        /// Only list one kind of record
        #[arg(short, long, value_enum)]
        kind: Option<HistoryKind>,

        /// Maximum rows per kind
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },

    /// Show one record in full
    Show {
        /// Record id or id prefix
        id: String,
    },

    /// Delete one record
    Delete {
        /// Record id or id prefix
        id: String,
    },

    /// Rename a conversation
    Rename {
        /// Conversation id or id prefix
        id: String,

        /// New title
        title: String,
    },
}

impl Cli {
    /// Parse command line arguments
    ///
    /// # Returns
    ///
    /// Returns the parsed CLI structure
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: Some("config/config.yaml".to_string()),
            verbose: false,
            storage_path: None,
            command: Commands::Stats { json: false },
        }
    }
}
