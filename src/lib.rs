//! Promptbench - prompt playground library
//!
//! This library provides the session store behind the promptbench CLI:
//! prompt executions, multi-turn conversations, and side-by-side model
//! comparisons, kept in memory, mirrored to a durable store, and observable
//! through change subscriptions.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `session`: Session store, comparison fan-out, and change subscriptions
//! - `providers`: Model backend abstraction and implementations (Ollama, playground backend)
//! - `storage`: Durable snapshot stores (sled, SQLite, memory)
//! - `stats`: Dashboard aggregates derived from the collections
//! - `models`: Record types shared by every layer
//! - `telemetry`: Invocation metrics
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli` and `commands`: Command-line interface
//!
//! # Example
//!
//! ```no_run
//! use promptbench::{Config, SessionStore};
//! use promptbench::providers::create_provider;
//! use promptbench::storage::open_store;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.yaml", &Default::default())?;
//!     config.validate()?;
//!
//!     let store = SessionStore::new(
//!         create_provider(&config.provider)?,
//!         open_store(&config.storage)?,
//!     )?;
//!     let execution = store
//!         .execute_prompt("Hello", &config.defaults.model, Default::default())
//!         .await?;
//!     println!("{}", execution.response);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod models;
pub mod providers;
pub mod session;
pub mod stats;
pub mod storage;
pub mod telemetry;

// Re-export commonly used types
pub use config::Config;
pub use error::{PromptbenchError, Result};
pub use models::{Comparison, Conversation, Execution, Message, SamplingParams, TokenUsage};
pub use session::SessionStore;
pub use stats::DashboardStats;

#[cfg(test)]
pub mod test_utils;
