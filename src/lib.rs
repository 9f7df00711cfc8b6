//! QAChat - Terminal client for the QAChat RAG server
//!
//! This library provides the core functionality for the qachat client,
//! including chat session management, streamed reply assembly, knowledge
//! base bookkeeping, and configuration.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `api`: HTTP client for the server's envelope and streaming endpoints
//! - `stream`: Server-sent event framing and reply fragment decoding
//! - `store`: Chat sessions and knowledge data, persisted locally
//! - `commands`: Handlers behind each CLI command
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use qachat::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config/config.yaml", &Default::default())?;
//!     config.validate()?;
//!
//!     // Client usage would go here
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod store;
pub mod stream;

// Re-export commonly used types
pub use api::{ApiClient, KnowledgeApi};
pub use config::Config;
pub use error::{QaChatError, Result};
pub use store::{ChatStore, KnowledgeStore, LocalStore};
