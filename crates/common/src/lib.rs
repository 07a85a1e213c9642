//! Shared library for the curation pipeline and its thin read API.
//!
//! - Layered configuration ([`config`])
//! - Error taxonomy ([`errors`])
//! - Persistence gateway: sea-orm models + repository ([`db`])
//! - Embedding client abstraction ([`embeddings`])
//! - Structured logging init ([`logging`])
//! - Metrics facade ([`metrics`])
//! - Shared backoff schedule ([`retry`])
//! - Env/ARN secret resolution ([`secrets`])

pub mod config;
pub mod db;
pub mod embeddings;
pub mod errors;
pub mod logging;
pub mod metrics;
pub mod retry;
pub mod secrets;

pub use config::PipelineConfig;
pub use db::{DbPool, Repository};
pub use embeddings::Embedder;
pub use errors::{PipelineError, Result};

/// Crate version, surfaced in startup logs.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
