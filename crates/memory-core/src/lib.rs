//! # Memory Core
//!
//! A cognitive memory engine for conversational assistants: a typed memory
//! store with hybrid lexical/vector/prominence retrieval, a typed relation
//! graph with spreading activation, continuous prominence decay, a
//! sleep-cycle consolidation pipeline (NREM clustering + REM exploration),
//! self-reflection, gap-signal scanning, and a proactive scheduler. The
//! `Gardener` ties the background pieces together into three ticks.
//!
//! Every call into a model (LLM completion, embedding, sub-agent execution)
//! goes through a trait in [`llm`] or [`embeddings`]; this crate never owns
//! model weights or provider-specific transport.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use memory_core::store::Store;
//! use memory_core::types::{Category, Memory};
//!
//! let store = Store::open_in_memory()?;
//! let memory = Memory::new("user-1", "prefers direct feedback", Category::Preference);
//! store.add_memory(&memory)?;
//! ```

#![warn(rustdoc::missing_crate_level_docs)]

pub mod clock;
pub mod config;
pub mod decay;
pub mod dream;
pub mod embeddings;
pub mod error;
pub mod gap;
pub mod gardener;
pub mod llm;
pub mod reflection;
pub mod relations;
pub mod scheduler;
pub mod search;
pub mod store;
pub mod types;

pub use config::Config;
pub use error::{CoreError, ProviderError, Result, TickSummary};
pub use gardener::Gardener;
pub use store::{sanitize_fts5_query, Store, StorageError};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Convenient imports for common usage.
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::embeddings::{cosine_similarity, Embedder, EMBEDDING_DIMENSIONS};
    pub use crate::error::{CoreError, ProviderError, Result, TickSummary};
    pub use crate::gardener::Gardener;
    pub use crate::llm::{CompleteRequest, CompleteResponse, LlmProvider, Message, SubAgentExecutor};
    pub use crate::store::{Store, StorageError};
    pub use crate::types::{Category, Memory, MemoryType, Relation, RelationType, SessionSummary};
}
