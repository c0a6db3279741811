//! Backend normalization layer for agentic CLI tools.
//!
//! Each supported CLI (claude, gemini, opencode) is wrapped by a
//! [`Backend`] that knows how to invoke it and how to translate its native
//! JSON records into [`CanonicalEvent`]s. The [`runner`] drives one
//! invocation and folds the events into a single [`QueryResult`].
//!
//! # Architecture
//!
//! ```text
//! BackendRegistry --get("gemini")--> &dyn Backend
//!     |                                  |
//!     |   run_query(backend, question) --+
//!     |        |
//!     |        v
//!     |   spawn(invocation)
//!     |   stdout -> LineBuffer -> serde_json -> translate()
//!     |        |
//!     |        v
//!     |   CanonicalEvent --> QueryCallbacks (live)
//!     |                  --> QueryResult    (aggregate)
//! ```

pub mod claude;
pub mod error;
pub mod events;
mod fields;
pub mod gemini;
pub mod line_buffer;
pub mod opencode;
pub mod registry;
pub mod runner;
pub mod trait_def;

// Re-export the primary public API at the module level.
pub use claude::ClaudeBackend;
pub use error::QueryError;
pub use events::{CanonicalEvent, QueryResult, ToolEvent};
pub use gemini::GeminiBackend;
pub use line_buffer::LineBuffer;
pub use opencode::OpencodeBackend;
pub use registry::{BackendRegistry, default_backend};
pub use runner::{QueryCallbacks, QueryOptions, run_query};
pub use trait_def::{Backend, Invocation, OutputMode};
