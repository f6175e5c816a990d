//! ============================================================================
//! MNEMO-CORE: Long-Term Memory Pipeline
//! ============================================================================
//! This crate handles the memory retrieval-and-injection pipeline for a
//! conversational agent host:
//! - Timeout-bounded client for the remote scoped memory store
//! - Dual-scope search with dedup and score ranking
//! - Session-scoped idempotent context injection (always-on or
//!   query-triggered)
//! - Secret-scrubbed auto-capture of user messages
//! - JSON tool surface (memory / memory_status / memory_refresh)
//! ============================================================================

pub mod backend;
pub mod capture;
pub mod config;
pub mod deadline;
pub mod inject;
pub mod plugin;
pub mod rank;
pub mod scrub;
pub mod service;
pub mod session;
pub mod tools;
pub mod types;

// Re-export main types for convenience
pub use backend::{HttpBackend, MemoryBackend, ScopeParams};
pub use config::{Config, InjectionMode};
pub use inject::InjectionController;
pub use plugin::MemoryPlugin;
pub use scrub::{scrub, REDACTION_MARKER};
pub use service::{MemoryError, MemoryService};
pub use session::SessionStore;
pub use tools::{MemoryAction, MemoryArgs, MemoryTools};
pub use types::{AddOutcome, ChatMessage, MemoryItem, MemoryScope, MessagePart, OpOutcome};
