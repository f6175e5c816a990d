//! ============================================================================
//! Tool Surface - memory / memory_status / memory_refresh
//! ============================================================================
//! JSON-in/JSON-out entry points for the host's tool-calling mechanism.
//! Argument validation happens before any backend contact; every response
//! carries an `ok` flag instead of raising.
//! ============================================================================

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::{Config, MAX_MEMORY_DISPLAY};
use crate::inject::InjectionController;
use crate::scrub::scrub;
use crate::service::MemoryService;
use crate::session::SessionStore;
use crate::types::{MemoryItem, MemoryScope};

/// Search results echoed through the tool
const TOOL_SEARCH_LIMIT: usize = 10;
/// List results echoed through the tool
const TOOL_LIST_LIMIT: usize = 20;
/// Refresh previews are clipped to this many characters
const PREVIEW_CHARS: usize = 100;

/// Actions accepted by the `memory` tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryAction {
    Search,
    Add,
    Delete,
    List,
    Clear,
}

/// Arguments for the `memory` tool as sent by the host
#[derive(Debug, Clone, Deserialize)]
pub struct MemoryArgs {
    pub action: MemoryAction,
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub memory_id: Option<String>,
    #[serde(default)]
    pub scope: Option<MemoryScope>,
}

/// Tool dispatcher bound to one configured plugin instance
pub struct MemoryTools {
    service: Arc<MemoryService>,
    controller: Arc<InjectionController>,
    sessions: Arc<SessionStore>,
    config: Config,
}

impl MemoryTools {
    pub fn new(
        service: Arc<MemoryService>,
        controller: Arc<InjectionController>,
        sessions: Arc<SessionStore>,
        config: Config,
    ) -> Self {
        Self {
            service,
            controller,
            sessions,
            config,
        }
    }

    /// The `memory` tool: search / add / delete / list / clear
    pub async fn memory(&self, args: MemoryArgs) -> Value {
        let scope = args.scope.unwrap_or(MemoryScope::Project);

        match args.action {
            MemoryAction::Search => {
                let Some(query) = args.query.as_deref().filter(|q| !q.is_empty()) else {
                    return error_response("query is required for search");
                };
                let results = self.service.search(query, TOOL_SEARCH_LIMIT).await;
                listing_response(results)
            }
            MemoryAction::Add => {
                let Some(content) = args.query.as_deref().filter(|q| !q.is_empty()) else {
                    return error_response("query (content) is required for add");
                };
                let scrubbed = scrub(content);
                let outcome = self.service.add(&scrubbed, scope).await;
                json!(outcome)
            }
            MemoryAction::Delete => {
                let Some(memory_id) = args.memory_id.as_deref().filter(|id| !id.is_empty())
                else {
                    return error_response("memory_id is required for delete");
                };
                let outcome = self.service.delete(memory_id).await;
                json!(outcome)
            }
            MemoryAction::List => {
                let results = self.service.get_recent(TOOL_LIST_LIMIT).await;
                listing_response(results)
            }
            MemoryAction::Clear => {
                let outcome = self.service.delete_all(scope).await;
                let mut response = json!(outcome);
                response["scope"] = json!(scope.as_str());
                response
            }
        }
    }

    /// The `memory_status` tool: configuration and cache snapshot
    pub fn memory_status(&self) -> Value {
        json!({
            "ok": true,
            "version": env!("CARGO_PKG_VERSION"),
            "config": {
                "enabled": self.config.enabled,
                "rag_enabled": self.config.rag_enabled,
                "auto_add": self.config.auto_add,
                "mode": self.controller.mode().as_str(),
                "user_id": self.config.user_id,
                "project_id": self.config.project_id,
            },
            "stats": {
                "injected_sessions": self.sessions.injected_count(),
                "cached_memories": self.sessions.shared_count(),
            },
        })
    }

    /// The `memory_refresh` tool: repopulate the shared cache
    pub async fn memory_refresh(&self) -> Value {
        let memories = self.controller.refresh().await;
        let previews: Vec<String> = memories
            .iter()
            .map(|m| m.memory.chars().take(PREVIEW_CHARS).collect())
            .collect();

        json!({
            "ok": true,
            "refreshed": true,
            "count": memories.len(),
            "memories": previews,
        })
    }
}

fn error_response(message: &str) -> Value {
    json!({"ok": false, "error": message})
}

fn listing_response(mut results: Vec<MemoryItem>) -> Value {
    let count = results.len();
    results.truncate(MAX_MEMORY_DISPLAY);
    json!({
        "ok": true,
        "count": count,
        "memories": results,
    })
}
