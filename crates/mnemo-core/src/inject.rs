//! ============================================================================
//! Session Injection Controller
//! ============================================================================
//! Decides, per chat session, whether and what memory content enters the
//! model context. Two strategies share one cache/idempotency discipline:
//!
//! - always-on: top-N recent project memories appended to the system
//!   message list, independent of message content
//! - query-triggered: similarity search keyed on a truncated prefix of the
//!   session's first user message, prepended as a leading content block
//!
//! Injection happens at most once per session through this path; only an
//! explicit refresh repopulates the shared cache, and it never re-injects
//! into sessions already marked.
//! ============================================================================

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::InjectionMode;
use crate::service::MemoryService;
use crate::session::SessionStore;
use crate::types::{ChatMessage, MemoryItem, MessagePart};

/// Longest message prefix used as a similarity query
const QUERY_PREFIX_CHARS: usize = 200;

/// Per-session injection orchestrator
pub struct InjectionController {
    service: Arc<MemoryService>,
    sessions: Arc<SessionStore>,
    mode: InjectionMode,
    limit: usize,
}

impl InjectionController {
    pub fn new(
        service: Arc<MemoryService>,
        sessions: Arc<SessionStore>,
        mode: InjectionMode,
        limit: usize,
    ) -> Self {
        Self {
            service,
            sessions,
            mode,
            limit,
        }
    }

    pub fn mode(&self) -> InjectionMode {
        self.mode
    }

    /// Best-effort pre-warm of the shared cache. Called once at startup.
    pub async fn prewarm(&self) {
        let memories = self.service.get_recent(self.limit).await;
        info!("Pre-warmed memory cache with {} entries", memories.len());
        self.sessions.replace_shared(memories);
    }

    /// System-prompt event: always-on injection of recent project memories
    pub async fn on_system_prompt(&self, session_id: &str, system: &mut Vec<String>) {
        if self.mode != InjectionMode::AlwaysOn {
            return;
        }
        if self.sessions.is_injected(session_id) {
            return;
        }

        let mut memories = self.sessions.shared();
        if memories.is_empty() {
            memories = self.service.get_recent(self.limit).await;
            self.sessions.replace_shared(memories.clone());
        }

        // Single critical section: claim the session and record what it saw.
        // A concurrent event for the same session loses the claim and emits
        // nothing.
        if !self.sessions.try_mark_injected(session_id, memories.clone()) {
            return;
        }

        if memories.is_empty() {
            debug!("No memories to inject for session {}", session_id);
            return;
        }

        info!(
            "Injecting {} memories into session {} system prompt",
            memories.len(),
            session_id
        );
        system.push(format_system_block(&memories));
    }

    /// Chat-message event: query-triggered injection on the first message
    pub async fn on_chat_message(&self, session_id: &str, message: &mut ChatMessage) {
        if self.mode != InjectionMode::QueryTriggered {
            return;
        }
        if self.sessions.is_injected(session_id) {
            return;
        }

        let Some(text) = message.first_text() else {
            return;
        };
        let query: String = text.chars().take(QUERY_PREFIX_CHARS).collect();

        let mut memories = self.sessions.shared();
        if memories.is_empty() {
            memories = self.service.search(&query, self.limit).await;
        }

        if !self.sessions.try_mark_injected(session_id, memories.clone()) {
            return;
        }

        if memories.is_empty() {
            debug!("No memories to inject for session {}", session_id);
            return;
        }

        info!(
            "Injecting {} memories into session {} first message",
            memories.len(),
            session_id
        );
        message.parts.insert(
            0,
            MessagePart::Text {
                text: format_inline_block(&memories),
            },
        );
    }

    /// Re-fetch and overwrite the shared cache. Already-marked sessions keep
    /// what they were served.
    pub async fn refresh(&self) -> Vec<MemoryItem> {
        let memories = self.service.get_recent(self.limit).await;
        info!("Refreshed memory cache: {} entries", memories.len());
        self.sessions.replace_shared(memories.clone());
        memories
    }
}

/// Tagged block appended to the system message list
pub fn format_system_block(memories: &[MemoryItem]) -> String {
    let mut lines = Vec::with_capacity(memories.len() + 3);
    lines.push(format!(
        "<memory scope=\"always-on\" count=\"{}\">",
        memories.len()
    ));
    lines.push("The following memories were retrieved from long-term storage:".to_string());
    for item in memories {
        match item.score {
            Some(score) => lines.push(format!(
                "\u{2022} {} ({}%)",
                item.memory,
                (score * 100.0).round() as i64
            )),
            None => lines.push(format!("\u{2022} {}", item.memory)),
        }
    }
    lines.push("</memory>".to_string());
    lines.join("\n")
}

/// Short-form block prepended to the first user message
pub fn format_inline_block(memories: &[MemoryItem]) -> String {
    let mut lines = Vec::with_capacity(memories.len() + 1);
    lines.push("[Relevant memories from previous sessions]".to_string());
    for item in memories {
        lines.push(format!("- {}", item.memory));
    }
    lines.join("\n")
}
