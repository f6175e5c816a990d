//! ============================================================================
//! Plugin Assembly - Wiring, activation gate, host hooks
//! ============================================================================
//! Builds the service/controller/session stack from a resolved config.
//! A missing API key (or enabled=false) deactivates the plugin: init
//! returns None and the host simply has no hooks to call. Nothing in here
//! ever raises into the host.
//! ============================================================================

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::backend::{HttpBackend, MemoryBackend};
use crate::capture::{capture_eligible, spawn_capture};
use crate::config::{Config, RAG_INJECT_LIMIT};
use crate::inject::InjectionController;
use crate::service::MemoryService;
use crate::session::SessionStore;
use crate::tools::{MemoryArgs, MemoryTools};
use crate::types::ChatMessage;

/// A fully wired memory plugin instance
pub struct MemoryPlugin {
    config: Config,
    service: Arc<MemoryService>,
    controller: Arc<InjectionController>,
    sessions: Arc<SessionStore>,
    tools: MemoryTools,
}

impl MemoryPlugin {
    /// Build against the hosted HTTP backend. Returns None when the plugin
    /// is unconfigured or disabled.
    pub fn init(config: Config) -> Option<Self> {
        let api_key = match &config.api_key {
            Some(key) => key.clone(),
            None => {
                warn!("MNEMO_API_KEY not set, plugin disabled");
                return None;
            }
        };

        let backend: Arc<dyn MemoryBackend> = match &config.api_base {
            Some(base) => Arc::new(HttpBackend::with_base_url(api_key, base.clone())),
            None => Arc::new(HttpBackend::new(api_key)),
        };

        Self::init_with_backend(config, backend)
    }

    /// Build against an arbitrary backend (tests, self-hosted stores)
    pub fn init_with_backend(config: Config, backend: Arc<dyn MemoryBackend>) -> Option<Self> {
        if !config.enabled {
            info!("Memory plugin disabled by configuration");
            return None;
        }
        if config.api_key.is_none() {
            warn!("No API key configured, plugin disabled");
            return None;
        }

        let service = Arc::new(MemoryService::with_timeout(
            backend,
            config.user_id.clone(),
            config.project_id.clone(),
            Duration::from_millis(config.timeout_ms),
        ));
        let sessions = Arc::new(SessionStore::new());
        let controller = Arc::new(InjectionController::new(
            service.clone(),
            sessions.clone(),
            config.mode,
            RAG_INJECT_LIMIT,
        ));

        // Best-effort cache pre-warm; failures leave the cache empty and the
        // first session fetches instead.
        if config.rag_enabled {
            let controller = controller.clone();
            tokio::spawn(async move {
                controller.prewarm().await;
            });
        }

        info!(
            "Memory plugin active (user: {}, project: {}, mode: {})",
            config.user_id,
            config.project_id,
            config.mode.as_str()
        );

        let tools = MemoryTools::new(
            service.clone(),
            controller.clone(),
            sessions.clone(),
            config.clone(),
        );

        Some(Self {
            config,
            service,
            controller,
            sessions,
            tools,
        })
    }

    /// Host hook: system prompt assembly for a session
    pub async fn on_system_prompt(&self, session_id: &str, system: &mut Vec<String>) {
        if !self.config.rag_enabled {
            return;
        }
        self.controller.on_system_prompt(session_id, system).await;
    }

    /// Host hook: an inbound chat message for a session. Runs the
    /// query-triggered injection (if that mode is active) and then the
    /// auto-capture gate; capture is submitted without awaiting.
    pub async fn on_chat_message(&self, session_id: &str, message: &mut ChatMessage) {
        if self.config.rag_enabled {
            self.controller.on_chat_message(session_id, message).await;
        }

        if self.config.auto_add {
            if let Some(text) = message.first_text() {
                if let Some(scrubbed) = capture_eligible(text) {
                    spawn_capture(self.service.clone(), scrubbed);
                }
            }
        }
    }

    /// Tool dispatch: the `memory` tool
    pub async fn tool_memory(&self, args: MemoryArgs) -> serde_json::Value {
        self.tools.memory(args).await
    }

    /// Tool dispatch: the `memory_status` tool
    pub fn tool_memory_status(&self) -> serde_json::Value {
        self.tools.memory_status()
    }

    /// Tool dispatch: the `memory_refresh` tool
    pub async fn tool_memory_refresh(&self) -> serde_json::Value {
        self.tools.memory_refresh().await
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn service(&self) -> &MemoryService {
        &self.service
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }
}
