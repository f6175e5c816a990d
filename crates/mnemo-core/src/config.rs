//! ============================================================================
//! Configuration - Environment-driven settings, read once at startup
//! ============================================================================
//! MNEMO_API_KEY        required; absence disables the whole plugin
//! MNEMO_USER_ID        defaults to "anonymous"
//! MNEMO_PROJECT_ID     defaults to a hash of the host's worktree path
//! MNEMO_ENABLED        "false" disables everything
//! MNEMO_RAG_ENABLED    "false" disables context injection
//! MNEMO_AUTO_ADD       "false" disables auto-capture
//! MNEMO_MODE           "always-on" (default) or "query"
//! MNEMO_TIMEOUT_MS     per-call budget, default 10000
//! MNEMO_API_BASE       override for self-hosted backends
//! ============================================================================

use sha2::{Digest, Sha256};

use crate::deadline::DEFAULT_TIMEOUT_MS;

/// Messages longer than this are never auto-captured
pub const MAX_MESSAGE_LENGTH: usize = 2000;
/// Scrubbed messages at or below this length carry no persistable fact
pub const MIN_CAPTURE_LENGTH: usize = 10;
/// How many memories the injection paths fetch
pub const RAG_INJECT_LIMIT: usize = 10;
/// Cap on memories echoed through the tool surface
pub const MAX_MEMORY_DISPLAY: usize = 50;

/// Which injection strategy the plugin runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectionMode {
    /// Recent project memories go into every session's system prompt
    AlwaysOn,
    /// First user message triggers a similarity search
    QueryTriggered,
}

impl InjectionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            InjectionMode::AlwaysOn => "always-on",
            InjectionMode::QueryTriggered => "query",
        }
    }
}

impl std::str::FromStr for InjectionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "always-on" | "always_on" | "always" => Ok(InjectionMode::AlwaysOn),
            "query" | "query-triggered" | "query_triggered" => Ok(InjectionMode::QueryTriggered),
            _ => Err(format!("Unknown injection mode: {}", s)),
        }
    }
}

/// Plugin configuration, resolved once at startup
#[derive(Debug, Clone)]
pub struct Config {
    /// Backend API key; None disables the plugin entirely
    pub api_key: Option<String>,
    pub user_id: String,
    pub project_id: String,
    pub enabled: bool,
    pub rag_enabled: bool,
    pub auto_add: bool,
    pub mode: InjectionMode,
    pub timeout_ms: u64,
    /// Self-hosted backend override
    pub api_base: Option<String>,
}

impl Config {
    /// Read configuration from the process environment. `worktree` is the
    /// host-provided project path, used to derive a project id when none is
    /// configured.
    pub fn from_env(worktree: Option<&str>) -> Self {
        let api_key = std::env::var("MNEMO_API_KEY").ok().filter(|k| !k.is_empty());
        let user_id =
            std::env::var("MNEMO_USER_ID").unwrap_or_else(|_| "anonymous".to_string());
        let project_id = std::env::var("MNEMO_PROJECT_ID")
            .ok()
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| project_id_from_path(worktree.unwrap_or("default")));

        let mode = std::env::var("MNEMO_MODE")
            .ok()
            .and_then(|m| m.parse().ok())
            .unwrap_or(InjectionMode::AlwaysOn);

        let timeout_ms = std::env::var("MNEMO_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_MS);

        Self {
            api_key,
            user_id,
            project_id,
            enabled: flag(std::env::var("MNEMO_ENABLED").ok()),
            rag_enabled: flag(std::env::var("MNEMO_RAG_ENABLED").ok()),
            auto_add: flag(std::env::var("MNEMO_AUTO_ADD").ok()),
            mode,
            timeout_ms,
            api_base: std::env::var("MNEMO_API_BASE").ok().filter(|b| !b.is_empty()),
        }
    }
}

/// Feature toggles default to on; only the literal "false" disables
fn flag(value: Option<String>) -> bool {
    value.as_deref() != Some("false")
}

/// Stable project identifier derived from a worktree path
pub fn project_id_from_path(path: &str) -> String {
    let digest = Sha256::digest(path.as_bytes());
    hex::encode(&digest[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_defaults_on() {
        assert!(flag(None));
        assert!(flag(Some("true".to_string())));
        assert!(flag(Some("1".to_string())));
        assert!(!flag(Some("false".to_string())));
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!(
            "always-on".parse::<InjectionMode>().unwrap(),
            InjectionMode::AlwaysOn
        );
        assert_eq!(
            "query".parse::<InjectionMode>().unwrap(),
            InjectionMode::QueryTriggered
        );
        assert!("hybrid".parse::<InjectionMode>().is_err());
    }

    #[test]
    fn test_project_id_is_stable_and_short() {
        let a = project_id_from_path("/home/alice/projects/demo");
        let b = project_id_from_path("/home/alice/projects/demo");
        let c = project_id_from_path("/home/alice/projects/other");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 16);
        assert!(a.chars().all(|ch| ch.is_ascii_hexdigit()));
    }
}
