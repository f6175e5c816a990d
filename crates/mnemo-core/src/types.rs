//! ============================================================================
//! Memory Types - Data structures for long-term memory
//! ============================================================================
//! Defines memory entries, storage scopes, operation outcomes, and the host
//! event structures. These types are serialized to JSON for the host's
//! tool-calling surface.
//! ============================================================================

use serde::{Deserialize, Serialize};

/// A single memory entry as returned by the remote store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryItem {
    /// Unique identifier assigned by the backend
    pub id: String,
    /// The actual memory content
    pub memory: String,
    /// Relevance score (0.0 - 1.0), present on search results
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    /// ISO-8601 creation timestamp
    #[serde(rename = "createdAt", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// ISO-8601 last-update timestamp
    #[serde(rename = "updatedAt", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    /// Open key-value map attached by the backend
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

impl MemoryItem {
    /// Recency key for sorting: prefer updated_at, fall back to created_at.
    /// Lexicographic comparison is correct for ISO-8601 timestamps.
    pub fn recency_key(&self) -> &str {
        self.updated_at
            .as_deref()
            .or(self.created_at.as_deref())
            .unwrap_or("")
    }
}

/// Storage scope partitioning the remote namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryScope {
    /// Memories about the user, shared across projects
    User,
    /// Memories bound to the current project/worktree
    Project,
}

impl MemoryScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryScope::User => "user",
            MemoryScope::Project => "project",
        }
    }
}

impl std::fmt::Display for MemoryScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MemoryScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(MemoryScope::User),
            "project" => Ok(MemoryScope::Project),
            _ => Err(format!("Unknown memory scope: {}", s)),
        }
    }
}

/// Outcome of an add operation. Never an Err: failures are carried in-band.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddOutcome {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AddOutcome {
    pub fn success(id: Option<String>) -> Self {
        Self {
            ok: true,
            id,
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            id: None,
            error: Some(error.into()),
        }
    }
}

/// Outcome of a delete/clear operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpOutcome {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl OpOutcome {
    pub fn success() -> Self {
        Self { ok: true, error: None }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(error.into()),
        }
    }
}

/// One part of a chat message coming from the host
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessagePart {
    Text { text: String },
    /// Non-text payloads (images, tool output) pass through untouched
    Other { data: serde_json::Value },
}

/// A chat message event payload from the host. The parts list is mutable so
/// the injection controller can prepend context blocks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub parts: Vec<MessagePart>,
}

impl ChatMessage {
    /// The first textual part, if any
    pub fn first_text(&self) -> Option<&str> {
        self.parts.iter().find_map(|p| match p {
            MessagePart::Text { text } => Some(text.as_str()),
            MessagePart::Other { .. } => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_round_trip() {
        assert_eq!("user".parse::<MemoryScope>().unwrap(), MemoryScope::User);
        assert_eq!(
            "Project".parse::<MemoryScope>().unwrap(),
            MemoryScope::Project
        );
        assert_eq!(MemoryScope::User.as_str(), "user");
        assert!("global".parse::<MemoryScope>().is_err());
    }

    #[test]
    fn test_recency_key_prefers_updated_at() {
        let item = MemoryItem {
            id: "a".to_string(),
            memory: "m".to_string(),
            score: None,
            created_at: Some("2025-01-01T00:00:00Z".to_string()),
            updated_at: Some("2025-06-01T00:00:00Z".to_string()),
            metadata: None,
        };
        assert_eq!(item.recency_key(), "2025-06-01T00:00:00Z");

        let item = MemoryItem {
            updated_at: None,
            ..item
        };
        assert_eq!(item.recency_key(), "2025-01-01T00:00:00Z");

        let item = MemoryItem {
            created_at: None,
            ..item
        };
        assert_eq!(item.recency_key(), "");
    }

    #[test]
    fn test_memory_item_wire_names() {
        let json = serde_json::json!({
            "id": "mem-1",
            "memory": "User prefers dark mode",
            "score": 0.92,
            "createdAt": "2025-03-01T12:00:00Z"
        });
        let item: MemoryItem = serde_json::from_value(json).unwrap();
        assert_eq!(item.id, "mem-1");
        assert_eq!(item.score, Some(0.92));
        assert_eq!(item.created_at.as_deref(), Some("2025-03-01T12:00:00Z"));
        assert!(item.updated_at.is_none());
    }

    #[test]
    fn test_first_text_skips_non_text_parts() {
        let msg = ChatMessage {
            parts: vec![
                MessagePart::Other {
                    data: serde_json::json!({"kind": "image"}),
                },
                MessagePart::Text {
                    text: "hello".to_string(),
                },
            ],
        };
        assert_eq!(msg.first_text(), Some("hello"));
    }
}
