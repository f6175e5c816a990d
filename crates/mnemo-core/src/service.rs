//! ============================================================================
//! Memory Service - Timeout-bounded facade over the backend
//! ============================================================================
//! Sole authorized path to the remote store. Every call races a deadline;
//! timeouts and transport errors degrade to empty results or failed outcome
//! values and are logged locally. Nothing here propagates an error to the
//! caller: memory must never block the primary chat flow.
//! ============================================================================

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use crate::backend::{MemoryBackend, ScopeParams};
use crate::deadline::{with_deadline, Deadline, DEFAULT_TIMEOUT_MS};
use crate::rank::{merge_ranked, normalize, sort_recent};
use crate::types::{AddOutcome, MemoryItem, MemoryScope, OpOutcome};

/// Failure modes surfaced through outcome values. Callers only ever see the
/// rendered message; the chat flow is never interrupted.
#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    #[error("Timeout or API error")]
    Timeout,
    #[error("{0}")]
    Backend(String),
}

/// Fail-open facade over a memory backend
pub struct MemoryService {
    backend: Arc<dyn MemoryBackend>,
    user_id: String,
    project_id: String,
    timeout: Duration,
}

impl MemoryService {
    /// Create a service with the default call budget
    pub fn new(backend: Arc<dyn MemoryBackend>, user_id: String, project_id: String) -> Self {
        Self::with_timeout(
            backend,
            user_id,
            project_id,
            Duration::from_millis(DEFAULT_TIMEOUT_MS),
        )
    }

    /// Create a service with a custom per-call budget
    pub fn with_timeout(
        backend: Arc<dyn MemoryBackend>,
        user_id: String,
        project_id: String,
        timeout: Duration,
    ) -> Self {
        Self {
            backend,
            user_id,
            project_id,
            timeout,
        }
    }

    fn scope_params(&self, scope: MemoryScope) -> ScopeParams {
        match scope {
            MemoryScope::User => ScopeParams::user(&self.user_id),
            MemoryScope::Project => ScopeParams::project(&self.user_id, &self.project_id),
        }
    }

    /// Submit content to the given scope. Timeouts and transport errors come
    /// back as a failed outcome, never as an Err.
    pub async fn add(&self, content: &str, scope: MemoryScope) -> AddOutcome {
        let params = self.scope_params(scope);

        match with_deadline(self.backend.add(content, &params), self.timeout).await {
            Deadline::Completed(Ok(response)) => {
                let id = extract_created_id(&response);
                debug!("Memory added to {} scope (id: {:?})", scope, id);
                AddOutcome::success(id)
            }
            Deadline::Completed(Err(e)) => {
                warn!("Memory add failed: {}", e);
                AddOutcome::failure(MemoryError::Backend(e.to_string()).to_string())
            }
            Deadline::TimedOut => {
                warn!("Memory add timed out after {:?}", self.timeout);
                AddOutcome::failure(MemoryError::Timeout.to_string())
            }
        }
    }

    /// Dual-scope semantic search: user and project queries run concurrently,
    /// each branch degrades to empty on its own failure, results are merged
    /// with user scope winning duplicate ids.
    pub async fn search(&self, query: &str, limit: usize) -> Vec<MemoryItem> {
        let user_params = self.scope_params(MemoryScope::User);
        let project_params = self.scope_params(MemoryScope::Project);

        let (user_response, project_response) = tokio::join!(
            with_deadline(self.backend.search(query, &user_params, limit), self.timeout),
            with_deadline(
                self.backend.search(query, &project_params, limit),
                self.timeout
            ),
        );

        let user_results = self.settle("search(user)", user_response);
        let project_results = self.settle("search(project)", project_response);

        merge_ranked(user_results, project_results, limit)
    }

    /// Most-recently-touched project memories, newest first
    pub async fn get_recent(&self, limit: usize) -> Vec<MemoryItem> {
        let params = self.scope_params(MemoryScope::Project);

        let response =
            with_deadline(self.backend.get_all(&params, limit), self.timeout).await;
        let items = self.settle("list", response);

        sort_recent(items, limit)
    }

    /// Delete a single memory by id
    pub async fn delete(&self, memory_id: &str) -> OpOutcome {
        match with_deadline(self.backend.delete(memory_id), self.timeout).await {
            Deadline::Completed(Ok(())) => OpOutcome::success(),
            Deadline::Completed(Err(e)) => {
                warn!("Memory delete failed: {}", e);
                OpOutcome::failure(MemoryError::Backend(e.to_string()).to_string())
            }
            Deadline::TimedOut => {
                warn!("Memory delete timed out after {:?}", self.timeout);
                OpOutcome::failure(MemoryError::Timeout.to_string())
            }
        }
    }

    /// Delete every memory in a scope. Bulk work gets double the budget.
    pub async fn delete_all(&self, scope: MemoryScope) -> OpOutcome {
        let params = self.scope_params(scope);

        match with_deadline(self.backend.delete_all(&params), self.timeout * 2).await {
            Deadline::Completed(Ok(())) => OpOutcome::success(),
            Deadline::Completed(Err(e)) => {
                warn!("Memory clear failed for {} scope: {}", scope, e);
                OpOutcome::failure(MemoryError::Backend(e.to_string()).to_string())
            }
            Deadline::TimedOut => {
                warn!("Memory clear timed out after {:?}", self.timeout * 2);
                OpOutcome::failure(MemoryError::Timeout.to_string())
            }
        }
    }

    /// Collapse a deadline-bounded raw response into normalized items,
    /// logging the failure modes
    fn settle(
        &self,
        operation: &str,
        outcome: Deadline<anyhow::Result<Value>>,
    ) -> Vec<MemoryItem> {
        match outcome {
            Deadline::Completed(Ok(response)) => normalize(response),
            Deadline::Completed(Err(e)) => {
                warn!("Memory {} failed: {}", operation, e);
                Vec::new()
            }
            Deadline::TimedOut => {
                warn!("Memory {} timed out after {:?}", operation, self.timeout);
                Vec::new()
            }
        }
    }
}

/// Pull the created entry's id out of the known add-response shapes:
/// `{results:[{id}]}`, then a top-level `{id}`, then `[{event_id}]`.
fn extract_created_id(response: &Value) -> Option<String> {
    if let Some(id) = response
        .get("results")
        .and_then(|r| r.get(0))
        .and_then(|entry| entry.get("id"))
        .and_then(Value::as_str)
    {
        return Some(id.to_string());
    }

    if let Some(id) = response.get("id").and_then(Value::as_str) {
        return Some(id.to_string());
    }

    response
        .get(0)
        .and_then(|entry| entry.get("event_id"))
        .and_then(Value::as_str)
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scripted backend: fixed responses per scope, optional latency,
    /// call counting.
    struct ScriptedBackend {
        user_search: Value,
        project_search: Value,
        list_response: Value,
        add_response: anyhow::Result<Value>,
        latency: Duration,
        calls: AtomicUsize,
    }

    impl Default for ScriptedBackend {
        fn default() -> Self {
            Self {
                user_search: json!([]),
                project_search: json!([]),
                list_response: json!([]),
                add_response: Ok(json!({"results": [{"id": "new-1", "event": "ADD"}]})),
                latency: Duration::ZERO,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl MemoryBackend for ScriptedBackend {
        async fn add(&self, _content: &str, _scope: &ScopeParams) -> anyhow::Result<Value> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.latency).await;
            match &self.add_response {
                Ok(v) => Ok(v.clone()),
                Err(e) => Err(anyhow!("{}", e)),
            }
        }

        async fn search(
            &self,
            _query: &str,
            scope: &ScopeParams,
            _limit: usize,
        ) -> anyhow::Result<Value> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.latency).await;
            if scope.run_id.is_some() {
                Ok(self.project_search.clone())
            } else {
                Ok(self.user_search.clone())
            }
        }

        async fn get_all(&self, _scope: &ScopeParams, _limit: usize) -> anyhow::Result<Value> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.latency).await;
            Ok(self.list_response.clone())
        }

        async fn delete(&self, _memory_id: &str) -> anyhow::Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn delete_all(&self, _scope: &ScopeParams) -> anyhow::Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.latency).await;
            Ok(())
        }
    }

    fn service(backend: ScriptedBackend) -> MemoryService {
        MemoryService::with_timeout(
            Arc::new(backend),
            "alice".to_string(),
            "p123".to_string(),
            Duration::from_millis(50),
        )
    }

    #[tokio::test]
    async fn test_search_merges_scopes_user_wins() {
        let backend = ScriptedBackend {
            user_search: json!([{"id": "a", "memory": "tip", "score": 0.9}]),
            project_search: json!({"results": [
                {"id": "a", "memory": "tip", "score": 0.5},
                {"id": "b", "memory": "other", "score": 0.7}
            ]}),
            ..Default::default()
        };

        let results = service(backend).search("debugging tips", 2).await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, "a");
        assert_eq!(results[0].score, Some(0.9));
        assert_eq!(results[1].id, "b");
    }

    #[tokio::test]
    async fn test_search_timeout_degrades_to_empty() {
        let backend = ScriptedBackend {
            user_search: json!([{"id": "a", "memory": "tip", "score": 0.9}]),
            latency: Duration::from_millis(500),
            ..Default::default()
        };

        let results = service(backend).search("anything", 5).await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_add_extracts_id_from_wrapped_shape() {
        let outcome = service(ScriptedBackend::default())
            .add("User prefers dark mode", MemoryScope::Project)
            .await;
        assert!(outcome.ok);
        assert_eq!(outcome.id.as_deref(), Some("new-1"));
    }

    #[tokio::test]
    async fn test_add_failure_is_in_band() {
        let backend = ScriptedBackend {
            add_response: Err(anyhow!("429 too many requests")),
            ..Default::default()
        };
        let outcome = service(backend).add("text", MemoryScope::User).await;
        assert!(!outcome.ok);
        assert!(outcome.error.unwrap().contains("429"));
    }

    #[tokio::test]
    async fn test_add_timeout_is_in_band() {
        let backend = ScriptedBackend {
            latency: Duration::from_millis(500),
            ..Default::default()
        };
        let outcome = service(backend).add("text", MemoryScope::Project).await;
        assert!(!outcome.ok);
        assert!(outcome.error.is_some());
    }

    #[tokio::test]
    async fn test_get_recent_orders_and_truncates() {
        let backend = ScriptedBackend {
            list_response: json!({"results": [
                {"id": "old", "memory": "m", "createdAt": "2024-01-01T00:00:00Z"},
                {"id": "new", "memory": "m", "createdAt": "2025-06-01T00:00:00Z"},
                {"id": "mid", "memory": "m", "createdAt": "2025-01-01T00:00:00Z"}
            ]}),
            ..Default::default()
        };

        let recent = service(backend).get_recent(2).await;
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].id, "new");
        assert_eq!(recent[1].id, "mid");
    }

    #[test]
    fn test_extract_created_id_shapes() {
        assert_eq!(
            extract_created_id(&json!({"results": [{"id": "r1"}]})).as_deref(),
            Some("r1")
        );
        assert_eq!(extract_created_id(&json!({"id": "top"})).as_deref(), Some("top"));
        assert_eq!(
            extract_created_id(&json!([{"event_id": "e1"}])).as_deref(),
            Some("e1")
        );
        assert_eq!(extract_created_id(&json!({"results": []})), None);
        assert_eq!(extract_created_id(&json!(null)), None);
    }
}
