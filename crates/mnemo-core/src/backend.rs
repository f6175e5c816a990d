//! ============================================================================
//! Memory Backend - Remote scoped memory store client
//! ============================================================================
//! The `MemoryBackend` trait is the seam between the pipeline and the wire:
//! the HTTP client implements it against the hosted memory API, tests
//! substitute scripted backends. Raw responses are returned as untyped JSON;
//! shape normalization happens one layer up.
//! ============================================================================

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

/// Hosted memory API base URL
const DEFAULT_API_BASE: &str = "https://api.mem0.ai";

/// Scope tags attached to every remote call. User scope carries only the
/// user id; project scope adds the project id as a run tag.
#[derive(Debug, Clone, Serialize)]
pub struct ScopeParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
}

impl ScopeParams {
    pub fn user(user_id: &str) -> Self {
        Self {
            user_id: Some(user_id.to_string()),
            run_id: None,
        }
    }

    pub fn project(user_id: &str, project_id: &str) -> Self {
        Self {
            user_id: Some(user_id.to_string()),
            run_id: Some(project_id.to_string()),
        }
    }

    /// Query-string form for GET/DELETE endpoints
    fn as_query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(user_id) = &self.user_id {
            query.push(("user_id", user_id.clone()));
        }
        if let Some(run_id) = &self.run_id {
            query.push(("run_id", run_id.clone()));
        }
        query
    }
}

/// Raw operations against the remote store
#[async_trait]
pub trait MemoryBackend: Send + Sync {
    /// Submit new content; the response shape varies by backend version
    async fn add(&self, content: &str, scope: &ScopeParams) -> Result<Value>;

    /// Semantic search within one scope
    async fn search(&self, query: &str, scope: &ScopeParams, limit: usize) -> Result<Value>;

    /// List stored memories within one scope
    async fn get_all(&self, scope: &ScopeParams, limit: usize) -> Result<Value>;

    /// Delete a single memory by id
    async fn delete(&self, memory_id: &str) -> Result<()>;

    /// Delete every memory within one scope
    async fn delete_all(&self, scope: &ScopeParams) -> Result<()>;
}

#[derive(Debug, Serialize)]
struct AddRequest<'a> {
    messages: Vec<AddMessage<'a>>,
    #[serde(flatten)]
    scope: &'a ScopeParams,
}

#[derive(Debug, Serialize)]
struct AddMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    limit: usize,
    #[serde(flatten)]
    scope: &'a ScopeParams,
}

/// HTTP client for the hosted memory API
pub struct HttpBackend {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl HttpBackend {
    /// Create a client against the default API endpoint
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_API_BASE.to_string())
    }

    /// Create a client against a custom endpoint (self-hosted deployments)
    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url,
        }
    }

    fn auth_header(&self) -> String {
        format!("Token {}", self.api_key)
    }

    /// Read a response body as JSON, mapping API errors to readable messages
    async fn read_json(response: reqwest::Response, context: &str) -> Result<Value> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| anyhow!("Failed to read {} response: {}", context, e))?;

        if !status.is_success() {
            return Err(anyhow!("Memory API error on {} ({}): {}", context, status, body));
        }

        serde_json::from_str(&body)
            .map_err(|e| anyhow!("Failed to parse {} response: {} - body: {}", context, e, body))
    }
}

#[async_trait]
impl MemoryBackend for HttpBackend {
    async fn add(&self, content: &str, scope: &ScopeParams) -> Result<Value> {
        debug!("Adding memory ({} chars)", content.len());

        let request = AddRequest {
            messages: vec![AddMessage {
                role: "user",
                content,
            }],
            scope,
        };

        let response = self
            .client
            .post(format!("{}/v1/memories/", self.base_url))
            .header("Authorization", self.auth_header())
            .json(&request)
            .send()
            .await
            .map_err(|e| anyhow!("Failed to send add request: {}", e))?;

        Self::read_json(response, "add").await
    }

    async fn search(&self, query: &str, scope: &ScopeParams, limit: usize) -> Result<Value> {
        debug!("Searching memories (limit: {})", limit);

        let request = SearchRequest { query, limit, scope };

        let response = self
            .client
            .post(format!("{}/v1/memories/search/", self.base_url))
            .header("Authorization", self.auth_header())
            .json(&request)
            .send()
            .await
            .map_err(|e| anyhow!("Failed to send search request: {}", e))?;

        Self::read_json(response, "search").await
    }

    async fn get_all(&self, scope: &ScopeParams, limit: usize) -> Result<Value> {
        debug!("Listing memories (limit: {})", limit);

        let mut query = scope.as_query();
        query.push(("limit", limit.to_string()));

        let response = self
            .client
            .get(format!("{}/v1/memories/", self.base_url))
            .header("Authorization", self.auth_header())
            .query(&query)
            .send()
            .await
            .map_err(|e| anyhow!("Failed to send list request: {}", e))?;

        Self::read_json(response, "list").await
    }

    async fn delete(&self, memory_id: &str) -> Result<()> {
        debug!("Deleting memory {}", memory_id);

        let response = self
            .client
            .delete(format!("{}/v1/memories/{}/", self.base_url, memory_id))
            .header("Authorization", self.auth_header())
            .send()
            .await
            .map_err(|e| anyhow!("Failed to send delete request: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Memory API error on delete ({}): {}", status, body));
        }
        Ok(())
    }

    async fn delete_all(&self, scope: &ScopeParams) -> Result<()> {
        debug!("Deleting all memories in scope {:?}", scope);

        let response = self
            .client
            .delete(format!("{}/v1/memories/", self.base_url))
            .header("Authorization", self.auth_header())
            .query(&scope.as_query())
            .send()
            .await
            .map_err(|e| anyhow!("Failed to send delete-all request: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Memory API error on delete-all ({}): {}", status, body));
        }
        Ok(())
    }
}
