//! Knowledge service queries and the executor that answers them.
//!
//! The executor is the engine's only outbound dependency on an LLM or other
//! knowledge service. How it talks to that service is its own business.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::QueryExecutionError;

/// A stored extraction query bound to a knowledge service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeServiceQuery {
    pub query_id: String,

    pub name: String,

    /// Which knowledge service answers this query
    pub knowledge_service_id: String,

    /// The extraction prompt
    pub prompt: String,

    /// Service-specific settings (model, temperature, ...)
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub query_metadata: serde_json::Map<String, serde_json::Value>,

    /// Text to prime the assistant's reply with
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assistant_prompt: Option<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl KnowledgeServiceQuery {
    pub fn new(
        query_id: impl Into<String>,
        name: impl Into<String>,
        knowledge_service_id: impl Into<String>,
        prompt: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            query_id: query_id.into(),
            name: name.into(),
            knowledge_service_id: knowledge_service_id.into(),
            prompt: prompt.into(),
            query_metadata: serde_json::Map::new(),
            assistant_prompt: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_assistant_prompt(mut self, priming: impl Into<String>) -> Self {
        self.assistant_prompt = Some(priming.into());
        self
    }
}

/// Everything the executor needs to answer one pointer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub query_id: String,

    pub knowledge_service_id: String,

    pub prompt: String,

    /// Raw source document content
    #[serde(skip)]
    pub source_content: Vec<u8>,

    /// Structured-output guidance; executors may ignore it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assistant_priming: Option<String>,

    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub query_metadata: serde_json::Map<String, serde_json::Value>,
}

/// The knowledge service's answer to one query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    pub query_id: String,

    pub query_text: String,

    /// Either a JSON value or a string holding JSON
    pub result_data: serde_json::Value,

    pub execution_time_ms: u64,

    pub created_at: DateTime<Utc>,
}

/// The external knowledge service.
///
/// Implementations: provider SDK clients, HTTP services, scripted stubs.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// A human-readable name for this executor.
    fn name(&self) -> &str;

    /// Answer one extraction request.
    async fn execute(
        &self,
        request: QueryRequest,
    ) -> std::result::Result<QueryResult, QueryExecutionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_builder_sets_priming() {
        let q = KnowledgeServiceQuery::new("q1", "Title", "anthropic", "Extract the title")
            .with_assistant_prompt("{\"title\": \"");
        assert_eq!(q.assistant_prompt.as_deref(), Some("{\"title\": \""));
        assert!(q.query_metadata.is_empty());
    }

    #[test]
    fn request_serialization_omits_content() {
        let req = QueryRequest {
            query_id: "q1".into(),
            knowledge_service_id: "svc".into(),
            prompt: "Extract".into(),
            source_content: b"secret body".to_vec(),
            response_schema: Some(serde_json::json!({ "type": "object" })),
            assistant_priming: None,
            query_metadata: serde_json::Map::new(),
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(!json.contains("secret"));
        assert!(json.contains("response_schema"));
        assert!(!json.contains("assistant_priming"));
    }
}
