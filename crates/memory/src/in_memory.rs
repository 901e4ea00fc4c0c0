//! In-memory repositories for tests and ephemeral runs.
//!
//! Each repository is a `HashMap` behind a tokio `RwLock`, keyed by the
//! entity's id. Saving an existing id replaces the stored value.

use async_trait::async_trait;
use schemaloom_core::error::RepositoryError;
use schemaloom_core::repository::{
    AssemblyRepository, DocumentRepository, QueryRepository, SpecificationRepository,
};
use schemaloom_core::{Assembly, AssemblySpecification, Document, KnowledgeServiceQuery};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Documents keyed by `document_id`.
pub struct InMemoryDocumentRepository {
    documents: Arc<RwLock<HashMap<String, Document>>>,
}

impl InMemoryDocumentRepository {
    pub fn new() -> Self {
        Self {
            documents: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }
}

impl Default for InMemoryDocumentRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentRepository for InMemoryDocumentRepository {
    async fn get(&self, document_id: &str) -> Result<Option<Document>, RepositoryError> {
        Ok(self.documents.read().await.get(document_id).cloned())
    }

    async fn save(&self, mut document: Document) -> Result<String, RepositoryError> {
        if document.document_id.is_empty() {
            document.document_id = Uuid::new_v4().to_string();
        }
        let id = document.document_id.clone();
        self.documents.write().await.insert(id.clone(), document);
        Ok(id)
    }
}

/// Specifications keyed by `assembly_specification_id`; only valid
/// specifications are accepted.
pub struct InMemorySpecificationRepository {
    specifications: Arc<RwLock<HashMap<String, AssemblySpecification>>>,
}

impl InMemorySpecificationRepository {
    pub fn new() -> Self {
        Self {
            specifications: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemorySpecificationRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SpecificationRepository for InMemorySpecificationRepository {
    async fn get(
        &self,
        specification_id: &str,
    ) -> Result<Option<AssemblySpecification>, RepositoryError> {
        Ok(self.specifications.read().await.get(specification_id).cloned())
    }

    async fn save(&self, specification: AssemblySpecification) -> Result<(), RepositoryError> {
        specification.validate()?;
        self.specifications
            .write()
            .await
            .insert(specification.assembly_specification_id.clone(), specification);
        Ok(())
    }
}

/// Knowledge service queries keyed by `query_id`.
pub struct InMemoryQueryRepository {
    queries: Arc<RwLock<HashMap<String, KnowledgeServiceQuery>>>,
}

impl InMemoryQueryRepository {
    pub fn new() -> Self {
        Self {
            queries: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryQueryRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QueryRepository for InMemoryQueryRepository {
    async fn get(&self, query_id: &str) -> Result<Option<KnowledgeServiceQuery>, RepositoryError> {
        Ok(self.queries.read().await.get(query_id).cloned())
    }

    async fn save(&self, query: KnowledgeServiceQuery) -> Result<(), RepositoryError> {
        if query.query_id.is_empty() {
            return Err(RepositoryError::Storage("query_id must not be empty".into()));
        }
        self.queries
            .write()
            .await
            .insert(query.query_id.clone(), query);
        Ok(())
    }
}

/// Assembly records keyed by `assembly_id`.
pub struct InMemoryAssemblyRepository {
    assemblies: Arc<RwLock<HashMap<String, Assembly>>>,
}

impl InMemoryAssemblyRepository {
    pub fn new() -> Self {
        Self {
            assemblies: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Every stored assembly, oldest first.
    pub async fn list(&self) -> Vec<Assembly> {
        let mut all: Vec<Assembly> = self.assemblies.read().await.values().cloned().collect();
        all.sort_by_key(|a| a.created_at);
        all
    }
}

impl Default for InMemoryAssemblyRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AssemblyRepository for InMemoryAssemblyRepository {
    async fn get(&self, assembly_id: &str) -> Result<Option<Assembly>, RepositoryError> {
        Ok(self.assemblies.read().await.get(assembly_id).cloned())
    }

    async fn save(&self, assembly: Assembly) -> Result<(), RepositoryError> {
        self.assemblies
            .write()
            .await
            .insert(assembly.assembly_id.clone(), assembly);
        Ok(())
    }
}
