//! Repository traits: persistence collaborators of the engine.
//!
//! The engine never knows where documents, specifications, queries, or
//! assembly records live. Implementations: object stores, SQL tables,
//! in-memory maps (for testing).

use async_trait::async_trait;

use crate::assembly::Assembly;
use crate::document::Document;
use crate::error::RepositoryError;
use crate::query::KnowledgeServiceQuery;
use crate::specification::AssemblySpecification;

#[async_trait]
pub trait DocumentRepository: Send + Sync {
    async fn get(&self, document_id: &str) -> Result<Option<Document>, RepositoryError>;

    /// Store a document, returning its id. An empty `document_id` asks the
    /// repository to assign one.
    async fn save(&self, document: Document) -> Result<String, RepositoryError>;
}

#[async_trait]
pub trait SpecificationRepository: Send + Sync {
    async fn get(
        &self,
        specification_id: &str,
    ) -> Result<Option<AssemblySpecification>, RepositoryError>;

    /// Store a specification. Implementations must run
    /// [`AssemblySpecification::validate`] first and reject invalid ones.
    async fn save(&self, specification: AssemblySpecification) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait QueryRepository: Send + Sync {
    async fn get(&self, query_id: &str) -> Result<Option<KnowledgeServiceQuery>, RepositoryError>;

    async fn save(&self, query: KnowledgeServiceQuery) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait AssemblyRepository: Send + Sync {
    async fn get(&self, assembly_id: &str) -> Result<Option<Assembly>, RepositoryError>;

    /// Insert or replace the record for `assembly.assembly_id`.
    async fn save(&self, assembly: Assembly) -> Result<(), RepositoryError>;
}
