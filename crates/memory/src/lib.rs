//! In-memory collaborators for SchemaLoom.
//!
//! Repositories for every persisted entity plus a scripted knowledge
//! service, so the engine can run end to end without external services.

pub mod in_memory;
pub mod static_executor;

pub use in_memory::{
    InMemoryAssemblyRepository, InMemoryDocumentRepository, InMemoryQueryRepository,
    InMemorySpecificationRepository,
};
pub use static_executor::StaticQueryExecutor;
