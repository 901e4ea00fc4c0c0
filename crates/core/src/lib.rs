//! # SchemaLoom Core
//!
//! Domain types, collaborator traits, and error definitions for the
//! schema-directed document assembly engine. Every other crate depends
//! inward on this one.
//!
//! ## Design Philosophy
//!
//! Every external collaborator (document store, specification store, query
//! store, knowledge service) is a trait here. Implementations live in their
//! respective crates. This enables:
//! - Swapping storage or knowledge services without touching the engine
//! - Easy testing with in-memory and scripted implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod pointer;
pub mod document;
pub mod specification;
pub mod query;
pub mod assembly;
pub mod repository;
pub mod event;

// Re-export key types at crate root for ergonomics
pub use error::{
    AssemblyError, Error, PointerError, QueryExecutionError, RepositoryError, Result,
    SpecificationError,
};
pub use pointer::{DocumentTarget, JsonPointer, TargetSegment};
pub use document::{Document, DocumentStatus};
pub use specification::{AssemblySpecification, SpecificationStatus};
pub use query::{KnowledgeServiceQuery, QueryExecutor, QueryRequest, QueryResult};
pub use assembly::{Assembly, AssemblyStatus};
pub use repository::{
    AssemblyRepository, DocumentRepository, QueryRepository, SpecificationRepository,
};
pub use event::{DomainEvent, EventBus};
