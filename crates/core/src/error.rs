//! Error types for the SchemaLoom domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all SchemaLoom operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Pointer errors ---
    #[error("Pointer error: {0}")]
    Pointer(#[from] PointerError),

    // --- Specification errors ---
    #[error("Specification error: {0}")]
    Specification(#[from] SpecificationError),

    // --- Repository errors ---
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    // --- Query execution errors ---
    #[error("Query execution error: {0}")]
    QueryExecution(#[from] QueryExecutionError),

    // --- Assembly errors ---
    #[error("Assembly error: {0}")]
    Assembly(#[from] AssemblyError),

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// A JSON Pointer that is malformed or does not resolve inside its target.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PointerError {
    #[error("invalid pointer syntax '{pointer}': must be empty or start with '/'")]
    Syntax { pointer: String },

    #[error("invalid escape sequence in pointer '{pointer}'")]
    InvalidEscape { pointer: String },

    #[error("pointer '{pointer}' does not resolve: missing segment '{segment}'")]
    Unresolvable { pointer: String, segment: String },

    #[error("pointer '{pointer}' does not address a document location: {reason}")]
    NotAddressable { pointer: String, reason: String },
}

#[derive(Debug, Error)]
pub enum SpecificationError {
    #[error("invalid specification '{id}': {reason}")]
    Invalid { id: String, reason: String },

    #[error("specification '{id}' has an invalid pointer: {source}")]
    Pointer {
        id: String,
        #[source]
        source: PointerError,
    },

    #[error("specification '{id}' has overlapping pointers: '{outer}' is a prefix of '{inner}'")]
    OverlappingPointers {
        id: String,
        outer: String,
        inner: String,
    },

    #[error("specification '{id}': '{first}' and '{second}' write to overlapping locations")]
    SharedTarget {
        id: String,
        first: String,
        second: String,
    },

    #[error("specification '{id}' carries an invalid JSON Schema: {reason}")]
    InvalidSchema { id: String, reason: String },
}

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Rejected by repository: {0}")]
    Rejected(#[from] SpecificationError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Error)]
pub enum QueryExecutionError {
    #[error("Knowledge service '{service}' failed: {message}")]
    Failed { service: String, message: String },

    #[error("Knowledge service timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },
}

#[derive(Debug, Error)]
pub enum AssemblyError {
    #[error("Assembly specification not found: {0}")]
    SpecificationNotFound(String),

    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    #[error("Assembly not found: {0}")]
    AssemblyNotFound(String),

    #[error("Knowledge service query not found: {query_id} (pointer '{pointer}')")]
    QueryNotFound { pointer: String, query_id: String },

    #[error("Invalid pointer: {0}")]
    InvalidPointer(#[from] PointerError),

    #[error("Query for pointer '{pointer}' failed: {source}")]
    QueryExecution {
        pointer: String,
        #[source]
        source: QueryExecutionError,
    },

    #[error("Could not parse result for pointer '{pointer}': {reason}")]
    ResultParse { pointer: String, reason: String },

    #[error("Could not insert value for pointer '{pointer}': {reason}")]
    Insertion { pointer: String, reason: String },

    #[error(
        "Assembled document failed schema validation with {} error(s): {}",
        errors.len(),
        errors.join("; ")
    )]
    SchemaValidation { errors: Vec<String> },

    #[error("Invalid assembly status transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Repository failure: {0}")]
    Repository(#[from] RepositoryError),
}

impl AssemblyError {
    /// Whether a caller may reasonably resubmit the whole assembly.
    ///
    /// Data-quality failures (bad generation, validation mismatch, a flaky
    /// knowledge service) can succeed on retry; missing entities and
    /// authoring defects cannot.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AssemblyError::QueryExecution { .. }
                | AssemblyError::ResultParse { .. }
                | AssemblyError::SchemaValidation { .. }
        )
    }
}
