//! JSON Schema machinery for SchemaLoom.
//!
//! - [`extractor`]: standalone sub-schemas for a JSON Pointer
//! - [`compat`]: rewriting a schema into a structured-output provider's
//!   supported subset, including bounded flattening of recursive `$ref`s
//! - [`graph`]: the `$defs`/`definitions` reference graph and its cycles
//! - [`validate`]: whole-document validation
//!
//! Everything here is a pure function of its inputs and safe to call from
//! many tasks at once.

pub mod compat;
pub mod extractor;
pub mod graph;
mod keywords;
pub mod validate;

pub use compat::{
    ChangeDescription, CompatOptions, Compatibility, make_compatible, make_compatible_with,
};
pub use extractor::{result_key, schema_for_pointer, schema_for_pointer_str};
pub use graph::{DefinitionRef, RefGraph};
pub use validate::{InvalidSchema, SchemaValidator, validate_against};
