//! # SchemaLoom Engine
//!
//! The assembly orchestrator. Given a source document and an assembly
//! specification (a root JSON Schema plus one knowledge service query per
//! JSON Pointer), it:
//!
//! 1. extracts a standalone sub-schema for each pointer,
//! 2. rewrites it for the structured-output provider,
//! 3. runs the pointer's query against the source document,
//! 4. merges every answer into one document and validates the whole.
//!
//! Pointer queries run concurrently up to
//! [`EngineOptions::max_concurrency`]; merging happens once all of them have
//! answered.

pub mod engine;
pub mod merge;
pub mod result;

pub use engine::{AssemblyEngine, EngineOptions};
