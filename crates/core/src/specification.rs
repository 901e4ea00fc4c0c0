//! Assembly specifications: the declarative map from schema locations to
//! extraction queries.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SpecificationError;
use crate::pointer::{DocumentTarget, JsonPointer};

/// Publication state of a specification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecificationStatus {
    #[default]
    Active,
    Inactive,
    Draft,
    Deprecated,
}

/// A target JSON Schema plus the query that fills each part of it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssemblySpecification {
    pub assembly_specification_id: String,

    pub name: String,

    /// Which source documents this specification applies to
    #[serde(default)]
    pub applicability: String,

    /// The root schema the assembled document must satisfy
    pub jsonschema: serde_json::Value,

    /// Schema pointer → query id. Pointers must not overlap.
    #[serde(default)]
    pub knowledge_service_queries: BTreeMap<JsonPointer, String>,

    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default)]
    pub status: SpecificationStatus,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

fn default_version() -> String {
    "0.1.0".into()
}

impl AssemblySpecification {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        jsonschema: serde_json::Value,
    ) -> Self {
        let now = Utc::now();
        Self {
            assembly_specification_id: id.into(),
            name: name.into(),
            applicability: String::new(),
            jsonschema,
            knowledge_service_queries: BTreeMap::new(),
            version: default_version(),
            status: SpecificationStatus::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Map `pointer` to `query_id`.
    pub fn with_query(mut self, pointer: JsonPointer, query_id: impl Into<String>) -> Self {
        self.knowledge_service_queries.insert(pointer, query_id.into());
        self
    }

    pub fn with_applicability(mut self, applicability: impl Into<String>) -> Self {
        self.applicability = applicability.into();
        self
    }

    /// Save-time validation.
    ///
    /// Checks that the schema compiles, that every pointer resolves inside
    /// it and addresses a document location, that no pointer is a strict
    /// prefix of another, and that no two pointers write to the same or
    /// nested document locations.
    pub fn validate(&self) -> Result<(), SpecificationError> {
        let id = &self.assembly_specification_id;
        if self.name.trim().is_empty() {
            return Err(SpecificationError::Invalid {
                id: id.clone(),
                reason: "name cannot be empty".into(),
            });
        }

        if let Err(e) = jsonschema::validator_for(&self.jsonschema) {
            return Err(SpecificationError::InvalidSchema {
                id: id.clone(),
                reason: e.to_string(),
            });
        }

        let mut targets: Vec<(&JsonPointer, DocumentTarget)> = Vec::new();
        for (pointer, query_id) in &self.knowledge_service_queries {
            if query_id.trim().is_empty() {
                return Err(SpecificationError::Invalid {
                    id: id.clone(),
                    reason: format!("pointer '{pointer}' maps to an empty query id"),
                });
            }
            let target = pointer
                .resolve(&self.jsonschema)
                .and_then(|_| pointer.document_target())
                .map_err(|source| SpecificationError::Pointer {
                    id: id.clone(),
                    source,
                })?;
            targets.push((pointer, target));
        }

        let pointers: Vec<&JsonPointer> = self.knowledge_service_queries.keys().collect();
        for outer in &pointers {
            if let Some(inner) = pointers.iter().find(|p| outer.is_strict_prefix_of(p)) {
                return Err(SpecificationError::OverlappingPointers {
                    id: id.clone(),
                    outer: outer.to_string(),
                    inner: inner.to_string(),
                });
            }
        }

        for (i, (first, first_target)) in targets.iter().enumerate() {
            for (second, second_target) in &targets[i + 1..] {
                if first_target.overlaps(second_target) {
                    return Err(SpecificationError::SharedTarget {
                        id: id.clone(),
                        first: first.to_string(),
                        second: second.to_string(),
                    });
                }
            }
        }

        Ok(())
    }
}
