//! Assembly runs and their status state machine.
//!
//! ```text
//! pending ──▶ in_progress ──▶ completed
//!    │             │
//!    │             └────────▶ failed
//!    └─────────────┴────────▶ cancelled   (external signal only)
//! ```

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AssemblyError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssemblyStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Failed,
    Cancelled,
}

impl AssemblyStatus {
    pub fn can_transition_to(self, next: AssemblyStatus) -> bool {
        use AssemblyStatus::*;
        matches!(
            (self, next),
            (Pending, InProgress)
                | (InProgress, Completed)
                | (InProgress, Failed)
                | (Pending, Cancelled)
                | (InProgress, Cancelled)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            AssemblyStatus::Completed | AssemblyStatus::Failed | AssemblyStatus::Cancelled
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AssemblyStatus::Pending => "pending",
            AssemblyStatus::InProgress => "in_progress",
            AssemblyStatus::Completed => "completed",
            AssemblyStatus::Failed => "failed",
            AssemblyStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for AssemblyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One run of the assembly engine over one source document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assembly {
    pub assembly_id: String,

    pub assembly_specification_id: String,

    pub input_document_id: String,

    pub workflow_id: String,

    pub status: AssemblyStatus,

    /// Set once the validated output has been persisted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assembled_document_id: Option<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Assembly {
    /// Start a new pending assembly with a fresh id.
    pub fn new(
        assembly_specification_id: impl Into<String>,
        input_document_id: impl Into<String>,
        workflow_id: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            assembly_id: Uuid::new_v4().to_string(),
            assembly_specification_id: assembly_specification_id.into(),
            input_document_id: input_document_id.into(),
            workflow_id: workflow_id.into(),
            status: AssemblyStatus::Pending,
            assembled_document_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Move to `next`, rejecting transitions the state machine forbids.
    pub fn transition_to(&mut self, next: AssemblyStatus) -> Result<(), AssemblyError> {
        if !self.status.can_transition_to(next) {
            return Err(AssemblyError::InvalidTransition {
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Record the persisted output and complete the run.
    pub fn complete(
        &mut self,
        assembled_document_id: impl Into<String>,
    ) -> Result<(), AssemblyError> {
        self.transition_to(AssemblyStatus::Completed)?;
        self.assembled_document_id = Some(assembled_document_id.into());
        Ok(())
    }
}
