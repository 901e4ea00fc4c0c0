//! Domain event system: progress notifications from assembly runs.
//!
//! Events are published when an assembly starts, fills a pointer, and
//! finishes. Subscribers (progress UIs, workflow heartbeats) react without
//! the engine knowing about them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// An assembly run moved to in_progress
    AssemblyStarted {
        assembly_id: String,
        specification_id: String,
        pointer_count: usize,
        timestamp: DateTime<Utc>,
    },

    /// A pointer's query answered and its value was parsed
    PointerAssembled {
        assembly_id: String,
        pointer: String,
        query_id: String,
        duration_ms: u64,
        schema_changes: usize,
        timestamp: DateTime<Utc>,
    },

    /// The assembled document validated and was persisted
    AssemblyCompleted {
        assembly_id: String,
        assembled_document_id: String,
        timestamp: DateTime<Utc>,
    },

    /// The run ended in failed
    AssemblyFailed {
        assembly_id: String,
        error_message: String,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for domain events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DomainEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
