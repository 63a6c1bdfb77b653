//! Domain Events for the tree engine
//!
//! This module defines the domain events emitted by
//! [`TreeService`](crate::services::TreeService) after a mutation commits.
//! Subscribers (caches, search indexes, UIs) can react to path changes
//! without polling the store.
//!
//! # Architecture
//!
//! Events are emitted using tokio's broadcast channel, allowing multiple subscribers
//! to receive notifications asynchronously.
//!
//! # Event Flow
//!
//! 1. TreeService runs the mutation inside one transaction
//! 2. The transaction commits
//! 3. The domain event is emitted via broadcast channel
//! 4. All subscribers receive the event asynchronously
//!
//! Rolled-back mutations emit nothing.

use crate::models::Node;
use serde::{Deserialize, Serialize};

/// Domain events emitted by TreeService
///
/// These events represent domain-level changes, not database operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DomainEvent {
    /// A new node was created
    NodeCreated { node: Node },

    /// A node changed without its path moving (label-only update)
    NodeUpdated { node: Node },

    /// A node's key or parent changed and its subtree followed
    #[serde(rename_all = "camelCase")]
    SubtreeMoved {
        node: Node,
        old_path: String,
        new_path: String,
        /// Number of descendant rows whose path was rewritten
        descendants: u64,
    },

    /// A node was deleted
    ///
    /// `removed` counts every deleted row, including cascaded descendants.
    NodeDeleted { id: String, removed: u64 },

    /// `rebuild_paths` rewrote drifted paths
    PathsRebuilt { repaired: u64 },
}

impl DomainEvent {
    /// Get a string representation of the event type
    pub fn event_type(&self) -> &str {
        match self {
            DomainEvent::NodeCreated { .. } => "node:created",
            DomainEvent::NodeUpdated { .. } => "node:updated",
            DomainEvent::SubtreeMoved { .. } => "subtree:moved",
            DomainEvent::NodeDeleted { .. } => "node:deleted",
            DomainEvent::PathsRebuilt { .. } => "paths:rebuilt",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Documents the exact JSON format subscribers receive
    #[test]
    fn test_subtree_moved_serialization_contract() {
        let now = chrono::Utc::now();
        let event = DomainEvent::SubtreeMoved {
            node: Node {
                id: "biology-id".to_string(),
                key: "biology".to_string(),
                parent_id: Some("top-id".to_string()),
                path: "top.biology".to_string(),
                label: "Biology".to_string(),
                version: 2,
                created_at: now,
                modified_at: now,
            },
            old_path: "top.science.biology".to_string(),
            new_path: "top.biology".to_string(),
            descendants: 2,
        };

        let parsed = serde_json::to_value(&event).unwrap();

        assert_eq!(parsed["type"], "subtreeMoved");
        assert_eq!(parsed["oldPath"], "top.science.biology");
        assert_eq!(parsed["newPath"], "top.biology");
        assert_eq!(parsed["descendants"], 2);
        assert_eq!(parsed["node"]["parentId"], "top-id");
        assert_eq!(event.event_type(), "subtree:moved");
    }

    #[test]
    fn test_deleted_event_round_trip() {
        let event = DomainEvent::NodeDeleted {
            id: "science-id".to_string(),
            removed: 4,
        };
        let json = serde_json::to_string(&event).unwrap();
        let back: DomainEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
