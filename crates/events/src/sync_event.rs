//! Notification emitted whenever a sync operation settles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use oneflow_core::RecordId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    Create,
    Update,
    Delete,
    Load,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationOutcome {
    /// The backend accepted the operation and the cache holds its answer.
    Reconciled,
    /// The backend refused or was unreachable; the cache was restored.
    RolledBack,
    /// A conflicting update was replaced by the backend's current record.
    ConflictResolved,
}

/// One settled operation on one collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncEvent {
    pub resource: String,
    /// `None` for collection-wide operations (loads).
    pub record_id: Option<RecordId>,
    pub kind: MutationKind,
    pub outcome: MutationOutcome,
    /// Display form of the error for failed operations.
    pub error: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl SyncEvent {
    pub fn reconciled(resource: &str, record_id: Option<RecordId>, kind: MutationKind) -> Self {
        Self {
            resource: resource.to_string(),
            record_id,
            kind,
            outcome: MutationOutcome::Reconciled,
            error: None,
            occurred_at: Utc::now(),
        }
    }

    pub fn rolled_back(
        resource: &str,
        record_id: Option<RecordId>,
        kind: MutationKind,
        error: impl ToString,
    ) -> Self {
        Self {
            outcome: MutationOutcome::RolledBack,
            error: Some(error.to_string()),
            ..Self::reconciled(resource, record_id, kind)
        }
    }

    pub fn conflict_resolved(resource: &str, record_id: RecordId, error: impl ToString) -> Self {
        Self {
            outcome: MutationOutcome::ConflictResolved,
            error: Some(error.to_string()),
            ..Self::reconciled(resource, Some(record_id), MutationKind::Update)
        }
    }

    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rollback_carries_the_error_text() {
        let ev = SyncEvent::rolled_back(
            "sales-orders",
            Some(RecordId::from("7")),
            MutationKind::Delete,
            "server error (500)",
        );
        assert_eq!(ev.outcome, MutationOutcome::RolledBack);
        assert_eq!(ev.error.as_deref(), Some("server error (500)"));
        assert!(ev.is_failure());
    }

    #[test]
    fn serializes_snake_case_tags() {
        let ev = SyncEvent::conflict_resolved("tasks", RecordId::from("3"), "stale");
        let v = serde_json::to_value(&ev).unwrap();
        assert_eq!(v["outcome"], json!("conflict_resolved"));
        assert_eq!(v["kind"], json!("update"));
        assert_eq!(v["record_id"], json!("3"));
    }
}
