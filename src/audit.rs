// src/audit.rs - Append-only history and changelog records
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::models::{ChangelogEntry, FieldChange};

pub const ACTION_SYNC: &str = "sync_promotion";
pub const ACTION_VENUE_PROMOTED: &str = "venue_promoted";
pub const ACTION_MERGE: &str = "venue_merge";
pub const ACTION_DELETE: &str = "venue_delete";

/// Before/after pair for one field. Serialization failures degrade to `null`.
pub fn field_change<T: Serialize>(field: &str, before: &T, after: &T) -> FieldChange {
    FieldChange {
        field: field.to_string(),
        before: serde_json::to_value(before).unwrap_or(Value::Null),
        after: serde_json::to_value(after).unwrap_or(Value::Null),
    }
}

pub fn changelog_entry(
    id: String,
    action: &str,
    actor_id: &str,
    document_ids: Vec<String>,
    summary: String,
    changes: Vec<FieldChange>,
    now: DateTime<Utc>,
) -> ChangelogEntry {
    ChangelogEntry {
        id,
        action: action.to_string(),
        actor_id: actor_id.to_string(),
        document_ids,
        summary,
        changes,
        created_at: now,
    }
}
