// src/models/reports.rs - Scores, groups, batch reports and audit records
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::catalog::Venue;

/// Pairwise duplicate evidence between two venues. Computed on demand, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateScore {
    pub address_match: bool,
    /// Meters between the two venues, `-1.0` when either lacks coordinates.
    pub coordinate_proximity_m: f64,
    pub platform_url_match: bool,
    pub name_similarity: f64,
    pub total_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairScore {
    pub venue_id_1: String,
    pub venue_id_2: String,
    pub score: DuplicateScore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    Merge,
    Review,
    KeepBoth,
}

/// A connected component of venues linked by above-threshold scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateGroup {
    /// Oldest first; the first member is the suggested merge primary.
    pub venues: Vec<Venue>,
    /// Best pairwise score inside the group.
    pub score: f64,
    pub recommendation: Recommendation,
    pub pairs: Vec<PairScore>,
}

impl DuplicateGroup {
    pub fn venue_ids(&self) -> Vec<&str> {
        self.venues.iter().map(|v| v.id.as_str()).collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeResult {
    pub primary_venue_id: String,
    pub secondary_venue_id: String,
    pub dishes_transferred: usize,
    pub dishes_discarded: usize,
    pub platforms_transferred: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteReport {
    pub requested: usize,
    pub deleted_venue_ids: Vec<String>,
    pub dishes_deleted: usize,
    pub not_found: Vec<String>,
    pub errors: Vec<SyncItemError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Venue,
    Dish,
}

/// One batch item that could not be processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncItemError {
    pub entity_type: EntityType,
    pub entity_id: String,
    pub message: String,
}

impl SyncItemError {
    pub fn venue(id: &str, message: impl Into<String>) -> Self {
        Self {
            entity_type: EntityType::Venue,
            entity_id: id.to_string(),
            message: message.into(),
        }
    }

    pub fn dish(id: &str, message: impl Into<String>) -> Self {
        Self {
            entity_type: EntityType::Dish,
            entity_id: id.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemCounts {
    pub venues: usize,
    pub dishes: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncedCounts {
    pub venues_added: usize,
    pub venues_updated: usize,
    pub dishes_added: usize,
    /// Standalone dishes linked to an existing production dish of the same name.
    pub dishes_linked: usize,
}

impl SyncedCounts {
    pub fn venues(&self) -> usize {
        self.venues_added + self.venues_updated
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub requested: ItemCounts,
    pub synced: SyncedCounts,
    pub failed: ItemCounts,
    pub errors: Vec<SyncItemError>,
    pub skipped_for_validation: Vec<String>,
    /// Selected ids excluded as already promoted, unverified or unknown.
    pub ineligible: Vec<String>,
    /// Eligible entities left for a later call because of the per-call item cap.
    pub deferred: usize,
    /// Ids not reached before the deadline or a cancellation.
    pub unprocessed: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interrupted: Option<String>,
    pub synced_venue_ids: Vec<String>,
    pub synced_dish_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_id: Option<String>,
}

/// Append-only record of one promotion batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncHistoryRecord {
    pub id: String,
    pub actor_id: String,
    pub synced_venue_ids: Vec<String>,
    pub synced_dish_ids: Vec<String>,
    pub venues_added: usize,
    pub venues_updated: usize,
    pub dishes_added: usize,
    pub errors: Vec<SyncItemError>,
    pub created_at: DateTime<Utc>,
}

/// Append-only record of one venue merge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeHistoryRecord {
    pub id: String,
    pub actor_id: String,
    pub primary_venue_id: String,
    pub secondary_venue_id: String,
    pub transferred_dish_ids: Vec<String>,
    pub discarded_dish_ids: Vec<String>,
    pub platforms_transferred: usize,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    pub field: String,
    pub before: serde_json::Value,
    pub after: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangelogEntry {
    pub id: String,
    pub action: String,
    pub actor_id: String,
    pub document_ids: Vec<String>,
    pub summary: String,
    #[serde(default)]
    pub changes: Vec<FieldChange>,
    pub created_at: DateTime<Utc>,
}
