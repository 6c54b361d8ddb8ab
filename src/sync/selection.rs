// src/sync/selection.rs - Which discovered entities a promotion batch should consider
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::errors::{ReconcileError, ReconcileResult};
use crate::models::{DiscoveredDish, DiscoveredVenue, DiscoveryStatus, ItemCounts};
use crate::store::{fetch, fetch_where, CatalogStore, Collection, Filter};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SyncSelection {
    #[serde(default)]
    pub venue_ids: Vec<String>,
    #[serde(default)]
    pub dish_ids: Vec<String>,
    #[serde(default)]
    pub sync_all: bool,
    /// Bypasses the address completeness gate (backfills).
    #[serde(default)]
    pub skip_address_validation: bool,
}

impl SyncSelection {
    pub fn all() -> Self {
        Self {
            sync_all: true,
            ..Self::default()
        }
    }

    pub fn venues<I: IntoIterator<Item = S>, S: Into<String>>(ids: I) -> Self {
        Self {
            venue_ids: ids.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn validate(&self, max_items: usize) -> ReconcileResult<()> {
        if !self.sync_all && self.venue_ids.is_empty() && self.dish_ids.is_empty() {
            return Err(ReconcileError::Validation(
                "provide venueIds, dishIds or syncAll".to_string(),
            ));
        }
        for (field, ids) in [("venueIds", &self.venue_ids), ("dishIds", &self.dish_ids)] {
            if ids.len() > max_items {
                return Err(ReconcileError::Validation(format!(
                    "at most {} {} per call, got {}",
                    max_items,
                    field,
                    ids.len()
                )));
            }
            if ids.iter().any(|id| id.trim().is_empty()) {
                return Err(ReconcileError::Validation(format!(
                    "{} must not contain blank ids",
                    field
                )));
            }
        }
        Ok(())
    }
}

/// Eligible entities for one call, oldest first, plus what was left out.
#[derive(Debug, Default)]
pub struct Candidates {
    pub venues: Vec<DiscoveredVenue>,
    pub dishes: Vec<DiscoveredDish>,
    pub ineligible: Vec<String>,
    pub deferred: usize,
}

impl Candidates {
    pub fn is_empty(&self) -> bool {
        self.venues.is_empty() && self.dishes.is_empty()
    }

    pub fn counts(&self) -> ItemCounts {
        ItemCounts {
            venues: self.venues.len(),
            dishes: self.dishes.len(),
        }
    }
}

fn unique(ids: &[String]) -> Vec<&str> {
    let mut seen = HashSet::new();
    ids.iter()
        .map(|id| id.trim())
        .filter(|id| seen.insert(*id))
        .collect()
}

/// Resolves the selection to eligible entities: status `verified` and no
/// production id yet. Already-promoted or unknown ids are excluded, not errors.
pub async fn resolve_candidates(
    store: &dyn CatalogStore,
    selection: &SyncSelection,
    max_items: usize,
) -> ReconcileResult<Candidates> {
    let mut candidates = Candidates::default();
    let verified = [Filter::eq("status", DiscoveryStatus::Verified.as_str())];

    if selection.sync_all {
        let mut venues: Vec<DiscoveredVenue> =
            fetch_where(store, Collection::DiscoveredVenues, &verified).await?;
        venues.retain(DiscoveredVenue::is_eligible);
        venues.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));

        let mut dishes: Vec<DiscoveredDish> =
            fetch_where(store, Collection::DiscoveredDishes, &verified).await?;
        dishes.retain(DiscoveredDish::is_eligible);
        dishes.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));

        candidates.deferred = venues.len().saturating_sub(max_items)
            + dishes.len().saturating_sub(max_items);
        venues.truncate(max_items);
        dishes.truncate(max_items);
        candidates.venues = venues;
        candidates.dishes = dishes;
        return Ok(candidates);
    }

    for id in unique(&selection.venue_ids) {
        match fetch::<DiscoveredVenue>(store, Collection::DiscoveredVenues, id).await? {
            Some(venue) if venue.is_eligible() => candidates.venues.push(venue),
            _ => candidates.ineligible.push(id.to_string()),
        }
    }
    for id in unique(&selection.dish_ids) {
        match fetch::<DiscoveredDish>(store, Collection::DiscoveredDishes, id).await? {
            Some(dish) if dish.is_eligible() => candidates.dishes.push(dish),
            _ => candidates.ineligible.push(id.to_string()),
        }
    }
    Ok(candidates)
}
