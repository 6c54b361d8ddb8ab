// src/merge/venue_merge.rs - Collapses duplicate venues and removes unwanted ones
//
// A merge runs as one transaction: dish moves, platform union, the secondary
// delete, and the audit records commit together or not at all.
use chrono::Utc;
use std::collections::HashSet;

use crate::audit::{changelog_entry, field_change, ACTION_DELETE, ACTION_MERGE};
use crate::errors::{ReconcileError, ReconcileResult};
use crate::models::catalog::{fold, missing_platforms};
use crate::models::{DeleteReport, Dish, MergeHistoryRecord, MergeResult, SyncItemError, Venue};
use crate::store::{CatalogStore, Collection, Filter, Transaction};
use crate::utils::logging::{Operation, OperationLogger};

pub const MAX_DELETE_BATCH: usize = 100;

pub(crate) async fn venue_dishes(tx: &Transaction<'_>, venue_id: &str) -> ReconcileResult<Vec<Dish>> {
    let mut dishes: Vec<Dish> = tx
        .query(Collection::Dishes, &[Filter::eq("venueId", venue_id)])
        .await?;
    dishes.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
    Ok(dishes)
}

/// Folded names of the given dishes, used for exact-name de-duplication.
pub(crate) fn dish_name_set(dishes: &[Dish]) -> HashSet<String> {
    dishes.iter().map(|d| fold(&d.name)).collect()
}

pub async fn merge_venues(
    store: &dyn CatalogStore,
    primary_id: &str,
    secondary_id: &str,
    actor_id: &str,
) -> ReconcileResult<MergeResult> {
    let (primary_id, secondary_id) = (primary_id.trim(), secondary_id.trim());
    if primary_id.is_empty() || secondary_id.is_empty() {
        return Err(ReconcileError::Validation(
            "primaryVenueId and secondaryVenueId are required".to_string(),
        ));
    }
    if primary_id == secondary_id {
        return Err(ReconcileError::InvalidState(format!(
            "cannot merge venue {} into itself",
            primary_id
        )));
    }

    let logger = OperationLogger::new(Operation::Merge);
    logger.log_start(&format!("{} <- {}", primary_id, secondary_id));

    let mut tx = Transaction::begin(store);
    let mut primary: Venue = tx
        .get(Collection::Venues, primary_id)
        .await?
        .ok_or_else(|| ReconcileError::venue_not_found(primary_id))?;
    let secondary: Venue = tx
        .get(Collection::Venues, secondary_id)
        .await?
        .ok_or_else(|| ReconcileError::venue_not_found(secondary_id))?;

    let primary_dishes = venue_dishes(&tx, primary_id).await?;
    let secondary_dishes = venue_dishes(&tx, secondary_id).await?;
    logger.log_phase(
        "Dishes loaded",
        Some(&format!(
            "primary {}, secondary {}",
            primary_dishes.len(),
            secondary_dishes.len()
        )),
    );

    let now = Utc::now();
    let mut names = dish_name_set(&primary_dishes);
    let mut transferred_dish_ids = Vec::new();
    let mut discarded_dish_ids = Vec::new();
    for mut dish in secondary_dishes {
        if names.insert(fold(&dish.name)) {
            dish.venue_id = primary.id.clone();
            dish.updated_at = now;
            tx.put(Collection::Dishes, &dish.id, &dish)?;
            transferred_dish_ids.push(dish.id);
        } else {
            tx.delete(Collection::Dishes, &dish.id);
            discarded_dish_ids.push(dish.id);
        }
    }

    let added_platforms = missing_platforms(&primary.delivery_platforms, &secondary.delivery_platforms);
    let mut changes = Vec::new();
    if !added_platforms.is_empty() {
        let before = primary.delivery_platforms.clone();
        primary.delivery_platforms.extend(added_platforms.iter().cloned());
        primary.updated_at = now;
        changes.push(field_change("deliveryPlatforms", &before, &primary.delivery_platforms));
        tx.put(Collection::Venues, &primary.id, &primary)?;
    }
    tx.delete(Collection::Venues, &secondary.id);

    let result = MergeResult {
        primary_venue_id: primary.id.clone(),
        secondary_venue_id: secondary.id.clone(),
        dishes_transferred: transferred_dish_ids.len(),
        dishes_discarded: discarded_dish_ids.len(),
        platforms_transferred: added_platforms.len(),
    };

    let history = MergeHistoryRecord {
        id: tx.new_id(),
        actor_id: actor_id.to_string(),
        primary_venue_id: primary.id.clone(),
        secondary_venue_id: secondary.id.clone(),
        transferred_dish_ids,
        discarded_dish_ids,
        platforms_transferred: result.platforms_transferred,
        created_at: now,
    };
    tx.put(Collection::MergeHistory, &history.id, &history)?;
    let entry = changelog_entry(
        tx.new_id(),
        ACTION_MERGE,
        actor_id,
        vec![primary.id.clone(), secondary.id.clone()],
        format!(
            "Merged '{}' into '{}': {} dishes moved, {} discarded, {} platforms added",
            secondary.name,
            primary.name,
            result.dishes_transferred,
            result.dishes_discarded,
            result.platforms_transferred
        ),
        changes,
        now,
    );
    tx.put(Collection::Changelog, &entry.id, &entry)?;

    logger.log_debug(&format!("Committing {} writes", tx.write_count()));
    tx.commit().await?;
    logger.log_completion(
        &format!(
            "{} dishes transferred, {} discarded, {} platforms transferred",
            result.dishes_transferred, result.dishes_discarded, result.platforms_transferred
        ),
        0,
    );
    Ok(result)
}

/// Deletes each venue with its dishes, one transaction per venue. Unknown ids
/// and failing venues are reported without stopping the batch.
pub async fn delete_venues(
    store: &dyn CatalogStore,
    venue_ids: &[String],
    actor_id: &str,
) -> ReconcileResult<DeleteReport> {
    if venue_ids.is_empty() {
        return Err(ReconcileError::Validation("venueIds must not be empty".to_string()));
    }
    if venue_ids.len() > MAX_DELETE_BATCH {
        return Err(ReconcileError::Validation(format!(
            "at most {} venueIds per call, got {}",
            MAX_DELETE_BATCH,
            venue_ids.len()
        )));
    }

    let logger = OperationLogger::new(Operation::Delete);
    logger.log_start(&format!("{} venues requested", venue_ids.len()));

    let mut seen = HashSet::new();
    let mut report = DeleteReport {
        requested: venue_ids.len(),
        ..DeleteReport::default()
    };
    for venue_id in venue_ids.iter().map(|id| id.trim()) {
        if venue_id.is_empty() || !seen.insert(venue_id.to_string()) {
            continue;
        }
        match delete_one(store, venue_id, actor_id).await {
            Ok(Some(dishes)) => {
                report.deleted_venue_ids.push(venue_id.to_string());
                report.dishes_deleted += dishes;
            }
            Ok(None) => {
                logger.log_item_skipped("venue", venue_id, "not found");
                report.not_found.push(venue_id.to_string());
            }
            Err(e) => {
                logger.log_item_failed("venue", venue_id, &e.to_string());
                report.errors.push(SyncItemError::venue(venue_id, e.to_string()));
            }
        }
    }

    logger.log_completion(
        &format!(
            "{} venues deleted, {} dishes removed, {} not found",
            report.deleted_venue_ids.len(),
            report.dishes_deleted,
            report.not_found.len()
        ),
        report.errors.len(),
    );
    Ok(report)
}

async fn delete_one(
    store: &dyn CatalogStore,
    venue_id: &str,
    actor_id: &str,
) -> ReconcileResult<Option<usize>> {
    let mut tx = Transaction::begin(store);
    let Some(venue) = tx.get::<Venue>(Collection::Venues, venue_id).await? else {
        return Ok(None);
    };
    let dishes = venue_dishes(&tx, venue_id).await?;
    for dish in &dishes {
        tx.delete(Collection::Dishes, &dish.id);
    }
    tx.delete(Collection::Venues, venue_id);

    let entry = changelog_entry(
        tx.new_id(),
        ACTION_DELETE,
        actor_id,
        vec![venue_id.to_string()],
        format!("Deleted duplicate venue '{}' and {} dishes", venue.name, dishes.len()),
        vec![field_change("venue", &Some(&venue), &None)],
        Utc::now(),
    );
    tx.put(Collection::Changelog, &entry.id, &entry)?;
    tx.commit().await?;
    Ok(Some(dishes.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::scorer::tests::{venue, with_url};
    use crate::models::RecordStatus;
    use crate::store::{fetch, fetch_where, save, MemoryCatalog};
    use chrono::Duration;

    fn dish(id: &str, venue_id: &str, name: &str, minutes: i64) -> Dish {
        let created = Utc::now() - Duration::minutes(100 - minutes);
        Dish {
            id: id.to_string(),
            venue_id: venue_id.to_string(),
            name: name.to_string(),
            description: String::new(),
            planted_products: vec!["planted.chicken".into()],
            price: None,
            dietary_tags: vec!["vegan".into()],
            status: RecordStatus::Active,
            created_at: created,
            updated_at: created,
        }
    }

    async fn seed(store: &MemoryCatalog, venues: &[Venue], dishes: &[Dish]) {
        for v in venues {
            save(store, Collection::Venues, &v.id, v).await.unwrap();
        }
        for d in dishes {
            save(store, Collection::Dishes, &d.id, d).await.unwrap();
        }
    }

    async fn dishes_of(store: &MemoryCatalog, venue_id: &str) -> Vec<Dish> {
        fetch_where(store, Collection::Dishes, &[Filter::eq("venueId", venue_id)])
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_merge_moves_unique_dishes_and_deletes_secondary() {
        let store = MemoryCatalog::new();
        let y = venue("y", "Green Bowl", "Main 1", "Berlin", 10);
        let x = venue("x", "Green Bowl", "Main 1", "Berlin", 1);
        let mut inactive = dish("x3", "x", "Bowl", 3);
        inactive.status = RecordStatus::Archived;
        seed(
            &store,
            &[y, x],
            &[dish("y1", "y", "Bowl", 0), dish("x1", "x", "bowl ", 1), dish("x2", "x", "Wrap", 2), inactive],
        )
        .await;

        let result = merge_venues(&store, "y", "x", "ops").await.unwrap();
        assert_eq!(result.dishes_transferred, 1);
        assert_eq!(result.dishes_discarded, 2);
        assert_eq!(result.platforms_transferred, 0);

        let remaining = dishes_of(&store, "y").await;
        let mut names: Vec<&str> = remaining.iter().map(|d| d.name.as_str()).collect();
        names.sort();
        assert_eq!(names, vec!["Bowl", "Wrap"]);
        // moved, not copied
        assert!(remaining.iter().any(|d| d.id == "x2"));
        assert!(fetch::<Venue>(&store, Collection::Venues, "x").await.unwrap().is_none());
        assert!(dishes_of(&store, "x").await.is_empty());
        assert_eq!(store.count(Collection::MergeHistory).await, 1);
        assert_eq!(store.count(Collection::Changelog).await, 1);
    }

    #[tokio::test]
    async fn test_merge_unions_platforms_by_url() {
        let store = MemoryCatalog::new();
        let y = with_url(venue("y", "A", "s", "Berlin", 10), "wolt", "https://wolt/a");
        let x = with_url(
            with_url(venue("x", "A", "s", "Berlin", 1), "wolt_de", "HTTPS://WOLT/A"),
            "uber",
            "https://uber/a",
        );
        seed(&store, &[y, x], &[]).await;

        let result = merge_venues(&store, "y", "x", "ops").await.unwrap();
        assert_eq!(result.platforms_transferred, 1);
        let merged: Venue = fetch(&store, Collection::Venues, "y").await.unwrap().unwrap();
        assert_eq!(merged.delivery_platforms.len(), 2);
        assert_eq!(merged.delivery_platforms[1].url, "https://uber/a");
    }

    #[tokio::test]
    async fn test_merge_with_shared_url_transfers_nothing() {
        let store = MemoryCatalog::new();
        let y = with_url(venue("y", "A", "s", "Berlin", 10), "wolt", "https://wolt/a");
        let x = with_url(venue("x", "A", "s", "Berlin", 1), "wolt", "https://wolt/a");
        seed(&store, &[y, x], &[]).await;
        let result = merge_venues(&store, "y", "x", "ops").await.unwrap();
        assert_eq!(result.platforms_transferred, 0);
    }

    #[tokio::test]
    async fn test_merge_rejects_self_and_missing() {
        let store = MemoryCatalog::new();
        seed(&store, &[venue("y", "A", "s", "Berlin", 1)], &[]).await;

        let err = merge_venues(&store, "y", "y", "ops").await.unwrap_err();
        assert!(matches!(err, ReconcileError::InvalidState(_)));
        let err = merge_venues(&store, "y", "ghost", "ops").await.unwrap_err();
        assert!(matches!(err, ReconcileError::NotFound { .. }));
        let err = merge_venues(&store, "", "y", "ops").await.unwrap_err();
        assert!(matches!(err, ReconcileError::Validation(_)));
    }

    #[tokio::test]
    async fn test_failed_merge_leaves_catalog_untouched() {
        let store = MemoryCatalog::new();
        seed(
            &store,
            &[venue("y", "A", "s", "Berlin", 10), venue("x", "A", "s", "Berlin", 1)],
            &[dish("x1", "x", "Wrap", 1)],
        )
        .await;
        store.poison("x").await;

        assert!(merge_venues(&store, "y", "x", "ops").await.is_err());
        assert_eq!(dishes_of(&store, "x").await.len(), 1);
        assert!(fetch::<Venue>(&store, Collection::Venues, "x").await.unwrap().is_some());
        assert_eq!(store.count(Collection::MergeHistory).await, 0);
    }

    #[tokio::test]
    async fn test_delete_venues_reports_each_id() {
        let store = MemoryCatalog::new();
        seed(
            &store,
            &[venue("a", "A", "s", "Berlin", 1), venue("b", "B", "s", "Berlin", 1)],
            &[dish("a1", "a", "Bowl", 1), dish("a2", "a", "Wrap", 2)],
        )
        .await;
        store.poison("b").await;

        let ids = vec!["a".to_string(), "a".to_string(), "ghost".to_string(), "b".to_string()];
        let report = delete_venues(&store, &ids, "ops").await.unwrap();
        assert_eq!(report.deleted_venue_ids, vec!["a"]);
        assert_eq!(report.dishes_deleted, 2);
        assert_eq!(report.not_found, vec!["ghost"]);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].entity_id, "b");
        assert_eq!(store.count(Collection::Dishes).await, 0);
        assert_eq!(store.count(Collection::Venues).await, 1);
    }

    #[tokio::test]
    async fn test_delete_venues_validates_batch_size() {
        let store = MemoryCatalog::new();
        assert!(matches!(
            delete_venues(&store, &[], "ops").await,
            Err(ReconcileError::Validation(_))
        ));
        let too_many: Vec<String> = (0..=MAX_DELETE_BATCH).map(|i| i.to_string()).collect();
        assert!(matches!(
            delete_venues(&store, &too_many, "ops").await,
            Err(ReconcileError::Validation(_))
        ));
    }
}
