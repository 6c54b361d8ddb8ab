// src/api/handlers.rs - Endpoint handlers mapping core results to status + JSON body
//
// Batch endpoints answer 200 with counts and per-item errors even on partial
// failure. Only malformed input or a failure before any work is an error status.
use log::warn;
use serde::Serialize;
use serde_json::{json, Value};

use crate::api::requests::{parse_body, DeleteDuplicatesRequest, MergeVenuesRequest};
use crate::clustering::duplicate_clustering::{detect_duplicates, ScanStrategy};
use crate::errors::{ReconcileError, ReconcileResult};
use crate::merge::venue_merge::{delete_venues, merge_venues};
use crate::store::CatalogStore;
use crate::sync::{SyncBudget, SyncOrchestrator, SyncSelection};
use crate::utils::config::ReconcileConfig;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    fn from_result<T: Serialize>(result: ReconcileResult<T>) -> Self {
        match result.and_then(|value| serde_json::to_value(value).map_err(|e| {
            ReconcileError::Store(e.into())
        })) {
            Ok(body) => Self { status: 200, body },
            Err(e) => Self::from_error(&e),
        }
    }

    fn from_error(error: &ReconcileError) -> Self {
        let status = error.status_code();
        if status >= 500 {
            warn!("Request failed: {}", error);
        }
        Self {
            status,
            body: json!({ "error": error.to_string() }),
        }
    }
}

pub fn scan_strategy(config: &ReconcileConfig) -> ScanStrategy {
    if config.bucketed_duplicate_scan {
        ScanStrategy::BucketedByLocality
    } else {
        ScanStrategy::Exhaustive
    }
}

pub async fn handle_find_duplicates(store: &dyn CatalogStore, config: &ReconcileConfig) -> ApiResponse {
    let result = detect_duplicates(store, scan_strategy(config))
        .await
        .map(|groups| json!({ "groups": groups, "total": groups.len() }));
    ApiResponse::from_result(result)
}

pub async fn handle_delete_duplicates(
    store: &dyn CatalogStore,
    body: &Value,
    config: &ReconcileConfig,
) -> ApiResponse {
    let result = async {
        let request: DeleteDuplicatesRequest = parse_body(body)?;
        request.validate()?;
        delete_venues(store, &request.venue_ids, &config.actor_id).await
    }
    .await;
    ApiResponse::from_result(result)
}

pub async fn handle_merge_venues(
    store: &dyn CatalogStore,
    body: &Value,
    config: &ReconcileConfig,
) -> ApiResponse {
    let result = async {
        let request: MergeVenuesRequest = parse_body(body)?;
        merge_venues(
            store,
            &request.primary_venue_id,
            &request.secondary_venue_id,
            &config.actor_id,
        )
        .await
    }
    .await;
    ApiResponse::from_result(result)
}

pub async fn handle_execute_sync(
    store: &dyn CatalogStore,
    body: &Value,
    config: &ReconcileConfig,
    multi_progress: Option<indicatif::MultiProgress>,
) -> ApiResponse {
    let result = async {
        let selection: SyncSelection = parse_body(body)?;
        SyncOrchestrator::new(store, &config.actor_id)
            .with_max_items(config.sync_max_items)
            .with_budget(SyncBudget::new(config.sync_time_budget))
            .with_progress(multi_progress)
            .execute(&selection)
            .await
    }
    .await;
    ApiResponse::from_result(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::scorer::tests::{venue, with_url};
    use crate::store::{save, Collection, MemoryCatalog};

    fn config() -> ReconcileConfig {
        ReconcileConfig {
            actor_id: "api-test".to_string(),
            ..ReconcileConfig::default()
        }
    }

    async fn seeded() -> MemoryCatalog {
        let store = MemoryCatalog::new();
        for v in [
            with_url(venue("a", "Green Bowl", "Main 1", "Berlin", 5), "wolt", "https://wolt.com/gb"),
            with_url(venue("b", "Green Bowl", "Main 1", "Berlin", 1), "uber", "https://wolt.com/gb"),
            venue("c", "Taco Spot", "Side 9", "Munich", 3),
        ] {
            save(&store, Collection::Venues, &v.id, &v).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_find_duplicates_returns_groups() {
        let store = seeded().await;
        let response = handle_find_duplicates(&store, &config()).await;
        assert_eq!(response.status, 200);
        assert_eq!(response.body["total"], 1);
        assert_eq!(response.body["groups"][0]["recommendation"], "merge");
    }

    #[tokio::test]
    async fn test_merge_status_codes() {
        let store = seeded().await;
        let cfg = config();

        let malformed = handle_merge_venues(&store, &json!({"primaryVenueId": "a"}), &cfg).await;
        assert_eq!(malformed.status, 400);

        let missing = handle_merge_venues(
            &store,
            &json!({"primaryVenueId": "a", "secondaryVenueId": "zzz"}),
            &cfg,
        )
        .await;
        assert_eq!(missing.status, 404);

        let same = handle_merge_venues(
            &store,
            &json!({"primaryVenueId": "a", "secondaryVenueId": "a"}),
            &cfg,
        )
        .await;
        assert_eq!(same.status, 409);

        let merged = handle_merge_venues(
            &store,
            &json!({"primaryVenueId": "a", "secondaryVenueId": "b"}),
            &cfg,
        )
        .await;
        assert!(merged.is_success());
        assert_eq!(merged.body["secondaryVenueId"], "b");
        assert_eq!(store.count(Collection::Venues).await, 2);
    }

    #[tokio::test]
    async fn test_delete_reports_partial_results_with_200() {
        let store = seeded().await;
        let response =
            handle_delete_duplicates(&store, &json!({"venueIds": ["c", "nope"]}), &config()).await;
        assert_eq!(response.status, 200);
        assert_eq!(response.body["deletedVenueIds"], json!(["c"]));
        assert_eq!(response.body["notFound"], json!(["nope"]));
    }

    #[tokio::test]
    async fn test_execute_sync_validates_body() {
        let store = seeded().await;
        let cfg = config();
        let empty = handle_execute_sync(&store, &json!({}), &cfg, None).await;
        assert_eq!(empty.status, 400);
        let unknown = handle_execute_sync(&store, &json!({"everything": true}), &cfg, None).await;
        assert_eq!(unknown.status, 400);

        let nothing = handle_execute_sync(&store, &json!({"syncAll": true}), &cfg, None).await;
        assert_eq!(nothing.status, 200);
        assert_eq!(nothing.body["requested"]["venues"], 0);
    }
}
