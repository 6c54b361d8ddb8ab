// src/sync/orchestrator.rs - Promotes verified discovered venues and dishes into the catalog
//
// One call is one bounded batch, processed serially in two stages: venues first,
// then standalone dishes (whose parents may have been promoted in stage one).
// Every item commits in its own transaction; a failing item is recorded and the
// batch moves on.
use chrono::Utc;
use indicatif::{MultiProgress, ProgressBar};

use crate::audit::{changelog_entry, field_change, ACTION_SYNC, ACTION_VENUE_PROMOTED};
use crate::errors::{ReconcileError, ReconcileResult};
use crate::matching::address::validate_address;
use crate::matching::venue_matcher::{find_match, MatchRule};
use crate::merge::venue_merge::{dish_name_set, venue_dishes};
use crate::models::catalog::{fold, missing_platforms, SOURCE_AUTOMATED_DISCOVERY};
use crate::models::{
    DiscoveredDish, DiscoveredVenue, ItemCounts, RecordStatus, SyncHistoryRecord, SyncItemError,
    SyncReport, Venue,
};
use crate::store::{fetch_where, CatalogStore, Collection, Transaction};
use crate::sync::budget::SyncBudget;
use crate::sync::selection::{resolve_candidates, SyncSelection};
use crate::utils::config::DEFAULT_SYNC_MAX_ITEMS;
use crate::utils::logging::{Operation, OperationLogger};
use crate::utils::progress_config::item_bar;

#[derive(Debug)]
struct VenuePromotion {
    production_venue_id: String,
    created: bool,
    matched_by: Option<MatchRule>,
    dishes_added: usize,
}

#[derive(Debug)]
enum DishPromotion {
    Added(String),
    /// The production venue already had a dish with this name.
    Linked(String),
}

pub struct SyncOrchestrator<'a> {
    store: &'a dyn CatalogStore,
    actor_id: String,
    max_items: usize,
    budget: SyncBudget,
    multi_progress: Option<MultiProgress>,
}

impl<'a> SyncOrchestrator<'a> {
    pub fn new(store: &'a dyn CatalogStore, actor_id: &str) -> Self {
        Self {
            store,
            actor_id: actor_id.to_string(),
            max_items: DEFAULT_SYNC_MAX_ITEMS,
            budget: SyncBudget::unlimited(),
            multi_progress: None,
        }
    }

    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = max_items.max(1);
        self
    }

    pub fn with_budget(mut self, budget: SyncBudget) -> Self {
        self.budget = budget;
        self
    }

    pub fn with_progress(mut self, multi_progress: Option<MultiProgress>) -> Self {
        self.multi_progress = multi_progress;
        self
    }

    /// Runs one promotion batch. Only malformed selections and failure to read
    /// the candidate set are errors; everything else lands in the report.
    pub async fn execute(&self, selection: &SyncSelection) -> ReconcileResult<SyncReport> {
        selection.validate(self.max_items)?;
        let logger = OperationLogger::new(Operation::Sync);
        logger.log_start(&format!(
            "actor {}, {} venue ids, {} dish ids, sync_all={}, skip_address_validation={}",
            self.actor_id,
            selection.venue_ids.len(),
            selection.dish_ids.len(),
            selection.sync_all,
            selection.skip_address_validation
        ));

        let candidates = resolve_candidates(self.store, selection, self.max_items).await?;
        let mut report = SyncReport {
            requested: candidates.counts(),
            ineligible: candidates.ineligible.clone(),
            deferred: candidates.deferred,
            ..SyncReport::default()
        };
        if !report.ineligible.is_empty() {
            logger.log_phase(
                "Eligibility",
                Some(&format!("{} selected ids excluded", report.ineligible.len())),
            );
        }
        if candidates.deferred > 0 {
            logger.log_warning(&format!(
                "{} eligible entities deferred to a later call (cap {})",
                candidates.deferred, self.max_items
            ));
        }
        if candidates.is_empty() {
            logger.log_completion("nothing eligible to sync", 0);
            return Ok(report);
        }

        let total = candidates.venues.len() + candidates.dishes.len();
        let pb = item_bar(self.multi_progress.as_ref(), total, "Promoting discovered entities...");

        logger.log_phase("Venues", Some(&format!("{} eligible", candidates.venues.len())));
        self.promote_venues(&candidates.venues, selection, &mut report, &logger, pb.as_ref())
            .await;

        let mut standalone_synced = 0;
        if report.interrupted.is_none() {
            logger.log_phase("Dishes", Some(&format!("{} eligible", candidates.dishes.len())));
            standalone_synced = self
                .promote_dishes(&candidates.dishes, &mut report, &logger, pb.as_ref())
                .await;
        } else {
            report
                .unprocessed
                .extend(candidates.dishes.iter().map(|d| d.id.clone()));
        }
        if let Some(pb) = &pb {
            pb.finish_with_message("Promotion finished");
        }

        report.failed = ItemCounts {
            venues: report.requested.venues.saturating_sub(report.synced.venues()),
            dishes: report.requested.dishes.saturating_sub(standalone_synced),
        };

        self.record_audit(&mut report, &logger).await;
        logger.log_completion(
            &format!(
                "venues added {}, updated {}, dishes added {}, validation skips {}",
                report.synced.venues_added,
                report.synced.venues_updated,
                report.synced.dishes_added,
                report.skipped_for_validation.len()
            ),
            report.errors.len(),
        );
        Ok(report)
    }

    async fn promote_venues(
        &self,
        venues: &[DiscoveredVenue],
        selection: &SyncSelection,
        report: &mut SyncReport,
        logger: &OperationLogger,
        pb: Option<&ProgressBar>,
    ) {
        for (idx, discovered) in venues.iter().enumerate() {
            if let Some(reason) = self.budget.exhausted() {
                logger.log_warning(&format!("Stopping before venue {}: {}", discovered.id, reason));
                report.interrupted = Some(reason.to_string());
                report
                    .unprocessed
                    .extend(venues[idx..].iter().map(|v| v.id.clone()));
                return;
            }
            if let Some(pb) = pb {
                pb.inc(1);
            }

            if !selection.skip_address_validation {
                let validation = validate_address(&discovered.address);
                if !validation.valid {
                    let message = validation.errors.join("; ");
                    logger.log_item_skipped("venue", &discovered.id, &message);
                    report.errors.push(SyncItemError::venue(&discovered.id, message));
                    report.skipped_for_validation.push(discovered.id.clone());
                    continue;
                }
            }

            match self.promote_venue(discovered).await {
                Ok(outcome) => {
                    logger.log_debug(&format!(
                        "venue {} -> {} ({}, {} dishes)",
                        discovered.id,
                        outcome.production_venue_id,
                        outcome
                            .matched_by
                            .map_or("created", |rule| rule.as_str()),
                        outcome.dishes_added
                    ));
                    if outcome.created {
                        report.synced.venues_added += 1;
                    } else {
                        report.synced.venues_updated += 1;
                    }
                    report.synced.dishes_added += outcome.dishes_added;
                    report.synced_venue_ids.push(discovered.id.clone());
                }
                Err(e) => {
                    logger.log_item_failed("venue", &discovered.id, &e.to_string());
                    report.errors.push(SyncItemError::venue(&discovered.id, e.to_string()));
                }
            }
        }
    }

    async fn promote_venue(&self, discovered: &DiscoveredVenue) -> ReconcileResult<VenuePromotion> {
        // Catalog is re-read per item so earlier items in this batch are visible.
        let catalog: Vec<Venue> = fetch_where(self.store, Collection::Venues, &[]).await?;
        let matched = find_match(discovered, &catalog).map(|m| (m.venue.id.clone(), m.rule));

        let mut tx = Transaction::begin(self.store);
        let mut staged: DiscoveredVenue = tx
            .get(Collection::DiscoveredVenues, &discovered.id)
            .await?
            .ok_or_else(|| ReconcileError::NotFound {
                kind: "discovered venue",
                id: discovered.id.clone(),
            })?;
        if !staged.is_eligible() {
            return Err(ReconcileError::InvalidState(format!(
                "discovered venue {} is no longer eligible",
                staged.id
            )));
        }

        let now = Utc::now();
        let (venue, created) = match &matched {
            Some((venue_id, _)) => {
                let mut existing: Venue = tx
                    .get(Collection::Venues, venue_id)
                    .await?
                    .ok_or_else(|| ReconcileError::venue_not_found(venue_id))?;
                let added = missing_platforms(&existing.delivery_platforms, &staged.delivery_platforms);
                if !added.is_empty() {
                    let before = existing.delivery_platforms.clone();
                    existing.delivery_platforms.extend(added);
                    let entry = changelog_entry(
                        tx.new_id(),
                        ACTION_VENUE_PROMOTED,
                        &self.actor_id,
                        vec![existing.id.clone(), staged.id.clone()],
                        format!("Discovered venue {} added delivery platforms", staged.id),
                        vec![field_change(
                            "deliveryPlatforms",
                            &before,
                            &existing.delivery_platforms,
                        )],
                        now,
                    );
                    tx.put(Collection::Changelog, &entry.id, &entry)?;
                }
                existing.last_verified = now;
                existing.updated_at = now;
                (existing, false)
            }
            None => {
                let venue = Venue {
                    id: tx.new_id(),
                    name: staged.name.trim().to_string(),
                    chain_id: staged.chain_id.clone(),
                    address: staged.address.clone(),
                    coordinates: staged.coordinates,
                    delivery_platforms: missing_platforms(&[], &staged.delivery_platforms),
                    status: RecordStatus::Active,
                    source: Some(SOURCE_AUTOMATED_DISCOVERY.to_string()),
                    last_verified: now,
                    created_at: now,
                    updated_at: now,
                };
                (venue, true)
            }
        };
        tx.put(Collection::Venues, &venue.id, &venue)?;

        let existing_dishes = if created {
            Vec::new()
        } else {
            venue_dishes(&tx, &venue.id).await?
        };
        let mut names = dish_name_set(&existing_dishes);
        let mut dishes_added = 0;
        for embedded in &staged.dishes {
            let name = fold(&embedded.name);
            if name.is_empty() || !names.insert(name) {
                continue;
            }
            let dish = embedded.to_production(tx.new_id(), &venue.id, now);
            tx.put(Collection::Dishes, &dish.id, &dish)?;
            dishes_added += 1;
        }

        staged.mark_promoted(&venue.id, now);
        tx.put(Collection::DiscoveredVenues, &staged.id, &staged)?;
        tx.commit().await?;

        Ok(VenuePromotion {
            production_venue_id: venue.id,
            created,
            matched_by: matched.map(|(_, rule)| rule),
            dishes_added,
        })
    }

    /// Returns how many standalone dishes were added or linked.
    async fn promote_dishes(
        &self,
        dishes: &[DiscoveredDish],
        report: &mut SyncReport,
        logger: &OperationLogger,
        pb: Option<&ProgressBar>,
    ) -> usize {
        let mut synced = 0;
        for (idx, discovered) in dishes.iter().enumerate() {
            if let Some(reason) = self.budget.exhausted() {
                logger.log_warning(&format!("Stopping before dish {}: {}", discovered.id, reason));
                report.interrupted = Some(reason.to_string());
                report
                    .unprocessed
                    .extend(dishes[idx..].iter().map(|d| d.id.clone()));
                break;
            }
            if let Some(pb) = pb {
                pb.inc(1);
            }

            match self.promote_dish(discovered).await {
                Ok(outcome) => {
                    match outcome {
                        DishPromotion::Added(_) => report.synced.dishes_added += 1,
                        DishPromotion::Linked(ref id) => {
                            logger.log_debug(&format!(
                                "dish {} linked to existing dish {}",
                                discovered.id, id
                            ));
                            report.synced.dishes_linked += 1;
                        }
                    }
                    report.synced_dish_ids.push(discovered.id.clone());
                    synced += 1;
                }
                Err(e) => {
                    logger.log_item_failed("dish", &discovered.id, &e.to_string());
                    report.errors.push(SyncItemError::dish(&discovered.id, e.to_string()));
                }
            }
        }
        synced
    }

    async fn promote_dish(&self, discovered: &DiscoveredDish) -> ReconcileResult<DishPromotion> {
        let mut tx = Transaction::begin(self.store);
        let mut staged: DiscoveredDish = tx
            .get(Collection::DiscoveredDishes, &discovered.id)
            .await?
            .ok_or_else(|| ReconcileError::NotFound {
                kind: "discovered dish",
                id: discovered.id.clone(),
            })?;
        if !staged.is_eligible() {
            return Err(ReconcileError::InvalidState(format!(
                "discovered dish {} is no longer eligible",
                staged.id
            )));
        }

        let parent: DiscoveredVenue = tx
            .get(Collection::DiscoveredVenues, &staged.venue_id)
            .await?
            .ok_or_else(|| ReconcileError::NotFound {
                kind: "discovered venue",
                id: staged.venue_id.clone(),
            })?;
        let venue_id = parent
            .production_venue_id
            .ok_or_else(|| ReconcileError::VenueNotPromoted(staged.venue_id.clone()))?;
        let mut venue: Venue = tx
            .get(Collection::Venues, &venue_id)
            .await?
            .ok_or_else(|| ReconcileError::venue_not_found(&venue_id))?;

        let now = Utc::now();
        let name = fold(&staged.name);
        if name.is_empty() {
            return Err(ReconcileError::Validation(format!(
                "discovered dish {} has no name",
                staged.id
            )));
        }
        let existing = venue_dishes(&tx, &venue_id)
            .await?
            .into_iter()
            .find(|d| fold(&d.name) == name);

        let outcome = match existing {
            Some(dish) => DishPromotion::Linked(dish.id),
            None => {
                let dish = staged.to_production(tx.new_id(), &venue_id, now);
                tx.put(Collection::Dishes, &dish.id, &dish)?;
                venue.updated_at = now;
                tx.put(Collection::Venues, &venue.id, &venue)?;
                DishPromotion::Added(dish.id)
            }
        };
        let production_dish_id = match &outcome {
            DishPromotion::Added(id) | DishPromotion::Linked(id) => id.clone(),
        };
        staged.mark_promoted(&production_dish_id, now);
        tx.put(Collection::DiscoveredDishes, &staged.id, &staged)?;
        tx.commit().await?;
        Ok(outcome)
    }

    /// History record and summary changelog entry for the batch. Item commits
    /// are already durable, so a failure here is logged and not propagated.
    async fn record_audit(&self, report: &mut SyncReport, logger: &OperationLogger) {
        let now = Utc::now();
        let mut tx = Transaction::begin(self.store);
        let history = SyncHistoryRecord {
            id: tx.new_id(),
            actor_id: self.actor_id.clone(),
            synced_venue_ids: report.synced_venue_ids.clone(),
            synced_dish_ids: report.synced_dish_ids.clone(),
            venues_added: report.synced.venues_added,
            venues_updated: report.synced.venues_updated,
            dishes_added: report.synced.dishes_added,
            errors: report.errors.clone(),
            created_at: now,
        };
        let entry = changelog_entry(
            tx.new_id(),
            ACTION_SYNC,
            &self.actor_id,
            report
                .synced_venue_ids
                .iter()
                .chain(report.synced_dish_ids.iter())
                .cloned()
                .collect(),
            format!(
                "Sync: {} venues added, {} updated, {} dishes added, {} errors",
                report.synced.venues_added,
                report.synced.venues_updated,
                report.synced.dishes_added,
                report.errors.len()
            ),
            Vec::new(),
            now,
        );

        let staged = tx
            .put(Collection::SyncHistory, &history.id, &history)
            .and_then(|_| tx.put(Collection::Changelog, &entry.id, &entry));
        let result = match staged {
            Ok(()) => tx.commit().await,
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => report.history_id = Some(history.id),
            Err(e) => logger.log_error(&format!("Failed to write sync history: {}", e)),
        }
    }
}
