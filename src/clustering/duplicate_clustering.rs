// src/clustering/duplicate_clustering.rs - Groups catalog venues into duplicate clusters
use log::debug;
use petgraph::unionfind::UnionFind;
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::errors::ReconcileResult;
use crate::matching::address::normalize_address;
use crate::matching::scorer::score_venues;
use crate::models::{DuplicateGroup, PairScore, Recommendation, Venue};
use crate::store::{fetch_where, CatalogStore, Collection};
use crate::utils::logging::{Operation, OperationLogger};

/// Minimum pairwise score for two venues to be linked.
pub const DUPLICATE_THRESHOLD: f64 = 50.0;
pub const MERGE_THRESHOLD: f64 = 70.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanStrategy {
    /// Score every unordered pair.
    #[default]
    Exhaustive,
    /// Only score pairs sharing a normalized `city|country`.
    BucketedByLocality,
}

pub fn recommend(score: f64) -> Recommendation {
    if score >= MERGE_THRESHOLD {
        Recommendation::Merge
    } else if score >= DUPLICATE_THRESHOLD {
        Recommendation::Review
    } else {
        Recommendation::KeepBoth
    }
}

fn locality_key(venue: &Venue) -> String {
    // street|postal|city|country -> city|country
    let key = normalize_address(&venue.address);
    key.splitn(3, '|').nth(2).unwrap_or_default().to_string()
}

/// Scores the candidate pairs (indices into `venues`, i < j) and keeps those at
/// or above the duplicate threshold.
pub fn score_pairs(venues: &[Venue], strategy: ScanStrategy) -> Vec<(usize, usize, PairScore)> {
    let mut candidate_pairs: Vec<(usize, usize)> = Vec::new();
    match strategy {
        ScanStrategy::Exhaustive => {
            for i in 0..venues.len() {
                for j in (i + 1)..venues.len() {
                    candidate_pairs.push((i, j));
                }
            }
        }
        ScanStrategy::BucketedByLocality => {
            let mut buckets: HashMap<String, Vec<usize>> = HashMap::new();
            for (idx, venue) in venues.iter().enumerate() {
                buckets.entry(locality_key(venue)).or_default().push(idx);
            }
            for members in buckets.values() {
                for (pos, &i) in members.iter().enumerate() {
                    for &j in &members[pos + 1..] {
                        candidate_pairs.push((i.min(j), i.max(j)));
                    }
                }
            }
            candidate_pairs.sort_unstable();
        }
    }
    debug!("Scoring {} candidate venue pairs", candidate_pairs.len());

    candidate_pairs
        .into_iter()
        .filter_map(|(i, j)| {
            let score = score_venues(&venues[i], &venues[j]);
            (score.total_score >= DUPLICATE_THRESHOLD).then(|| {
                (
                    i,
                    j,
                    PairScore {
                        venue_id_1: venues[i].id.clone(),
                        venue_id_2: venues[j].id.clone(),
                        score,
                    },
                )
            })
        })
        .collect()
}

/// Partitions venues into connected components over the retained pairs. Each
/// venue lands in at most one group; singletons are dropped.
pub fn build_groups(venues: &[Venue], pairs: Vec<(usize, usize, PairScore)>) -> Vec<DuplicateGroup> {
    let mut components = UnionFind::<usize>::new(venues.len());
    for (i, j, _) in &pairs {
        components.union(*i, *j);
    }

    let mut members_by_root: HashMap<usize, Vec<usize>> = HashMap::new();
    for (i, j, _) in &pairs {
        for idx in [*i, *j] {
            let members = members_by_root.entry(components.find(idx)).or_default();
            if !members.contains(&idx) {
                members.push(idx);
            }
        }
    }
    let mut pairs_by_root: HashMap<usize, Vec<PairScore>> = HashMap::new();
    for (i, _, pair) in pairs {
        pairs_by_root.entry(components.find(i)).or_default().push(pair);
    }

    let mut groups: Vec<DuplicateGroup> = members_by_root
        .into_iter()
        .filter(|(_, members)| members.len() >= 2)
        .map(|(root, members)| {
            let mut group_venues: Vec<Venue> =
                members.into_iter().map(|idx| venues[idx].clone()).collect();
            group_venues.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
            let group_pairs = pairs_by_root.remove(&root).unwrap_or_default();
            let score = group_pairs
                .iter()
                .map(|p| p.score.total_score)
                .fold(0.0, f64::max);
            DuplicateGroup {
                venues: group_venues,
                score,
                recommendation: recommend(score),
                pairs: group_pairs,
            }
        })
        .collect();

    groups.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.venues[0].created_at.cmp(&b.venues[0].created_at))
            .then_with(|| a.venues[0].id.cmp(&b.venues[0].id))
    });
    groups
}

pub fn find_duplicate_groups(venues: &[Venue], strategy: ScanStrategy) -> Vec<DuplicateGroup> {
    let pairs = score_pairs(venues, strategy);
    build_groups(venues, pairs)
}

/// Read-only scan of the whole catalog. Results are advisory: venues written
/// after the scan started are not considered.
pub async fn detect_duplicates(
    store: &dyn CatalogStore,
    strategy: ScanStrategy,
) -> ReconcileResult<Vec<DuplicateGroup>> {
    let logger = OperationLogger::new(Operation::DuplicateScan);
    logger.log_start(&format!("{:?} duplicate scan", strategy));

    let venues: Vec<Venue> = fetch_where(store, Collection::Venues, &[]).await?;
    logger.log_phase("Scoring", Some(&format!("{} venues loaded", venues.len())));

    let groups = find_duplicate_groups(&venues, strategy);
    let merge_ready = groups
        .iter()
        .filter(|g| g.recommendation == Recommendation::Merge)
        .count();
    logger.log_completion(
        &format!(
            "{} duplicate groups ({} merge, {} review)",
            groups.len(),
            merge_ready,
            groups.len() - merge_ready
        ),
        0,
    );
    Ok(groups)
}
