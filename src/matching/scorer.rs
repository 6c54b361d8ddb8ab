// src/matching/scorer.rs - Weighted multi-factor duplicate score between two venues
use std::collections::HashSet;

use crate::matching::address::addresses_match;
use crate::matching::similarity::{distance_meters, name_similarity};
use crate::models::catalog::fold;
use crate::models::{DeliveryPlatform, DuplicateScore, Venue};

pub const ADDRESS_WEIGHT: f64 = 40.0;
pub const PROXIMITY_WEIGHT: f64 = 30.0;
pub const PLATFORM_URL_WEIGHT: f64 = 25.0;
pub const NAME_WEIGHT: f64 = 5.0;

pub const NEAR_DISTANCE_M: f64 = 100.0;
pub const CLOSE_DISTANCE_M: f64 = 500.0;
pub const STRONG_NAME_SIMILARITY: f64 = 0.8;
pub const WEAK_NAME_SIMILARITY: f64 = 0.6;

/// Distance reported when either venue has no coordinates.
pub const UNKNOWN_DISTANCE: f64 = -1.0;

/// True when any delivery URL of `a` equals any of `b`, ignoring case and platform name.
pub fn platform_urls_overlap(a: &[DeliveryPlatform], b: &[DeliveryPlatform]) -> bool {
    if a.is_empty() || b.is_empty() {
        return false;
    }
    let urls: HashSet<String> = a.iter().map(|p| fold(&p.url)).collect();
    b.iter().any(|p| urls.contains(&fold(&p.url)))
}

fn proximity_points(distance_m: f64) -> f64 {
    if distance_m < 0.0 {
        0.0
    } else if distance_m < NEAR_DISTANCE_M {
        PROXIMITY_WEIGHT
    } else if distance_m < CLOSE_DISTANCE_M {
        PROXIMITY_WEIGHT / 2.0
    } else {
        0.0
    }
}

fn name_points(similarity: f64) -> f64 {
    if similarity > STRONG_NAME_SIMILARITY {
        NAME_WEIGHT
    } else if similarity > WEAK_NAME_SIMILARITY {
        NAME_WEIGHT / 2.0
    } else {
        0.0
    }
}

pub fn score_venues(a: &Venue, b: &Venue) -> DuplicateScore {
    let address_match = addresses_match(&a.address, &b.address);
    let coordinate_proximity_m = match (a.coordinates, b.coordinates) {
        (Some(ca), Some(cb)) => distance_meters(ca, cb),
        _ => UNKNOWN_DISTANCE,
    };
    let platform_url_match = platform_urls_overlap(&a.delivery_platforms, &b.delivery_platforms);
    let name_similarity = name_similarity(&a.name, &b.name);

    let mut total_score = 0.0;
    if address_match {
        total_score += ADDRESS_WEIGHT;
    }
    total_score += proximity_points(coordinate_proximity_m);
    if platform_url_match {
        total_score += PLATFORM_URL_WEIGHT;
    }
    total_score += name_points(name_similarity);

    DuplicateScore {
        address_match,
        coordinate_proximity_m,
        platform_url_match,
        name_similarity,
        total_score,
    }
}
