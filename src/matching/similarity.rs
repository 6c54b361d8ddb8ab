// src/matching/similarity.rs
use strsim::normalized_levenshtein;

use crate::models::Coordinates;

const EARTH_RADIUS_M: f64 = 6_371_000.0;
const EARTH_RADIUS_KM: f64 = 6_371.0;

/// `1 - levenshtein / max(len)` over case-folded, trimmed input.
/// Two empty strings are identical (1.0).
pub fn name_similarity(a: &str, b: &str) -> f64 {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();
    normalized_levenshtein(&a, &b)
}

fn haversine(a: Coordinates, b: Coordinates, radius: f64) -> f64 {
    let (phi1, phi2) = (a.lat.to_radians(), b.lat.to_radians());
    let (delta_phi, delta_lambda) = ((b.lat - a.lat).to_radians(), (b.lng - a.lng).to_radians());
    let h = (delta_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (delta_lambda / 2.0).sin().powi(2);
    2.0 * radius * h.sqrt().atan2((1.0 - h).max(0.0).sqrt())
}

/// Great-circle distance in meters.
pub fn distance_meters(a: Coordinates, b: Coordinates) -> f64 {
    haversine(a, b, EARTH_RADIUS_M)
}

/// Great-circle distance in kilometers.
pub fn distance_km(a: Coordinates, b: Coordinates) -> f64 {
    haversine(a, b, EARTH_RADIUS_KM)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(lat: f64, lng: f64) -> Coordinates {
        Coordinates { lat, lng }
    }

    #[test]
    fn test_name_similarity_bounds() {
        assert_eq!(name_similarity("Green Bowl", " green bowl "), 1.0);
        assert_eq!(name_similarity("", ""), 1.0);
        assert_eq!(name_similarity("abc", ""), 0.0);
        assert_eq!(name_similarity("abc", "xyz"), 0.0);
    }

    #[test]
    fn test_name_similarity_ratio() {
        // kitten -> sitting: 3 edits over 7 characters
        let sim = name_similarity("kitten", "sitting");
        assert!((sim - (1.0 - 3.0 / 7.0)).abs() < 1e-9);
        assert_eq!(name_similarity("kitten", "sitting"), name_similarity("sitting", "kitten"));
    }

    #[test]
    fn test_distance_zero_and_symmetric() {
        let zurich = at(47.3769, 8.5417);
        let bern = at(46.9480, 7.4474);
        assert_eq!(distance_meters(zurich, zurich), 0.0);
        let there = distance_meters(zurich, bern);
        let back = distance_meters(bern, zurich);
        assert!((there - back).abs() < 1e-6);
        // roughly 95 km apart
        assert!((distance_km(zurich, bern) - 95.5).abs() < 2.0);
        assert!((there / 1000.0 - distance_km(zurich, bern)).abs() < 1e-6);
    }

    #[test]
    fn test_distance_antipodal_points_are_finite() {
        let d = distance_km(at(0.0, 0.0), at(0.0, 180.0));
        assert!(d.is_finite());
        assert!((d - std::f64::consts::PI * EARTH_RADIUS_KM).abs() < 1.0);
    }
}
