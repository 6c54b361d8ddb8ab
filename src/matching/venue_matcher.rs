// src/matching/venue_matcher.rs - Finds the production venue a discovered venue corresponds to
//
// Rules are evaluated in priority order. For each rule the whole candidate list is
// scanned before the next rule is tried, so a URL match anywhere in the catalog
// beats an address match earlier in the list.
use serde::Serialize;

use crate::matching::address::addresses_match;
use crate::matching::scorer::platform_urls_overlap;
use crate::models::{DiscoveredVenue, Venue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchRule {
    PlatformUrl,
    ExactAddress,
    ChainLocality,
}

impl MatchRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchRule::PlatformUrl => "platform_url",
            MatchRule::ExactAddress => "exact_address",
            MatchRule::ChainLocality => "chain_locality",
        }
    }
}

type RulePredicate = fn(&DiscoveredVenue, &Venue) -> bool;

pub const MATCH_RULES: [(MatchRule, RulePredicate); 3] = [
    (MatchRule::PlatformUrl, platform_url_rule),
    (MatchRule::ExactAddress, exact_address_rule),
    (MatchRule::ChainLocality, chain_locality_rule),
];

#[derive(Debug, Clone, Copy)]
pub struct VenueMatch<'a> {
    pub venue: &'a Venue,
    pub rule: MatchRule,
}

pub fn platform_url_rule(discovered: &DiscoveredVenue, candidate: &Venue) -> bool {
    platform_urls_overlap(&discovered.delivery_platforms, &candidate.delivery_platforms)
}

pub fn exact_address_rule(discovered: &DiscoveredVenue, candidate: &Venue) -> bool {
    addresses_match(&discovered.address, &candidate.address)
}

/// Same chain in the same city and country, with equal streets or a street
/// missing on either side (chain outlets are often known only by city).
pub fn chain_locality_rule(discovered: &DiscoveredVenue, candidate: &Venue) -> bool {
    let same_chain = match (
        non_blank(discovered.chain_id.as_deref()),
        non_blank(candidate.chain_id.as_deref()),
    ) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    };
    if !same_chain {
        return false;
    }
    let (d, c) = (&discovered.address, &candidate.address);
    if !eq_folded(&d.city, &c.city) || !eq_folded(&d.country, &c.country) {
        return false;
    }
    match (non_blank(d.street.as_deref()), non_blank(c.street.as_deref())) {
        (Some(a), Some(b)) => eq_folded(a, b),
        _ => true,
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn eq_folded(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

/// First candidate satisfying the highest-priority rule, or None ("create new").
pub fn find_match<'a>(discovered: &DiscoveredVenue, candidates: &'a [Venue]) -> Option<VenueMatch<'a>> {
    MATCH_RULES.iter().find_map(|(rule, predicate)| {
        candidates
            .iter()
            .find(|candidate| predicate(discovered, candidate))
            .map(|venue| VenueMatch { venue, rule: *rule })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::scorer::tests::{venue, with_url};
    use crate::models::{Address, DeliveryPlatform, DiscoveryStatus};
    use chrono::Utc;

    fn discovered(name: &str, street: Option<&str>, city: &str) -> DiscoveredVenue {
        let now = Utc::now();
        DiscoveredVenue {
            id: "dv".into(),
            name: name.into(),
            chain_id: None,
            address: Address {
                street: street.map(str::to_string),
                city: city.into(),
                postal_code: None,
                country: "DE".into(),
            },
            coordinates: None,
            delivery_platforms: vec![],
            dishes: vec![],
            status: DiscoveryStatus::Verified,
            production_venue_id: None,
            promoted_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_url_rule_beats_earlier_address_match() {
        let mut d = discovered("Green Bowl", Some("Main 1"), "Berlin");
        d.delivery_platforms.push(DeliveryPlatform {
            platform: "wolt".into(),
            url: "https://wolt.com/GB".into(),
            venue_id: None,
        });
        let candidates = vec![
            venue("by-address", "Green Bowl", "Main 1", "Berlin", 3),
            with_url(venue("by-url", "GB", "Elsewhere 5", "Berlin", 2), "wolt", "https://wolt.com/gb"),
        ];
        let found = find_match(&d, &candidates).unwrap();
        assert_eq!(found.venue.id, "by-url");
        assert_eq!(found.rule, MatchRule::PlatformUrl);
    }

    #[test]
    fn test_exact_address_rule() {
        let d = discovered("Green Bowl", Some(" main 1"), "BERLIN");
        let candidates = vec![
            venue("other", "Green Bowl", "Main 2", "Berlin", 3),
            venue("same", "Different Name", "Main 1", "Berlin", 2),
        ];
        let found = find_match(&d, &candidates).unwrap();
        assert_eq!(found.venue.id, "same");
        assert_eq!(found.rule, MatchRule::ExactAddress);
    }

    #[test]
    fn test_chain_rule_allows_missing_street() {
        let mut d = discovered("Planted Burger #4", None, "hamburg");
        d.chain_id = Some("burger-chain".into());
        let mut outlet = venue("outlet", "Planted Burger", "Hafen 3", "Hamburg", 2);
        outlet.chain_id = Some("burger-chain".into());
        let candidates = vec![outlet];
        let found = find_match(&d, &candidates).unwrap();
        assert_eq!(found.rule, MatchRule::ChainLocality);
    }

    #[test]
    fn test_chain_rule_requires_same_street_when_both_present() {
        let mut d = discovered("Planted Burger", Some("Other 9"), "Hamburg");
        d.chain_id = Some("burger-chain".into());
        let mut outlet = venue("outlet", "Planted Burger", "Hafen 3", "Hamburg", 2);
        outlet.chain_id = Some("burger-chain".into());
        assert!(!chain_locality_rule(&d, &outlet));

        d.address.street = Some("HAFEN 3".into());
        assert!(chain_locality_rule(&d, &outlet));

        d.chain_id = Some("  ".into());
        outlet.chain_id = Some("  ".into());
        assert!(!chain_locality_rule(&d, &outlet));
    }

    #[test]
    fn test_no_rule_matches() {
        let d = discovered("Brand New", Some("Nowhere 1"), "Köln");
        let candidates = vec![venue("v", "Green Bowl", "Main 1", "Berlin", 1)];
        assert!(find_match(&d, &candidates).is_none());
        assert!(find_match(&d, &[]).is_none());
    }
}
