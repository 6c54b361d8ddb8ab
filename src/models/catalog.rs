// src/models/catalog.rs - Production catalog records (venues and their dishes)
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Source tag written on venues created by the promotion pipeline.
pub const SOURCE_AUTOMATED_DISCOVERY: &str = "automated_discovery";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(default)]
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub country: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryPlatform {
    pub platform: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venue_id: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    #[default]
    Active,
    Stale,
    Archived,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Venue {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<String>,
    pub address: Address,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
    #[serde(default)]
    pub delivery_platforms: Vec<DeliveryPlatform>,
    #[serde(default)]
    pub status: RecordStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub last_verified: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Price {
    pub amount: f64,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dish {
    pub id: String,
    /// Owning venue. Reassigned on merge, never shared.
    pub venue_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub planted_products: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Price>,
    #[serde(default)]
    pub dietary_tags: Vec<String>,
    #[serde(default)]
    pub status: RecordStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Case-folded, trimmed form used for every URL and dish-name comparison.
pub fn fold(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Returns the platforms from `incoming` whose URL is not already present in `existing`
/// (case-insensitive), preserving incoming order and skipping repeats within `incoming`.
pub fn missing_platforms(
    existing: &[DeliveryPlatform],
    incoming: &[DeliveryPlatform],
) -> Vec<DeliveryPlatform> {
    let mut seen: std::collections::HashSet<String> =
        existing.iter().map(|p| fold(&p.url)).collect();
    incoming
        .iter()
        .filter(|p| seen.insert(fold(&p.url)))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn platform(name: &str, url: &str) -> DeliveryPlatform {
        DeliveryPlatform {
            platform: name.to_string(),
            url: url.to_string(),
            venue_id: None,
        }
    }

    #[test]
    fn test_missing_platforms_ignores_case_and_repeats() {
        let existing = vec![platform("wolt", "https://wolt.com/Venue-1")];
        let incoming = vec![
            platform("wolt", "HTTPS://WOLT.COM/venue-1"),
            platform("uber", "https://uber.com/v1"),
            platform("uber_eats", "https://uber.com/V1"),
        ];
        let added = missing_platforms(&existing, &incoming);
        assert_eq!(added.len(), 1);
        assert_eq!(added[0].platform, "uber");
    }

    #[test]
    fn test_venue_json_uses_camel_case() {
        let now = Utc::now();
        let venue = Venue {
            id: "v1".into(),
            name: "Green Bowl".into(),
            chain_id: Some("chain".into()),
            address: Address {
                street: None,
                city: "Berlin".into(),
                postal_code: Some("10115".into()),
                country: "DE".into(),
            },
            coordinates: None,
            delivery_platforms: vec![],
            status: RecordStatus::Active,
            source: None,
            last_verified: now,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(&venue).unwrap();
        assert_eq!(json["chainId"], "chain");
        assert_eq!(json["address"]["postalCode"], "10115");
        assert!(json["address"].get("street").is_none());
        assert_eq!(json["status"], "active");
    }
}
