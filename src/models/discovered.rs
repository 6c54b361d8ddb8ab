// src/models/discovered.rs - Staging records produced by crawlers and partner webhooks
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::catalog::{Address, Coordinates, DeliveryPlatform, Dish, Price, RecordStatus};

/// Workflow state of a staged record. `Promoted` and `Rejected` are terminal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryStatus {
    #[default]
    Discovered,
    Verified,
    Rejected,
    Promoted,
}

impl DiscoveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscoveryStatus::Discovered => "discovered",
            DiscoveryStatus::Verified => "verified",
            DiscoveryStatus::Rejected => "rejected",
            DiscoveryStatus::Promoted => "promoted",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, DiscoveryStatus::Promoted | DiscoveryStatus::Rejected)
    }
}

/// A dish carried inside a discovered venue payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddedDish {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub planted_products: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Price>,
    #[serde(default)]
    pub dietary_tags: Vec<String>,
}

impl EmbeddedDish {
    pub fn to_production(&self, id: String, venue_id: &str, now: DateTime<Utc>) -> Dish {
        Dish {
            id,
            venue_id: venue_id.to_string(),
            name: self.name.trim().to_string(),
            description: self.description.clone(),
            planted_products: self.planted_products.clone(),
            price: self.price.clone(),
            dietary_tags: self.dietary_tags.clone(),
            status: RecordStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveredVenue {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<String>,
    #[serde(default)]
    pub address: Address,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
    #[serde(default)]
    pub delivery_platforms: Vec<DeliveryPlatform>,
    #[serde(default)]
    pub dishes: Vec<EmbeddedDish>,
    #[serde(default)]
    pub status: DiscoveryStatus,
    /// Idempotency marker, set exactly once on promotion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub production_venue_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promoted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DiscoveredVenue {
    pub fn is_eligible(&self) -> bool {
        self.status == DiscoveryStatus::Verified
            && self.production_venue_id.is_none()
            && self.promoted_at.is_none()
    }

    pub fn mark_promoted(&mut self, production_venue_id: &str, now: DateTime<Utc>) {
        self.status = DiscoveryStatus::Promoted;
        self.production_venue_id = Some(production_venue_id.to_string());
        self.promoted_at = Some(now);
        self.updated_at = now;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveredDish {
    pub id: String,
    /// Parent discovered venue.
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
    pub status: DiscoveryStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub production_dish_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promoted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DiscoveredDish {
    pub fn is_eligible(&self) -> bool {
        self.status == DiscoveryStatus::Verified
            && self.production_dish_id.is_none()
            && self.promoted_at.is_none()
    }

    pub fn mark_promoted(&mut self, production_dish_id: &str, now: DateTime<Utc>) {
        self.status = DiscoveryStatus::Promoted;
        self.production_dish_id = Some(production_dish_id.to_string());
        self.promoted_at = Some(now);
        self.updated_at = now;
    }

    pub fn to_production(&self, id: String, venue_id: &str, now: DateTime<Utc>) -> Dish {
        Dish {
            id,
            venue_id: venue_id.to_string(),
            name: self.name.trim().to_string(),
            description: self.description.clone(),
            planted_products: self.planted_products.clone(),
            price: self.price.clone(),
            dietary_tags: self.dietary_tags.clone(),
            status: RecordStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }
}
