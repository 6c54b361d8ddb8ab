pub mod catalog;
pub mod discovered;
pub mod reports;

pub use catalog::{Address, Coordinates, DeliveryPlatform, Dish, Price, RecordStatus, Venue};
pub use discovered::{DiscoveredDish, DiscoveredVenue, DiscoveryStatus, EmbeddedDish};
pub use reports::{
    ChangelogEntry, DeleteReport, DuplicateGroup, DuplicateScore, EntityType, FieldChange,
    ItemCounts, MergeHistoryRecord, MergeResult, PairScore, Recommendation, SyncHistoryRecord,
    SyncItemError, SyncReport, SyncedCounts,
};
