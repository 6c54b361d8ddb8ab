// src/api/requests.rs - JSON request bodies and their schema checks
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{ReconcileError, ReconcileResult};
use crate::merge::venue_merge::MAX_DELETE_BATCH;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DeleteDuplicatesRequest {
    pub venue_ids: Vec<String>,
}

impl DeleteDuplicatesRequest {
    pub fn validate(&self) -> ReconcileResult<()> {
        if self.venue_ids.is_empty() {
            return Err(ReconcileError::Validation("venueIds must not be empty".to_string()));
        }
        if self.venue_ids.len() > MAX_DELETE_BATCH {
            return Err(ReconcileError::Validation(format!(
                "venueIds accepts at most {} ids",
                MAX_DELETE_BATCH
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MergeVenuesRequest {
    pub primary_venue_id: String,
    pub secondary_venue_id: String,
}

/// Decodes a request body, turning shape errors into validation failures.
pub fn parse_body<T: DeserializeOwned>(body: &Value) -> ReconcileResult<T> {
    serde_json::from_value(body.clone())
        .map_err(|e| ReconcileError::Validation(format!("malformed request body: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_request_requires_both_ids() {
        let parsed: MergeVenuesRequest =
            parse_body(&json!({"primaryVenueId": "a", "secondaryVenueId": "b"})).unwrap();
        assert_eq!(parsed.primary_venue_id, "a");

        let err = parse_body::<MergeVenuesRequest>(&json!({"primaryVenueId": "a"})).unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn test_delete_request_bounds() {
        let empty: DeleteDuplicatesRequest = parse_body(&json!({"venueIds": []})).unwrap();
        assert!(empty.validate().is_err());

        let too_many = DeleteDuplicatesRequest {
            venue_ids: (0..=MAX_DELETE_BATCH).map(|i| format!("v{}", i)).collect(),
        };
        assert!(too_many.validate().is_err());

        assert!(parse_body::<DeleteDuplicatesRequest>(&json!({"venueIds": "v1"})).is_err());
        assert!(parse_body::<DeleteDuplicatesRequest>(&json!({"ids": ["v1"]})).is_err());
    }
}
