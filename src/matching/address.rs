// src/matching/address.rs - Address comparison keys and the completeness gate
use serde::Serialize;

use crate::models::Address;

/// City value crawlers emit when they could not resolve a locality.
const PLACEHOLDER_CITY: &str = "Unknown";

/// Canonical comparison key: `street|postal_code|city|country`, each segment
/// trimmed and lowercased, missing segments empty. No token rewriting, so
/// "Main St" and "Main Street" stay distinct.
pub fn normalize_address(address: &Address) -> String {
    [
        address.street.as_deref().unwrap_or(""),
        address.postal_code.as_deref().unwrap_or(""),
        address.city.as_str(),
        address.country.as_str(),
    ]
    .iter()
    .map(|segment| segment.trim().to_lowercase())
    .collect::<Vec<_>>()
    .join("|")
}

pub fn addresses_match(a: &Address, b: &Address) -> bool {
    normalize_address(a) == normalize_address(b)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddressValidation {
    pub valid: bool,
    pub errors: Vec<String>,
}

/// Checks that an address carries enough data to be promoted. Never mutates.
pub fn validate_address(address: &Address) -> AddressValidation {
    let mut errors = Vec::new();

    if address.street.as_deref().map_or(true, |s| s.trim().is_empty()) {
        errors.push("street is required".to_string());
    }
    let city = address.city.trim();
    if city.is_empty() {
        errors.push("city is required".to_string());
    } else if city == PLACEHOLDER_CITY {
        errors.push("city is the placeholder 'Unknown'".to_string());
    }
    if address.country.trim().is_empty() {
        errors.push("country is required".to_string());
    }

    AddressValidation {
        valid: errors.is_empty(),
        errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address(street: Option<&str>, postal: Option<&str>, city: &str, country: &str) -> Address {
        Address {
            street: street.map(str::to_string),
            city: city.to_string(),
            postal_code: postal.map(str::to_string),
            country: country.to_string(),
        }
    }

    #[test]
    fn test_normalize_ignores_case_and_whitespace() {
        let a = address(Some(" 123 Main St "), Some("8001"), "Zürich ", "CH");
        let b = address(Some("123 main st"), Some(" 8001"), "ZÜRICH", " ch");
        assert_eq!(normalize_address(&a), "123 main st|8001|zürich|ch");
        assert_eq!(normalize_address(&a), normalize_address(&b));
        assert_eq!(normalize_address(&a), normalize_address(&a));
    }

    #[test]
    fn test_missing_fields_render_empty() {
        let a = address(None, None, "Berlin", "DE");
        assert_eq!(normalize_address(&a), "||berlin|de");
        assert!(!normalize_address(&a).contains("none"));
    }

    #[test]
    fn test_abbreviations_are_not_expanded() {
        let a = address(Some("123 Main St"), None, "Berlin", "DE");
        let b = address(Some("123 Main Street"), None, "Berlin", "DE");
        assert!(!addresses_match(&a, &b));
    }

    #[test]
    fn test_validate_accepts_complete_address() {
        let result = validate_address(&address(Some("Hauptstr. 1"), None, "Berlin", "DE"));
        assert!(result.valid);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn test_validate_rejects_missing_street_and_placeholder_city() {
        let result = validate_address(&address(Some("  "), None, "Unknown", ""));
        assert!(!result.valid);
        assert_eq!(result.errors.len(), 3);
        assert!(result.errors[0].contains("street"));
        assert!(result.errors[1].contains("Unknown"));
        assert!(result.errors[2].contains("country"));
    }
}
