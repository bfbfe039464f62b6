//! Safe Harbor PHI field detection
//!
//! A field is PHI when its name contains one of the Safe Harbor identifier
//! substrings, compared case-insensitively. Separators are normalized first,
//! so `Birth-Date`, `birth date` and `birth_date` are all flagged.

use regex::RegexSet;
use std::collections::BTreeSet;
use std::sync::OnceLock;

/// Field-name substrings that mark a field as PHI
pub const PHI_FIELD_SUBSTRINGS: &[&str] = &[
    "name",
    "address",
    "city",
    "zip",
    "phone",
    "fax",
    "email",
    "ssn",
    "mrn",
    "health_plan_number",
    "account_number",
    "certificate_number",
    "vehicle_id",
    "device_id",
    "url",
    "ip_address",
    "biometric_id",
    "photo",
    "birth_date",
];

fn phi_patterns() -> &'static RegexSet {
    static PATTERNS: OnceLock<RegexSet> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        RegexSet::new(
            PHI_FIELD_SUBSTRINGS
                .iter()
                .map(|needle| format!("(?i){}", regex::escape(needle))),
        )
        .expect("escaped PHI substrings are valid patterns")
    })
}

fn normalize(field: &str) -> String {
    field
        .chars()
        .map(|c| match c {
            '-' | ' ' => '_',
            other => other,
        })
        .collect()
}

/// Whether a field name matches any Safe Harbor identifier substring
pub fn is_phi_field(field: &str) -> bool {
    phi_patterns().is_match(&normalize(field))
}

/// Subset of `fields` flagged as PHI
pub fn detect_phi_fields(fields: &BTreeSet<String>) -> BTreeSet<String> {
    fields
        .iter()
        .filter(|field| is_phi_field(field))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("name" ; "bare name")]
    #[test_case("patient_name" ; "suffix match")]
    #[test_case("EMAIL" ; "upper case")]
    #[test_case("Birth-Date" ; "hyphenated")]
    #[test_case("home address" ; "space separated")]
    #[test_case("zip_code" ; "zip code")]
    #[test_case("mrn" ; "medical record number")]
    #[test_case("primary_health_plan_number" ; "health plan number")]
    #[test_case("client_ip_address" ; "ip address")]
    #[test_case("photo_url" ; "photo url")]
    fn test_phi_fields_flagged(field: &str) {
        assert!(is_phi_field(field));
    }

    #[test_case("age")]
    #[test_case("heart_rate")]
    #[test_case("diagnosis_code")]
    #[test_case("lab_value")]
    fn test_clinical_fields_not_flagged(field: &str) {
        assert!(!is_phi_field(field));
    }

    #[test]
    fn test_detect_phi_fields_subset() {
        let fields: BTreeSet<String> = ["name", "age", "zip_code", "heart_rate"]
            .into_iter()
            .map(String::from)
            .collect();
        let phi = detect_phi_fields(&fields);
        assert_eq!(
            phi.into_iter().collect::<Vec<_>>(),
            vec!["name".to_string(), "zip_code".to_string()]
        );
    }

    #[test]
    fn test_every_substring_is_detected() {
        for needle in PHI_FIELD_SUBSTRINGS {
            assert!(is_phi_field(needle), "{needle} should be PHI");
        }
    }
}
