//! Allow-list for upstream FHIR store base URLs.
//!
//! Callers name the store they want through a request header, so the value
//! is attacker controlled. Only the exact Cloud Healthcare API resource
//! shape is accepted; anything else (other hosts, metadata endpoints,
//! extra path segments) never reaches the HTTP client.

use std::sync::LazyLock;

use regex::Regex;

/// Segments are ASCII word characters and hyphens. Rust's `\w` is Unicode
/// aware, so the class is spelled out.
static HEALTHCARE_API_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^https://healthcare\.googleapis\.com/v1/projects/[A-Za-z0-9_-]+/locations/[A-Za-z0-9_-]+/datasets/[A-Za-z0-9_-]+/fhirStores/[A-Za-z0-9_-]+$",
    )
    .expect("store base pattern compiles")
});

/// Decides whether a caller-supplied store base may be dereferenced.
pub trait StoreBaseValidator: Send + Sync {
    fn is_valid(&self, candidate: &str) -> bool;
}

impl<F> StoreBaseValidator for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn is_valid(&self, candidate: &str) -> bool {
        self(candidate)
    }
}

/// Production validator: Cloud Healthcare API FHIR stores only.
#[derive(Debug, Clone, Copy, Default)]
pub struct HealthcareApiValidator;

impl StoreBaseValidator for HealthcareApiValidator {
    fn is_valid(&self, candidate: &str) -> bool {
        is_valid_store_base(candidate)
    }
}

/// Accepts every store base. For pointing the proxy at local mock stores.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAnyStoreBase;

impl StoreBaseValidator for AllowAnyStoreBase {
    fn is_valid(&self, _candidate: &str) -> bool {
        true
    }
}

/// Returns true if `candidate` is a Cloud Healthcare API FHIR store URL.
pub fn is_valid_store_base(candidate: &str) -> bool {
    HEALTHCARE_API_PATTERN.is_match(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = "https://healthcare.googleapis.com/v1/projects/my-project/locations/us-central1/datasets/my-dataset/fhirStores/my-store";

    #[test]
    fn test_accepts_store_url() {
        assert!(is_valid_store_base(VALID));
        assert!(is_valid_store_base(
            "https://healthcare.googleapis.com/v1/projects/ada-health_123/locations/us-east1/datasets/demo-fhir/fhirStores/store_v2"
        ));
    }

    #[test]
    fn test_rejects_plain_http() {
        assert!(!is_valid_store_base(
            "http://healthcare.googleapis.com/v1/projects/p/locations/l/datasets/d/fhirStores/s"
        ));
    }

    #[test]
    fn test_rejects_other_hosts() {
        assert!(!is_valid_store_base(
            "https://evil.com/v1/projects/p/locations/l/datasets/d/fhirStores/s"
        ));
        assert!(!is_valid_store_base("http://169.254.169.254/latest/meta-data"));
        assert!(!is_valid_store_base(
            "https://healthcare.googleapis.com.evil.com/v1/projects/p/locations/l/datasets/d/fhirStores/s"
        ));
        assert!(!is_valid_store_base(
            "https://user@healthcare.googleapis.com/v1/projects/p/locations/l/datasets/d/fhirStores/s"
        ));
    }

    #[test]
    fn test_rejects_trailing_segments() {
        assert!(!is_valid_store_base(&format!("{}/fhir/Patient", VALID)));
        assert!(!is_valid_store_base(&format!("{}/", VALID)));
        assert!(!is_valid_store_base(&format!("{}?x=1", VALID)));
    }

    #[test]
    fn test_rejects_traversal_segments() {
        assert!(!is_valid_store_base(
            "https://healthcare.googleapis.com/v1/projects/../other/locations/l/datasets/d/fhirStores/s"
        ));
        assert!(!is_valid_store_base(
            "https://healthcare.googleapis.com/v1/projects/.../other/locations/l/datasets/d/fhirStores/s"
        ));
        assert!(!is_valid_store_base(
            "https://healthcare.googleapis.com/v1/projects/../locations/l/datasets/d/fhirStores/s"
        ));
        assert!(!is_valid_store_base(
            "https://healthcare.googleapis.com/v1/projects/p/locations//datasets/d/fhirStores/s"
        ));
    }

    #[test]
    fn test_rejects_non_ascii_word_characters() {
        assert!(!is_valid_store_base(
            "https://healthcare.googleapis.com/v1/projects/pröject/locations/l/datasets/d/fhirStores/s"
        ));
    }

    #[test]
    fn test_validators() {
        assert!(HealthcareApiValidator.is_valid(VALID));
        assert!(!HealthcareApiValidator.is_valid("http://localhost:1234/v1/stores/s"));
        assert!(AllowAnyStoreBase.is_valid("http://localhost:1234/v1/stores/s"));

        let only_local = |candidate: &str| candidate.starts_with("http://127.0.0.1");
        assert!(only_local.is_valid("http://127.0.0.1:9/x"));
        assert!(!only_local.is_valid(VALID));
    }

    #[test]
    fn test_is_pure() {
        for _ in 0..3 {
            assert!(is_valid_store_base(VALID));
            assert!(!is_valid_store_base("https://evil.com"));
        }
    }
}
