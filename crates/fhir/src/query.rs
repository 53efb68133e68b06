//! Query URL construction.
//!
//! The server matches on the exact parameter spelling, so every URL is assembled from the
//! constants below. Identifier and concept tokens (`system|value`) are form-URL-encoded; the
//! remaining parameters are literal.

use crate::{FhirError, FhirResult};
use vitalwatch_types::{Identifier, ResourceId};

/// Public HAPI test server that hosts the synthetic practitioner/patient data set.
pub const DEFAULT_BASE_URL: &str = "https://fhir.monash.edu/hapi-fhir-jpaserver/fhir/";

pub const JSON_FORMAT: &str = "_format=json";
pub const SORT_PARAMETER: &str = "_sort=";
pub const DESCENDING_DATE: &str = "-date";
pub const COUNT_PARAMETER: &str = "_count=";

pub const PRACTITIONER_SECTION: &str = "Practitioner/";
pub const PATIENT_SECTION: &str = "Patient/";
pub const OBSERVATION_SECTION: &str = "Observation/";
pub const ENCOUNTER_SECTION: &str = "Encounter";

/// Form-URL-encode one query component (alphanumerics and `*-._` pass through, space is `+`).
pub fn encode_component(raw: &str) -> String {
    url::form_urlencoded::byte_serialize(raw.as_bytes()).collect()
}

/// Builds every URL VitalWatch requests, relative to one server root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoints {
    base_url: String,
}

impl Endpoints {
    /// Create endpoints for a server root.
    ///
    /// A trailing `/` is added when missing.
    ///
    /// # Errors
    ///
    /// Returns [`FhirError::InvalidInput`] if `base_url` is not an absolute `http`/`https` URL.
    pub fn new(base_url: impl AsRef<str>) -> FhirResult<Self> {
        let raw = base_url.as_ref().trim();
        let parsed = url::Url::parse(raw)
            .map_err(|e| FhirError::InvalidInput(format!("invalid base URL '{raw}': {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(FhirError::InvalidInput(format!(
                "base URL must use http or https, got '{}'",
                parsed.scheme()
            )));
        }

        let mut base_url = raw.to_string();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Ok(Self { base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `Practitioner/<id>?_format=json`
    pub fn practitioner(&self, id: &ResourceId) -> String {
        format!("{}{}{}?{}", self.base_url, PRACTITIONER_SECTION, id, JSON_FORMAT)
    }

    /// `Patient/<id>?_format=json`
    pub fn patient(&self, id: &ResourceId) -> String {
        format!("{}{}{}?{}", self.base_url, PATIENT_SECTION, id, JSON_FORMAT)
    }

    /// `Patient/?identifier=<system|value>&_format=json`
    pub fn patient_by_identifier(&self, identifier: &Identifier) -> String {
        format!(
            "{}{}?identifier={}&{}",
            self.base_url,
            PATIENT_SECTION,
            encode_component(&identifier.token()),
            JSON_FORMAT
        )
    }

    /// `Encounter?practitioner.identifier=<system|value>&_format=json`
    pub fn encounters_for_practitioner(&self, identifier: &Identifier) -> String {
        format!(
            "{}{}?practitioner.identifier={}&{}",
            self.base_url,
            ENCOUNTER_SECTION,
            encode_component(&identifier.token()),
            JSON_FORMAT
        )
    }

    /// Observations of one concept for one patient, newest first, `count` per page.
    pub fn observations(&self, identifier: &Identifier, concept_token: &str, count: usize) -> String {
        format!(
            "{}{}?patient.identifier={}&code={}&{}{}&{}{}&{}",
            self.base_url,
            OBSERVATION_SECTION,
            encode_component(&identifier.token()),
            encode_component(concept_token),
            SORT_PARAMETER,
            DESCENDING_DATE,
            COUNT_PARAMETER,
            count,
            JSON_FORMAT
        )
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synthea(value: &str) -> Identifier {
        Identifier::new("https://github.com/synthetichealth/synthea", value).expect("identifier")
    }

    #[test]
    fn observation_query_matches_server_format() {
        let endpoints = Endpoints::default();
        let url = endpoints.observations(
            &synthea("a1efa37b-39ed-4b6d-ac48-d171cc7d1d41"),
            "http://loinc.org|2093-3",
            1,
        );
        assert_eq!(
            url,
            "https://fhir.monash.edu/hapi-fhir-jpaserver/fhir/Observation/?patient.identifier=https%3A%2F%2Fgithub.com%2Fsynthetichealth%2Fsynthea%7Ca1efa37b-39ed-4b6d-ac48-d171cc7d1d41&code=http%3A%2F%2Floinc.org%7C2093-3&_sort=-date&_count=1&_format=json"
        );
    }

    #[test]
    fn practitioner_and_patient_resource_urls() {
        let endpoints = Endpoints::new("http://localhost:8080/fhir").expect("endpoints");
        let id = ResourceId::new("29163").unwrap();
        assert_eq!(
            endpoints.practitioner(&id),
            "http://localhost:8080/fhir/Practitioner/29163?_format=json"
        );
        assert_eq!(
            endpoints.patient(&id),
            "http://localhost:8080/fhir/Patient/29163?_format=json"
        );
    }

    #[test]
    fn identifier_search_urls() {
        let endpoints = Endpoints::default();
        let id = Identifier::new("http://hl7.org/fhir/sid/us-npi", "500").unwrap();
        assert_eq!(
            endpoints.encounters_for_practitioner(&id),
            "https://fhir.monash.edu/hapi-fhir-jpaserver/fhir/Encounter?practitioner.identifier=http%3A%2F%2Fhl7.org%2Ffhir%2Fsid%2Fus-npi%7C500&_format=json"
        );
        assert_eq!(
            endpoints.patient_by_identifier(&id),
            "https://fhir.monash.edu/hapi-fhir-jpaserver/fhir/Patient/?identifier=http%3A%2F%2Fhl7.org%2Ffhir%2Fsid%2Fus-npi%7C500&_format=json"
        );
    }

    #[test]
    fn encode_component_uses_form_encoding() {
        assert_eq!(encode_component("a b|c"), "a+b%7Cc");
        assert_eq!(encode_component("A-z_0.9*"), "A-z_0.9*");
    }

    #[test]
    fn base_url_gets_trailing_slash() {
        let endpoints = Endpoints::new("https://example.org/fhir").unwrap();
        assert_eq!(endpoints.base_url(), "https://example.org/fhir/");
        let endpoints = Endpoints::new("https://example.org/fhir/").unwrap();
        assert_eq!(endpoints.base_url(), "https://example.org/fhir/");
    }

    #[test]
    fn rejects_bad_base_urls() {
        assert!(matches!(
            Endpoints::new("not a url"),
            Err(FhirError::InvalidInput(_))
        ));
        assert!(matches!(
            Endpoints::new("ftp://example.org/fhir"),
            Err(FhirError::InvalidInput(_))
        ));
    }
}
