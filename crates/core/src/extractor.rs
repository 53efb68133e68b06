//! Clinical record extractors.
//!
//! An extractor knows two things about one observation concept: how to build the filtered,
//! newest-first search for it, and how to decode one search entry into typed readings.
//! [`ObservationSource`] combines an extractor with the locator to fetch the latest (or N-th
//! latest) reading for a patient.

use crate::constants::{CHOLESTEROL_LABEL, DIASTOLIC_LABEL, LATEST_PAGE_SIZE, SYSTOLIC_LABEL};
use crate::fetcher::ResourceFetcher;
use crate::locator::{locate, locate_at};
use crate::{SyncError, SyncResult};
use fhir::{Endpoints, ObservationConcept, Page};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use vitalwatch_types::{BloodPressure, Identifier, Observation};

/// Query construction and entry decoding for one observation concept.
pub trait ClinicalExtractor: Send + Sync {
    type Reading: Clone + PartialEq + fmt::Debug + Send;

    fn concept(&self) -> ObservationConcept;

    /// Newest-first search for this concept, `count` entries per page.
    fn build_query(&self, endpoints: &Endpoints, identifier: &Identifier, count: usize) -> String {
        endpoints.observations(identifier, &self.concept().token(), count)
    }

    /// Decode one entry. Fails as a whole; never returns a partial reading.
    fn decode(&self, entry: &Value) -> SyncResult<Self::Reading>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct CholesterolExtractor;

impl ClinicalExtractor for CholesterolExtractor {
    type Reading = Observation;

    fn concept(&self) -> ObservationConcept {
        ObservationConcept::TotalCholesterol
    }

    fn decode(&self, entry: &Value) -> SyncResult<Observation> {
        Ok(fhir::decode_cholesterol(entry)?)
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct BloodPressureExtractor;

impl ClinicalExtractor for BloodPressureExtractor {
    type Reading = BloodPressure;

    fn concept(&self) -> ObservationConcept {
        ObservationConcept::BloodPressure
    }

    fn decode(&self, entry: &Value) -> SyncResult<BloodPressure> {
        Ok(fhir::decode_blood_pressure(entry)?)
    }
}

/// Fetches readings for one patient through the locator.
#[derive(Clone, Copy)]
pub struct ObservationSource<'a> {
    fetcher: &'a dyn ResourceFetcher,
    endpoints: &'a Endpoints,
    max_page_hops: usize,
}

impl<'a> ObservationSource<'a> {
    pub fn new(
        fetcher: &'a dyn ResourceFetcher,
        endpoints: &'a Endpoints,
        max_page_hops: usize,
    ) -> Self {
        Self {
            fetcher,
            endpoints,
            max_page_hops,
        }
    }

    pub fn fetcher(&self) -> &'a dyn ResourceFetcher {
        self.fetcher
    }

    pub fn endpoints(&self) -> &'a Endpoints {
        self.endpoints
    }

    pub fn max_page_hops(&self) -> usize {
        self.max_page_hops
    }

    /// Most recent reading: a one-entry page, index 0.
    pub async fn latest<E: ClinicalExtractor>(
        &self,
        extractor: &E,
        identifier: &Identifier,
    ) -> SyncResult<E::Reading> {
        self.nth(extractor, identifier, LATEST_PAGE_SIZE, 0).await
    }

    /// Reading at `index` (0 = most recent), requesting `page_size` entries per page.
    pub async fn nth<E: ClinicalExtractor>(
        &self,
        extractor: &E,
        identifier: &Identifier,
        page_size: usize,
        index: usize,
    ) -> SyncResult<E::Reading> {
        let url = extractor.build_query(self.endpoints, identifier, page_size.max(1));
        let entry = locate_at(self.fetcher, &url, index, self.max_page_hops).await?;
        extractor.decode(&entry)
    }

    /// The `count` most recent readings from a single `_count = count` search.
    ///
    /// Each slot is located independently, so one bad entry does not hide its neighbours.
    pub async fn recent<E: ClinicalExtractor>(
        &self,
        extractor: &E,
        identifier: &Identifier,
        count: usize,
    ) -> SyncResult<Vec<SyncResult<E::Reading>>> {
        let url = extractor.build_query(self.endpoints, identifier, count.max(1));
        let first_page: Page = self.fetcher.fetch_page(&url).await?;

        let mut readings = Vec::with_capacity(count);
        for index in 0..count {
            let reading = match locate(self.fetcher, first_page.clone(), index, self.max_page_hops)
                .await
            {
                Ok(entry) => extractor.decode(&entry),
                Err(err) => Err(err),
            };
            readings.push(reading);
        }
        Ok(readings)
    }
}

/// The observation families a clinician can ask about.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ObservationKind {
    Cholesterol,
    BloodPressure,
}

impl ObservationKind {
    /// Row labels for this kind, in display order.
    pub fn labels(self) -> &'static [&'static str] {
        match self {
            Self::Cholesterol => &[CHOLESTEROL_LABEL],
            Self::BloodPressure => &[SYSTOLIC_LABEL, DIASTOLIC_LABEL],
        }
    }
}

impl FromStr for ObservationKind {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cholesterol" => Ok(Self::Cholesterol),
            "blood-pressure" | "bp" => Ok(Self::BloodPressure),
            other => Err(SyncError::InvalidConfig(format!(
                "unknown observation kind '{other}' (expected cholesterol or blood-pressure)"
            ))),
        }
    }
}

/// One labelled observation, as shown in a table row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabelledReading {
    pub label: &'static str,
    pub observation: Observation,
}

impl LabelledReading {
    pub fn new(label: &'static str, observation: Observation) -> Self {
        Self { label, observation }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{blood_pressure_entry, bundle, cholesterol_entry, MemoryFetcher, SYNTHEA};

    fn patient() -> Identifier {
        Identifier::new(SYNTHEA, "a1efa37b-39ed-4b6d-ac48-d171cc7d1d41").expect("identifier")
    }

    #[test]
    fn cholesterol_query_is_bit_exact() {
        let url = CholesterolExtractor.build_query(&Endpoints::default(), &patient(), 1);
        assert_eq!(
            url,
            "https://fhir.monash.edu/hapi-fhir-jpaserver/fhir/Observation/?patient.identifier=https%3A%2F%2Fgithub.com%2Fsynthetichealth%2Fsynthea%7Ca1efa37b-39ed-4b6d-ac48-d171cc7d1d41&code=http%3A%2F%2Floinc.org%7C2093-3&_sort=-date&_count=1&_format=json"
        );
    }

    #[test]
    fn blood_pressure_query_uses_panel_code() {
        let url = BloodPressureExtractor.build_query(&Endpoints::default(), &patient(), 10);
        assert!(url.contains("&code=http%3A%2F%2Floinc.org%7C55284-4&"));
        assert!(url.ends_with("&_sort=-date&_count=10&_format=json"));
    }

    #[tokio::test]
    async fn latest_cholesterol_round_trips_value_unit_and_timestamp() {
        let endpoints = Endpoints::default();
        let fetcher = MemoryFetcher::new();
        fetcher.insert(
            CholesterolExtractor.build_query(&endpoints, &patient(), 1),
            bundle(vec![cholesterol_entry(190.0, "2018-04-11T20:51:54+10:00")], None),
        );
        let source = ObservationSource::new(&fetcher, &endpoints, 10);

        let obs = source
            .latest(&CholesterolExtractor, &patient())
            .await
            .expect("latest");
        assert_eq!(obs.value, "190.0");
        assert_eq!(obs.unit, "mg/dL");
        assert_eq!(obs.timestamp, "2018-04-11T20:51:54+10:00");
    }

    #[tokio::test]
    async fn nth_blood_pressure_walks_pages() {
        let endpoints = Endpoints::default();
        let fetcher = MemoryFetcher::new();
        fetcher.insert(
            BloodPressureExtractor.build_query(&endpoints, &patient(), 1),
            bundle(
                vec![blood_pressure_entry(120.0, 80.0, "2020-01-02")],
                Some("https://example.org/bp-2"),
            ),
        );
        fetcher.insert(
            "https://example.org/bp-2",
            bundle(vec![blood_pressure_entry(135.0, 88.0, "2020-01-01")], None),
        );
        let source = ObservationSource::new(&fetcher, &endpoints, 10);

        let bp = source
            .nth(&BloodPressureExtractor, &patient(), 1, 1)
            .await
            .expect("nth");
        assert_eq!(bp.systolic().value, "135.0");
        assert_eq!(bp.diastolic().value, "88.0");
        assert_eq!(bp.timestamp(), "2020-01-01");
    }

    #[tokio::test]
    async fn undecodable_entry_is_an_error_not_a_partial_reading() {
        let endpoints = Endpoints::default();
        let fetcher = MemoryFetcher::new();
        fetcher.insert(
            CholesterolExtractor.build_query(&endpoints, &patient(), 1),
            bundle(vec![serde_json::json!({ "resource": { "valueQuantity": {} } })], None),
        );
        let source = ObservationSource::new(&fetcher, &endpoints, 10);

        let err = source
            .latest(&CholesterolExtractor, &patient())
            .await
            .expect_err("should fail");
        assert!(matches!(err, SyncError::Decode(_)));
    }

    #[tokio::test]
    async fn recent_locates_each_slot_independently() {
        let endpoints = Endpoints::default();
        let fetcher = MemoryFetcher::new();
        fetcher.insert(
            CholesterolExtractor.build_query(&endpoints, &patient(), 3),
            bundle(
                vec![
                    cholesterol_entry(201.0, "2021-03-01"),
                    serde_json::json!({ "resource": {} }),
                ],
                None,
            ),
        );
        let source = ObservationSource::new(&fetcher, &endpoints, 10);

        let readings = source
            .recent(&CholesterolExtractor, &patient(), 3)
            .await
            .expect("recent");
        assert_eq!(readings.len(), 3);
        assert_eq!(readings[0].as_ref().expect("first").value, "201.0");
        assert!(matches!(readings[1], Err(SyncError::Decode(_))));
        assert!(matches!(readings[2], Err(SyncError::OutOfRange { index: 2 })));
        assert_eq!(fetcher.requests().len(), 1);
    }

    #[test]
    fn observation_kind_parses_cli_names() {
        assert_eq!(
            "cholesterol".parse::<ObservationKind>().expect("kind"),
            ObservationKind::Cholesterol
        );
        assert_eq!(
            "Blood-Pressure".parse::<ObservationKind>().expect("kind"),
            ObservationKind::BloodPressure
        );
        assert!("glucose".parse::<ObservationKind>().is_err());
        assert_eq!(ObservationKind::BloodPressure.labels().len(), 2);
    }
}
