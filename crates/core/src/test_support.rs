//! In-memory fetcher and canned FHIR documents for unit tests.

use crate::fetcher::ResourceFetcher;
use crate::{SyncError, SyncResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;

pub(crate) const SYNTHEA: &str = "https://github.com/synthetichealth/synthea";
pub(crate) const NPI: &str = "http://hl7.org/fhir/sid/us-npi";

/// Serves canned documents by exact URL and records every URL requested.
#[derive(Default)]
pub(crate) struct MemoryFetcher {
    documents: Mutex<HashMap<String, Value>>,
    requests: Mutex<Vec<String>>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, url: impl Into<String>, document: Value) {
        self.documents.lock().insert(url.into(), document);
    }

    pub fn remove(&self, url: &str) {
        self.documents.lock().remove(url);
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self, url: &str) -> usize {
        self.requests.lock().iter().filter(|u| *u == url).count()
    }
}

#[async_trait]
impl ResourceFetcher for MemoryFetcher {
    async fn fetch(&self, url: &str) -> SyncResult<Value> {
        self.requests.lock().push(url.to_string());
        self.documents
            .lock()
            .get(url)
            .cloned()
            .ok_or_else(|| SyncError::NotFound(url.to_string()))
    }
}

pub(crate) fn bundle(entries: Vec<Value>, next: Option<&str>) -> Value {
    let mut links = vec![json!({ "relation": "self", "url": "https://example.org/self" })];
    if let Some(next) = next {
        links.push(json!({ "relation": "next", "url": next }));
    }
    json!({
        "resourceType": "Bundle",
        "type": "searchset",
        "total": entries.len(),
        "link": links,
        "entry": entries
    })
}

pub(crate) fn cholesterol_entry(value: f64, timestamp: &str) -> Value {
    json!({
        "resource": {
            "resourceType": "Observation",
            "valueQuantity": {
                "value": value,
                "unit": "mg/dL",
                "system": "http://unitsofmeasure.org",
                "code": "mg/dL"
            },
            "effectiveDateTime": timestamp
        }
    })
}

pub(crate) fn blood_pressure_entry(systolic: f64, diastolic: f64, timestamp: &str) -> Value {
    let component = |code: &str, value: f64| {
        json!({
            "code": { "coding": [ { "system": "http://loinc.org", "code": code } ] },
            "valueQuantity": {
                "value": value,
                "unit": "mm[Hg]",
                "system": "http://unitsofmeasure.org",
                "code": "mm[Hg]"
            }
        })
    };
    json!({
        "resource": {
            "resourceType": "Observation",
            "effectiveDateTime": timestamp,
            "component": [ component("8480-6", systolic), component("8462-4", diastolic) ]
        }
    })
}

pub(crate) fn patient_resource(id: &str, identifier_value: &str) -> Value {
    json!({
        "resourceType": "Patient",
        "id": id,
        "identifier": [ { "system": SYNTHEA, "value": identifier_value } ]
    })
}

pub(crate) fn patient_search(given: &str, family: &str) -> Value {
    bundle(
        vec![json!({
            "resource": {
                "resourceType": "Patient",
                "name": [ { "family": family, "given": [ given ] } ],
                "gender": "female",
                "birthDate": "1970-01-01",
                "address": [ { "city": "Melbourne", "state": "VIC", "country": "AU" } ]
            }
        })],
        None,
    )
}

pub(crate) fn practitioner_resource(npi: &str, given: &str, family: &str) -> Value {
    json!({
        "resourceType": "Practitioner",
        "identifier": [ { "system": NPI, "value": npi } ],
        "name": [ { "family": family, "given": [ given ] } ]
    })
}

pub(crate) fn encounter_entry(patient_id: &str) -> Value {
    json!({
        "resource": {
            "resourceType": "Encounter",
            "subject": { "reference": format!("Patient/{patient_id}") }
        }
    })
}
