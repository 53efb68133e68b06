//! FHIR wire/boundary support for VitalWatch.
//!
//! This crate provides **wire models** and **format/translation helpers** for the JSON documents
//! returned by a FHIR R4 search API:
//! - search result pages (`Bundle`) and their `next` links
//! - Practitioner, Patient and Encounter resources, reduced to the fields VitalWatch reads
//! - total cholesterol and blood pressure Observation entries
//! - the query URLs used to request all of the above
//!
//! This crate focuses on:
//! - strict decoding: a missing or mistyped field fails the whole decode, never a partial value
//! - bit-exact query construction for server compatibility
//!
//! It performs no I/O. Fetching pages and walking pagination live in `vitalwatch-core`.

pub mod bundle;
pub mod encounter;
pub mod observation;
pub mod patient;
pub mod practitioner;
pub mod query;
mod wire;

// Re-export facades
pub use bundle::Page;
pub use encounter::subject_resource_id;
pub use observation::{decode_blood_pressure, decode_cholesterol, ObservationConcept};
pub use patient::{decode_patient_identifier, decode_patient_search, PatientDemographics};
pub use practitioner::{decode_practitioner, PractitionerData};
pub use query::Endpoints;

// Re-export the shared value types
pub use vitalwatch_types::{BloodPressure, Identifier, Observation, ResourceId};

/// Errors returned by the `fhir` boundary crate.
#[derive(Debug, thiserror::Error)]
pub enum FhirError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("translation error: {0}")]
    Translation(String),

    #[error("missing field: {0}")]
    MissingField(String),

    #[error("invalid value: {0}")]
    InvalidValue(#[from] vitalwatch_types::TypesError),
}

/// Type alias for Results that can fail with a [`FhirError`].
pub type FhirResult<T> = Result<T, FhirError>;
