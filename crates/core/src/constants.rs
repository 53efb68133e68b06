//! Constants used throughout the VitalWatch core crate.

/// Request timeout used when `FHIR_REQUEST_TIMEOUT_SECS` is not set.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Upper bound on `next` links followed in one pagination walk.
pub const DEFAULT_MAX_PAGE_HOPS: usize = 1000;

/// Page size requested when only the most recent observation is wanted.
pub const LATEST_PAGE_SIZE: usize = 1;

/// `Accept` header sent with every request.
pub const FHIR_JSON_MEDIA_TYPE: &str = "application/fhir+json";

pub const CHOLESTEROL_LABEL: &str = "Total Cholesterol";
pub const SYSTOLIC_LABEL: &str = "Systolic Blood Pressure";
pub const DIASTOLIC_LABEL: &str = "Diastolic Blood Pressure";
