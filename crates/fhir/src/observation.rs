//! Observation entries: total cholesterol and blood pressure.
//!
//! Responsibilities:
//! - Name the LOINC concepts VitalWatch queries for
//! - Decode one search-result entry into typed readings
//!
//! Decoding is all-or-nothing. A reading is produced only when every field it needs is present
//! and well typed; otherwise the caller gets an error and records "no data".

use crate::wire::{decode, EntryWire};
use crate::{FhirError, FhirResult};
use serde::Deserialize;
use serde_json::{Number, Value};
use vitalwatch_types::{BloodPressure, Observation};

pub const LOINC_SYSTEM: &str = "http://loinc.org";

/// Total cholesterol in serum or plasma.
pub const TOTAL_CHOLESTEROL_CODE: &str = "2093-3";

/// Blood pressure panel; systolic and diastolic arrive as components.
pub const BLOOD_PRESSURE_PANEL_CODE: &str = "55284-4";

pub const SYSTOLIC_CODE: &str = "8480-6";
pub const DIASTOLIC_CODE: &str = "8462-4";

/// Observation concepts VitalWatch knows how to query.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ObservationConcept {
    TotalCholesterol,
    BloodPressure,
}

impl ObservationConcept {
    pub fn code(self) -> &'static str {
        match self {
            ObservationConcept::TotalCholesterol => TOTAL_CHOLESTEROL_CODE,
            ObservationConcept::BloodPressure => BLOOD_PRESSURE_PANEL_CODE,
        }
    }

    /// The `system|code` token used in the `code=` search parameter (not URL-encoded).
    pub fn token(self) -> String {
        format!("{}|{}", LOINC_SYSTEM, self.code())
    }
}

/// Decode a total cholesterol entry.
///
/// Reads `resource.valueQuantity.{value,unit,system}` and `resource.effectiveDateTime`.
pub fn decode_cholesterol(entry: &Value) -> FhirResult<Observation> {
    let wire: EntryWire<SimpleObservationWire> = decode(entry, "Cholesterol Observation")?;
    let resource = wire.resource;
    Ok(resource
        .value_quantity
        .into_observation(resource.effective_date_time))
}

/// Decode a blood pressure entry.
///
/// The systolic and diastolic components are identified by their LOINC sub-code, never by their
/// position in `component`. Both readings are stamped with the panel's `effectiveDateTime`.
pub fn decode_blood_pressure(entry: &Value) -> FhirResult<BloodPressure> {
    let wire: EntryWire<PanelObservationWire> = decode(entry, "Blood Pressure Observation")?;
    let resource = wire.resource;

    let mut systolic = None;
    let mut diastolic = None;
    for component in resource.component {
        let slot = if component.code.has_code(SYSTOLIC_CODE) {
            &mut systolic
        } else if component.code.has_code(DIASTOLIC_CODE) {
            &mut diastolic
        } else {
            continue;
        };
        if slot.is_none() {
            *slot = Some(component.value_quantity);
        }
    }

    let systolic = systolic
        .flatten()
        .ok_or_else(|| FhirError::MissingField(format!("systolic component ({SYSTOLIC_CODE})")))?;
    let diastolic = diastolic
        .flatten()
        .ok_or_else(|| FhirError::MissingField(format!("diastolic component ({DIASTOLIC_CODE})")))?;

    let timestamp = resource.effective_date_time;
    Ok(BloodPressure::new(
        systolic.into_observation(timestamp.clone()),
        diastolic.into_observation(timestamp),
    )?)
}

// ============================================================================
// Wire types (internal)
// ============================================================================

#[derive(Debug, Deserialize)]
struct SimpleObservationWire {
    #[serde(rename = "valueQuantity")]
    value_quantity: QuantityWire,

    #[serde(rename = "effectiveDateTime")]
    effective_date_time: String,
}

#[derive(Debug, Deserialize)]
struct PanelObservationWire {
    component: Vec<ComponentWire>,

    #[serde(rename = "effectiveDateTime")]
    effective_date_time: String,
}

#[derive(Debug, Deserialize)]
struct ComponentWire {
    code: CodeableConceptWire,

    // other panel components may carry no quantity; only the two we pick must
    #[serde(rename = "valueQuantity", default)]
    value_quantity: Option<QuantityWire>,
}

#[derive(Debug, Deserialize)]
struct CodeableConceptWire {
    #[serde(default)]
    coding: Vec<CodingWire>,
}

impl CodeableConceptWire {
    fn has_code(&self, code: &str) -> bool {
        self.coding.iter().any(|coding| coding.code == code)
    }
}

#[derive(Debug, Deserialize)]
struct CodingWire {
    code: String,
}

#[derive(Debug, Deserialize)]
struct QuantityWire {
    value: Number,
    unit: String,
    system: String,
}

impl QuantityWire {
    fn into_observation(self, timestamp: String) -> Observation {
        Observation::new(self.value.to_string(), self.unit, self.system, timestamp)
    }
}
