//! Encounter entries.
//!
//! The encounter sweep only needs to know which patient each encounter was with. That comes from
//! `resource.subject.reference`, which HAPI renders as `Patient/<id>`; absolute references
//! (`https://server/fhir/Patient/<id>`) and version suffixes (`Patient/<id>/_history/2`) are
//! accepted too.

use crate::wire::{decode, EntryWire};
use crate::{FhirError, FhirResult};
use serde::Deserialize;
use serde_json::Value;
use vitalwatch_types::ResourceId;

/// Resource id of the patient an encounter entry refers to.
///
/// # Errors
///
/// Returns [`FhirError`] if the entry has no subject reference or the reference does not point
/// at a Patient.
pub fn subject_resource_id(entry: &Value) -> FhirResult<ResourceId> {
    let wire: EntryWire<EncounterWire> = decode(entry, "Encounter")?;
    let reference = wire.resource.subject.reference;
    patient_id_from_reference(&reference)
}

fn patient_id_from_reference(reference: &str) -> FhirResult<ResourceId> {
    let mut segments: Vec<&str> = reference.trim_end_matches('/').split('/').collect();

    if let Some(pos) = segments.iter().rposition(|s| *s == "_history") {
        segments.truncate(pos);
    }

    match segments.as_slice() {
        [.., "Patient", id] => Ok(ResourceId::new(id)?),
        _ => Err(FhirError::InvalidInput(format!(
            "Encounter subject is not a Patient reference: '{reference}'"
        ))),
    }
}

#[derive(Debug, Deserialize)]
struct EncounterWire {
    subject: ReferenceWire,
}

#[derive(Debug, Deserialize)]
struct ReferenceWire {
    reference: String,
}
