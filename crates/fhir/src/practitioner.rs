//! Practitioner resources.
//!
//! Only the canonical identifier and the primary name are read; everything else on the resource
//! is ignored.

use crate::wire::{decode, primary_identifier, primary_name, HumanNameWire, IdentifierWire};
use crate::FhirResult;
use serde::Deserialize;
use serde_json::Value;
use vitalwatch_types::Identifier;

/// The practitioner fields VitalWatch needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PractitionerData {
    pub identifier: Identifier,
    pub given_name: String,
    pub family_name: String,
}

/// Decode a `Practitioner/<id>` document.
///
/// Reads `identifier[0]`, `name[0].family` and `name[0].given[0]`.
///
/// # Errors
///
/// Returns [`crate::FhirError`] if any of those fields is missing or mistyped.
pub fn decode_practitioner(resource: &Value) -> FhirResult<PractitionerData> {
    let wire: PractitionerWire = decode(resource, "Practitioner")?;
    let identifier = primary_identifier(wire.identifier, "Practitioner")?;
    let (given_name, family_name) = primary_name(wire.name, "Practitioner")?;

    Ok(PractitionerData {
        identifier,
        given_name,
        family_name,
    })
}

#[derive(Debug, Deserialize)]
struct PractitionerWire {
    identifier: Vec<IdentifierWire>,
    name: Vec<HumanNameWire>,
}
