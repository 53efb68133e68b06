//! Patient resources.
//!
//! Two documents are read:
//! - `Patient/<id>`: a bare Patient resource, used only to learn the patient's canonical
//!   identifier from the server-local resource id;
//! - `Patient/?identifier=...`: a search page whose first entry carries the demographics.
//!
//! Name and identifier are required. Gender, birth date and address are optional in FHIR and
//! are surfaced as `Option`s rather than failing the decode.

use crate::bundle::Page;
use crate::wire::{
    decode, primary_identifier, primary_name, EntryWire, HumanNameWire, IdentifierWire,
};
use crate::{FhirError, FhirResult};
use serde::Deserialize;
use serde_json::Value;
use vitalwatch_types::Identifier;

/// Demographics read from a patient search result.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PatientDemographics {
    pub given_name: String,
    pub family_name: String,
    pub gender: Option<String>,
    pub birth_date: Option<String>,
    pub country: Option<String>,
    pub state: Option<String>,
    pub city: Option<String>,
}

/// Read the canonical identifier (`identifier[0]`) of a bare Patient resource.
pub fn decode_patient_identifier(resource: &Value) -> FhirResult<Identifier> {
    let wire: PatientIdentityWire = decode(resource, "Patient")?;
    primary_identifier(wire.identifier, "Patient")
}

/// Read demographics from the first entry of a patient search page.
///
/// # Errors
///
/// Returns [`FhirError`] if the page has no entries or the first patient lacks a name.
pub fn decode_patient_search(page: &Page) -> FhirResult<PatientDemographics> {
    let entry = page
        .entry(0)
        .ok_or_else(|| FhirError::MissingField("Patient search entry[0]".into()))?;
    let wire: EntryWire<PatientWire> = decode(entry, "Patient")?;
    let resource = wire.resource;

    let (given_name, family_name) = primary_name(resource.name, "Patient")?;
    let address = resource.address.into_iter().next();

    Ok(PatientDemographics {
        given_name,
        family_name,
        gender: resource.gender,
        birth_date: resource.birth_date,
        country: address.as_ref().and_then(|a| a.country.clone()),
        state: address.as_ref().and_then(|a| a.state.clone()),
        city: address.and_then(|a| a.city),
    })
}

// ============================================================================
// Wire types (internal)
// ============================================================================

#[derive(Debug, Deserialize)]
struct PatientIdentityWire {
    identifier: Vec<IdentifierWire>,
}

#[derive(Debug, Deserialize)]
struct PatientWire {
    name: Vec<HumanNameWire>,

    #[serde(default)]
    gender: Option<String>,

    #[serde(rename = "birthDate", default)]
    birth_date: Option<String>,

    #[serde(default)]
    address: Vec<AddressWire>,
}

#[derive(Debug, Deserialize)]
struct AddressWire {
    #[serde(default)]
    city: Option<String>,

    #[serde(default)]
    state: Option<String>,

    #[serde(default)]
    country: Option<String>,
}
