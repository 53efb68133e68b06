//! The logged-in practitioner and their roster.

use crate::observable::{DataObserver, ObservableMap};
use crate::patient::Patient;
use fhir::PractitionerData;
use std::sync::Arc;
use vitalwatch_types::{Identifier, ResourceId};

/// Roster of patients keyed by their canonical identifier.
pub type Roster = ObservableMap<Identifier, Patient>;

/// A practitioner session. Created once at login and shared for the life of the session.
pub struct Practitioner {
    resource_id: ResourceId,
    identifier: Identifier,
    given_name: String,
    family_name: String,
    roster: Roster,
}

impl Practitioner {
    pub fn new(resource_id: ResourceId, data: PractitionerData) -> Self {
        Self {
            resource_id,
            identifier: data.identifier,
            given_name: data.given_name,
            family_name: data.family_name,
            roster: Roster::new(),
        }
    }

    pub fn resource_id(&self) -> &ResourceId {
        &self.resource_id
    }

    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    pub fn given_name(&self) -> &str {
        &self.given_name
    }

    pub fn family_name(&self) -> &str {
        &self.family_name
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.given_name, self.family_name)
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Register a renderer for roster changes.
    pub fn subscribe(&self, observer: Arc<dyn DataObserver>) {
        self.roster.subscribe(observer);
    }
}

impl std::fmt::Debug for Practitioner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Practitioner")
            .field("resource_id", &self.resource_id)
            .field("identifier", &self.identifier)
            .field("name", &self.full_name())
            .field("patients", &self.roster.len())
            .finish()
    }
}
