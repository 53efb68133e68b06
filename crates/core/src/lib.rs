//! # VitalWatch Core
//!
//! Data synchronization core for the VitalWatch clinician monitor.
//!
//! This crate turns a practitioner resource id into a live, change-tracked roster of patients
//! with their latest cholesterol and blood-pressure readings:
//! - paginated lookup of the N-th most recent observation ([`locator`])
//! - per-concept query building and decoding ([`extractor`])
//! - three-phase practitioner discovery and patient hydration ([`discovery`], [`patient`])
//! - a change-tracking roster with synchronous observers ([`observable`])
//! - a timer-driven refresh loop ([`refresh`])
//!
//! **No rendering concerns**: tables, charts and windows subscribe through
//! [`observable::DataObserver`] and pull snapshots; they live in the binaries.

pub mod config;
pub mod constants;
pub mod discovery;
pub mod error;
pub mod extractor;
pub mod fetcher;
pub mod locator;
pub mod monitoring;
pub mod observable;
pub mod patient;
pub mod practitioner;
pub mod refresh;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::{CoreConfig, OverlapPolicy};
pub use discovery::DiscoveryPipeline;
pub use error::{SyncError, SyncResult};
pub use extractor::{
    BloodPressureExtractor, CholesterolExtractor, ClinicalExtractor, LabelledReading,
    ObservationKind, ObservationSource,
};
pub use fetcher::{HttpFetcher, ResourceFetcher};
pub use observable::{DataObserver, ObservableMap, ReplaceOutcome};
pub use patient::Patient;
pub use practitioner::{Practitioner, Roster};
pub use refresh::{RefreshController, RefreshJob, RefreshState, RosterRefresh};

pub use vitalwatch_types::{BloodPressure, Identifier, Observation, ResourceId};
