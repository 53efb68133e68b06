//! Practitioner discovery pipeline.
//!
//! Turns a practitioner resource id into a fully hydrated roster in three strictly ordered
//! phases:
//! 1. demographics: `Practitioner/<id>` gives the canonical identifier and name,
//! 2. encounter sweep: every page of encounters with that practitioner, reduced to a set of
//!    distinct patient resource ids,
//! 3. hydration: each resource id is resolved to its canonical identifier (deduplicated again),
//!    then each identifier is hydrated into a [`Patient`].
//!
//! A run succeeds only if every phase and every patient hydration succeeds. On failure nothing is
//! published and the previous roster stays in place.

use crate::config::CoreConfig;
use crate::extractor::ObservationSource;
use crate::fetcher::ResourceFetcher;
use crate::locator::walk_pages;
use crate::observable::ReplaceOutcome;
use crate::patient::{hydrate, Patient};
use crate::practitioner::Practitioner;
use crate::{SyncError, SyncResult};
use fhir::PractitionerData;
use std::collections::BTreeSet;
use std::sync::Arc;
use vitalwatch_types::{Identifier, ResourceId};

/// A discovered roster, ready to publish in one bulk replace.
pub type RosterBatch = Vec<(Identifier, Patient)>;

pub struct DiscoveryPipeline {
    fetcher: Arc<dyn ResourceFetcher>,
    config: CoreConfig,
}

impl DiscoveryPipeline {
    pub fn new(fetcher: Arc<dyn ResourceFetcher>, config: CoreConfig) -> Self {
        Self { fetcher, config }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn fetcher(&self) -> &dyn ResourceFetcher {
        self.fetcher.as_ref()
    }

    /// A source for reading observations through this pipeline's fetcher and endpoints.
    pub fn observation_source(&self) -> ObservationSource<'_> {
        ObservationSource::new(
            self.fetcher.as_ref(),
            self.config.endpoints(),
            self.config.max_page_hops(),
        )
    }

    /// Run all three phases and return a practitioner whose roster holds the result.
    ///
    /// # Errors
    ///
    /// Fails if any phase fails; no practitioner is created in that case.
    pub async fn login(&self, resource_id: &ResourceId) -> SyncResult<Arc<Practitioner>> {
        let data = self.fetch_practitioner(resource_id).await?;
        let batch = self.discover_roster(&data.identifier).await?;

        let practitioner = Arc::new(Practitioner::new(resource_id.clone(), data));
        practitioner.roster().replace_all(batch);
        tracing::info!(
            "logged in {} ({}) with {} patients",
            practitioner.full_name(),
            practitioner.identifier(),
            practitioner.roster().len()
        );
        Ok(practitioner)
    }

    /// Re-run phases 2 and 3 for a logged-in practitioner and publish the result.
    ///
    /// With `generation`, the batch is dropped if a newer run has already published.
    pub async fn refresh(
        &self,
        practitioner: &Practitioner,
        generation: Option<u64>,
    ) -> SyncResult<ReplaceOutcome> {
        let batch = self.discover_roster(practitioner.identifier()).await?;
        let patients = batch.len();

        let outcome = match generation {
            Some(generation) => practitioner
                .roster()
                .replace_all_versioned(generation, batch),
            None => practitioner.roster().replace_all(batch),
        };

        match outcome {
            ReplaceOutcome::Stale => tracing::info!(
                "discarded stale roster for {} (generation {generation:?})",
                practitioner.identifier()
            ),
            _ => tracing::info!(
                "refreshed roster for {}: {patients} patients ({outcome:?})",
                practitioner.identifier()
            ),
        }
        Ok(outcome)
    }

    /// Phase 1.
    pub async fn fetch_practitioner(&self, resource_id: &ResourceId) -> SyncResult<PractitionerData> {
        let url = self.config.endpoints().practitioner(resource_id);
        let document = self.fetcher.fetch(&url).await?;
        Ok(fhir::decode_practitioner(&document)?)
    }

    /// Phases 2 and 3.
    pub async fn discover_roster(&self, practitioner: &Identifier) -> SyncResult<RosterBatch> {
        let resource_ids = self.sweep_encounters(practitioner).await?;
        tracing::debug!(
            "{} distinct patients in encounters of {practitioner}",
            resource_ids.len()
        );
        self.hydrate_all(&resource_ids).await
    }

    /// Phase 2: distinct patient resource ids across every encounter page.
    pub async fn sweep_encounters(&self, practitioner: &Identifier) -> SyncResult<BTreeSet<ResourceId>> {
        let url = self.config.endpoints().encounters_for_practitioner(practitioner);
        let mut resource_ids = BTreeSet::new();

        walk_pages(
            self.fetcher.as_ref(),
            &url,
            self.config.max_page_hops(),
            |page| {
                for entry in page.entries() {
                    resource_ids.insert(fhir::subject_resource_id(entry)?);
                }
                Ok(())
            },
        )
        .await?;

        Ok(resource_ids)
    }

    /// Phase 3: resolve identifiers, then hydrate each distinct identifier.
    pub async fn hydrate_all(&self, resource_ids: &BTreeSet<ResourceId>) -> SyncResult<RosterBatch> {
        let mut identifiers = BTreeSet::new();
        for resource_id in resource_ids {
            let identifier = self
                .resolve_identifier(resource_id)
                .await
                .map_err(|source| SyncError::Hydration {
                    resource: format!("Patient/{resource_id}"),
                    source: Box::new(source),
                })?;
            identifiers.insert(identifier);
        }

        let observations = self.observation_source();
        let mut batch = Vec::with_capacity(identifiers.len());
        for identifier in identifiers {
            let patient = hydrate(&observations, identifier.clone()).await.map_err(|source| {
                SyncError::Hydration {
                    resource: format!("Patient?identifier={identifier}"),
                    source: Box::new(source),
                }
            })?;
            batch.push((identifier, patient));
        }
        Ok(batch)
    }

    async fn resolve_identifier(&self, resource_id: &ResourceId) -> SyncResult<Identifier> {
        let url = self.config.endpoints().patient(resource_id);
        let document = self.fetcher.fetch(&url).await?;
        Ok(fhir::decode_patient_identifier(&document)?)
    }
}
