//! Patient aggregate and hydration.
//!
//! A [`Patient`] is demographics plus the latest cholesterol and blood-pressure readings. It is
//! rebuilt from scratch on every refresh cycle and replaced whole in the roster; nothing patches
//! an existing patient.
//!
//! Hydration policy:
//! - demographics are required: a failed patient search fails the hydration,
//! - each reading is best effort: a failed fetch or decode leaves that reading absent and is
//!   logged at `warn`.

use crate::constants::{CHOLESTEROL_LABEL, DIASTOLIC_LABEL, SYSTOLIC_LABEL};
use crate::extractor::{
    BloodPressureExtractor, CholesterolExtractor, ClinicalExtractor, LabelledReading,
    ObservationKind, ObservationSource,
};
use crate::SyncResult;
use fhir::PatientDemographics;
use vitalwatch_types::{BloodPressure, Identifier, Observation};

/// A hydrated patient.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Patient {
    identifier: Identifier,
    demographics: PatientDemographics,
    cholesterol: Option<Observation>,
    blood_pressure: Option<BloodPressure>,
}

impl Patient {
    /// A patient with demographics only; readings start absent.
    pub fn new(identifier: Identifier, demographics: PatientDemographics) -> Self {
        Self {
            identifier,
            demographics,
            cholesterol: None,
            blood_pressure: None,
        }
    }

    pub fn with_cholesterol(mut self, cholesterol: Option<Observation>) -> Self {
        self.cholesterol = cholesterol;
        self
    }

    pub fn with_blood_pressure(mut self, blood_pressure: Option<BloodPressure>) -> Self {
        self.blood_pressure = blood_pressure;
        self
    }

    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    pub fn given_name(&self) -> &str {
        &self.demographics.given_name
    }

    pub fn family_name(&self) -> &str {
        &self.demographics.family_name
    }

    /// `"Given Family"`.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.given_name(), self.family_name())
    }

    pub fn gender(&self) -> Option<&str> {
        self.demographics.gender.as_deref()
    }

    pub fn birth_date(&self) -> Option<&str> {
        self.demographics.birth_date.as_deref()
    }

    pub fn country(&self) -> Option<&str> {
        self.demographics.country.as_deref()
    }

    pub fn state(&self) -> Option<&str> {
        self.demographics.state.as_deref()
    }

    pub fn city(&self) -> Option<&str> {
        self.demographics.city.as_deref()
    }

    pub fn cholesterol(&self) -> Option<&Observation> {
        self.cholesterol.as_ref()
    }

    pub fn blood_pressure(&self) -> Option<&BloodPressure> {
        self.blood_pressure.as_ref()
    }

    /// Latest readings of `kind`, labelled, with the empty sentinel standing in for absent ones.
    pub fn readings(&self, kind: ObservationKind) -> Vec<LabelledReading> {
        match kind {
            ObservationKind::Cholesterol => vec![LabelledReading::new(
                CHOLESTEROL_LABEL,
                self.cholesterol.clone().unwrap_or_else(Observation::empty),
            )],
            ObservationKind::BloodPressure => blood_pressure_readings(self.blood_pressure.as_ref()),
        }
    }
}

fn blood_pressure_readings(bp: Option<&BloodPressure>) -> Vec<LabelledReading> {
    let (systolic, diastolic) = match bp {
        Some(bp) => (bp.systolic().clone(), bp.diastolic().clone()),
        None => (Observation::empty(), Observation::empty()),
    };
    vec![
        LabelledReading::new(SYSTOLIC_LABEL, systolic),
        LabelledReading::new(DIASTOLIC_LABEL, diastolic),
    ]
}

/// Fetch demographics and the latest readings for `identifier`.
///
/// # Errors
///
/// Returns an error only if the demographics search fails or cannot be decoded.
pub async fn hydrate(source: &ObservationSource<'_>, identifier: Identifier) -> SyncResult<Patient> {
    let url = source.endpoints().patient_by_identifier(&identifier);
    let page = source.fetcher().fetch_page(&url).await?;
    let demographics = fhir::decode_patient_search(&page)?;

    let cholesterol = best_effort(source, &CholesterolExtractor, &identifier).await;
    let blood_pressure = best_effort(source, &BloodPressureExtractor, &identifier).await;

    Ok(Patient::new(identifier, demographics)
        .with_cholesterol(cholesterol)
        .with_blood_pressure(blood_pressure))
}

async fn best_effort<E: ClinicalExtractor>(
    source: &ObservationSource<'_>,
    extractor: &E,
    identifier: &Identifier,
) -> Option<E::Reading> {
    match source.latest(extractor, identifier).await {
        Ok(reading) => Some(reading),
        Err(err) => {
            tracing::warn!(
                "no {:?} reading for {identifier}: {err}",
                extractor.concept()
            );
            None
        }
    }
}

/// The `count` most recent readings of `kind`, newest first, one row per reading.
///
/// Slots that cannot be fetched or decoded hold empty sentinels, so the result always has
/// `count` rows.
pub async fn history(
    source: &ObservationSource<'_>,
    identifier: &Identifier,
    kind: ObservationKind,
    count: usize,
) -> Vec<Vec<LabelledReading>> {
    match kind {
        ObservationKind::Cholesterol => {
            collect_history(source, &CholesterolExtractor, identifier, count, |obs| {
                vec![LabelledReading::new(
                    CHOLESTEROL_LABEL,
                    obs.cloned().unwrap_or_else(Observation::empty),
                )]
            })
            .await
        }
        ObservationKind::BloodPressure => {
            collect_history(source, &BloodPressureExtractor, identifier, count, |bp| {
                blood_pressure_readings(bp)
            })
            .await
        }
    }
}

async fn collect_history<E, R>(
    source: &ObservationSource<'_>,
    extractor: &E,
    identifier: &Identifier,
    count: usize,
    row: R,
) -> Vec<Vec<LabelledReading>>
where
    E: ClinicalExtractor,
    R: Fn(Option<&E::Reading>) -> Vec<LabelledReading>,
{
    match source.recent(extractor, identifier, count).await {
        Ok(readings) => readings
            .into_iter()
            .enumerate()
            .map(|(index, reading)| match reading {
                Ok(reading) => row(Some(&reading)),
                Err(err) => {
                    tracing::debug!("history slot {index} for {identifier} is empty: {err}");
                    row(None)
                }
            })
            .collect(),
        Err(err) => {
            tracing::warn!("history search for {identifier} failed: {err}");
            (0..count).map(|_| row(None)).collect()
        }
    }
}
