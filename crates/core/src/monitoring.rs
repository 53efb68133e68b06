//! Read-side helpers for renderers: table rows, cholesterol average and high blood-pressure
//! selection. All of them work on a roster snapshot and never touch the network, except
//! [`systolic_trend`], which fetches reading history for the flagged patients.

use crate::constants::SYSTOLIC_LABEL;
use crate::extractor::{ObservationKind, ObservationSource};
use crate::patient::{history, Patient};
use vitalwatch_types::{Identifier, Observation};

/// Clinician thresholds for blood-pressure alerts. A reading must be strictly above a threshold
/// to trip it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BloodPressureAlert {
    pub systolic: f64,
    pub diastolic: Option<f64>,
}

impl BloodPressureAlert {
    pub fn new(systolic: f64, diastolic: Option<f64>) -> Self {
        Self {
            systolic,
            diastolic,
        }
    }

    /// Whether the patient's latest blood pressure trips either threshold.
    pub fn is_tripped_by(&self, patient: &Patient) -> bool {
        let Some(bp) = patient.blood_pressure() else {
            return false;
        };
        exceeds(bp.systolic(), self.systolic)
            || self
                .diastolic
                .is_some_and(|threshold| exceeds(bp.diastolic(), threshold))
    }
}

/// `true` if `observation` holds a number strictly greater than `threshold`.
///
/// Empty and non-numeric observations never exceed anything.
pub fn exceeds(observation: &Observation, threshold: f64) -> bool {
    observation
        .numeric_value()
        .is_some_and(|value| value > threshold)
}

/// Patients whose latest blood pressure trips `alert`, ordered by name.
pub fn high_blood_pressure<'a, I>(patients: I, alert: &BloodPressureAlert) -> Vec<&'a Patient>
where
    I: IntoIterator<Item = &'a Patient>,
{
    let mut selected: Vec<&Patient> = patients
        .into_iter()
        .filter(|patient| alert.is_tripped_by(patient))
        .collect();
    selected.sort_by(|a, b| name_order(a, b));
    selected
}

/// Recent systolic readings of one flagged patient, oldest first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SystolicTrend {
    pub identifier: Identifier,
    pub name: String,
    pub readings: Vec<Observation>,
}

/// For each patient tripping `alert`, their last `count` systolic readings, oldest first.
///
/// Slots with no reading are dropped, so a trend may hold fewer than `count` readings. Patients
/// come back in name order.
pub async fn systolic_trend<'a, I>(
    source: &ObservationSource<'_>,
    patients: I,
    alert: &BloodPressureAlert,
    count: usize,
) -> Vec<SystolicTrend>
where
    I: IntoIterator<Item = &'a Patient>,
{
    let flagged = high_blood_pressure(patients, alert);
    let mut trends = Vec::with_capacity(flagged.len());

    for patient in flagged {
        let rows = history(
            source,
            patient.identifier(),
            ObservationKind::BloodPressure,
            count,
        )
        .await;
        let readings = rows
            .into_iter()
            .rev()
            .filter_map(|row| {
                row.into_iter()
                    .find(|reading| reading.label == SYSTOLIC_LABEL)
                    .map(|reading| reading.observation)
            })
            .filter(|observation| !observation.is_empty())
            .collect();

        trends.push(SystolicTrend {
            identifier: patient.identifier().clone(),
            name: patient.full_name(),
            readings,
        });
    }
    trends
}

/// Mean of the numeric latest cholesterol values; `None` when no patient has one.
pub fn cholesterol_average<'a, I>(patients: I) -> Option<f64>
where
    I: IntoIterator<Item = &'a Patient>,
{
    let (sum, count) = patients
        .into_iter()
        .filter_map(|patient| patient.cholesterol().and_then(Observation::numeric_value))
        .fold((0.0, 0usize), |(sum, count), value| (sum + value, count + 1));
    (count > 0).then(|| sum / count as f64)
}

/// One flattened table row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RosterRow {
    pub identifier: Identifier,
    pub name: String,
    pub cholesterol: Observation,
    pub systolic: Observation,
    pub diastolic: Observation,
}

impl RosterRow {
    pub fn from_patient(patient: &Patient) -> Self {
        let cholesterol = patient
            .readings(ObservationKind::Cholesterol)
            .into_iter()
            .next()
            .map(|r| r.observation)
            .unwrap_or_default();
        let mut bp = patient
            .readings(ObservationKind::BloodPressure)
            .into_iter()
            .map(|r| r.observation);
        let systolic = bp.next().unwrap_or_default();
        let diastolic = bp.next().unwrap_or_default();

        Self {
            identifier: patient.identifier().clone(),
            name: patient.full_name(),
            cholesterol,
            systolic,
            diastolic,
        }
    }

    pub fn cholesterol_above(&self, average: Option<f64>) -> bool {
        average.is_some_and(|average| exceeds(&self.cholesterol, average))
    }
}

/// Rows for every patient, sorted by family name, then given name, then identifier.
pub fn roster_rows<'a, I>(patients: I) -> Vec<RosterRow>
where
    I: IntoIterator<Item = &'a Patient>,
{
    let mut patients: Vec<&Patient> = patients.into_iter().collect();
    patients.sort_by(|a, b| name_order(a, b));
    patients.into_iter().map(RosterRow::from_patient).collect()
}

fn name_order(a: &Patient, b: &Patient) -> std::cmp::Ordering {
    (a.family_name(), a.given_name(), a.identifier())
        .cmp(&(b.family_name(), b.given_name(), b.identifier()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::{BloodPressureExtractor, ClinicalExtractor};
    use crate::test_support::{blood_pressure_entry, bundle, MemoryFetcher, SYNTHEA};
    use fhir::Endpoints;
    use fhir::PatientDemographics;
    use vitalwatch_types::BloodPressure;

    fn patient(value: &str, given: &str, family: &str) -> Patient {
        Patient::new(
            Identifier::new(SYNTHEA, value).expect("identifier"),
            PatientDemographics {
                given_name: given.into(),
                family_name: family.into(),
                gender: None,
                birth_date: None,
                country: None,
                state: None,
                city: None,
            },
        )
    }

    fn chol(value: &str) -> Option<Observation> {
        Some(Observation::new(value, "mg/dL", "http://unitsofmeasure.org", "2020-01-01"))
    }

    fn bp(systolic: &str, diastolic: &str) -> Option<BloodPressure> {
        let t = "2020-01-01";
        Some(
            BloodPressure::new(
                Observation::new(systolic, "mm[Hg]", "u", t),
                Observation::new(diastolic, "mm[Hg]", "u", t),
            )
            .expect("bp"),
        )
    }

    #[test]
    fn average_ignores_patients_without_cholesterol() {
        let patients = [
            patient("1", "A", "X").with_cholesterol(chol("200.0")),
            patient("2", "B", "Y").with_cholesterol(chol("100.0")),
            patient("3", "C", "Z"),
        ];
        assert_eq!(cholesterol_average(&patients), Some(150.0));
        assert_eq!(cholesterol_average(&patients[2..]), None);
    }

    #[test]
    fn high_bp_selects_strictly_above_threshold() {
        let patients = [
            patient("1", "Ann", "Lee").with_blood_pressure(bp("150", "70")),
            patient("2", "Bo", "Kim").with_blood_pressure(bp("140", "95")),
            patient("3", "Cy", "Ng").with_blood_pressure(bp("139", "70")),
            patient("4", "Di", "Ode"),
        ];

        let systolic_only = BloodPressureAlert::new(140.0, None);
        let names: Vec<String> = high_blood_pressure(&patients, &systolic_only)
            .into_iter()
            .map(Patient::full_name)
            .collect();
        assert_eq!(names, vec!["Ann Lee"]);

        let both = BloodPressureAlert::new(140.0, Some(90.0));
        let names: Vec<String> = high_blood_pressure(&patients, &both)
            .into_iter()
            .map(Patient::full_name)
            .collect();
        assert_eq!(names, vec!["Bo Kim", "Ann Lee"]);
    }

    #[test]
    fn non_numeric_values_never_exceed() {
        assert!(!exceeds(&Observation::empty(), -1.0));
        assert!(!exceeds(
            &Observation::new("n/a", "mg/dL", "", ""),
            0.0
        ));
    }

    #[test]
    fn rows_are_name_sorted_with_sentinels() {
        let patients = [
            patient("1", "Zed", "Brown").with_cholesterol(chol("210.0")),
            patient("2", "Amy", "Brown").with_blood_pressure(bp("120", "80")),
            patient("3", "Bob", "Adams"),
        ];

        let rows = roster_rows(&patients);
        let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Bob Adams", "Amy Brown", "Zed Brown"]);

        assert!(rows[0].cholesterol.is_empty());
        assert!(rows[0].systolic.is_empty());
        assert_eq!(rows[1].systolic.value, "120");
        assert_eq!(rows[2].cholesterol.value, "210.0");

        let average = cholesterol_average(&patients);
        assert!(!rows[2].cholesterol_above(average));
        assert!(!rows[0].cholesterol_above(average));
    }

    #[tokio::test]
    async fn systolic_trend_lists_flagged_patients_oldest_first() {
        let endpoints = Endpoints::default();
        let fetcher = MemoryFetcher::new();
        let high = patient("1", "Ann", "Lee").with_blood_pressure(bp("160", "80"));
        let normal = patient("2", "Bo", "Kim").with_blood_pressure(bp("120", "80"));
        fetcher.insert(
            BloodPressureExtractor.build_query(&endpoints, high.identifier(), 3),
            bundle(
                vec![
                    blood_pressure_entry(160.0, 80.0, "2021-03-01"),
                    blood_pressure_entry(150.0, 85.0, "2021-02-01"),
                ],
                None,
            ),
        );
        let source = ObservationSource::new(&fetcher, &endpoints, 10);

        let alert = BloodPressureAlert::new(140.0, None);
        let trends = systolic_trend(&source, [&high, &normal], &alert, 3).await;

        assert_eq!(trends.len(), 1);
        assert_eq!(trends[0].name, "Ann Lee");
        assert_eq!(&trends[0].identifier, high.identifier());
        let points: Vec<(&str, &str)> = trends[0]
            .readings
            .iter()
            .map(|o| (o.timestamp.as_str(), o.value.as_str()))
            .collect();
        assert_eq!(
            points,
            vec![("2021-02-01", "150.0"), ("2021-03-01", "160.0")]
        );
        assert_eq!(
            fetcher.requests(),
            vec![BloodPressureExtractor.build_query(&endpoints, high.identifier(), 3)]
        );
    }

    #[tokio::test]
    async fn systolic_trend_is_empty_when_history_fails() {
        let endpoints = Endpoints::default();
        let fetcher = MemoryFetcher::new();
        let high = patient("1", "Ann", "Lee").with_blood_pressure(bp("160", "80"));
        let source = ObservationSource::new(&fetcher, &endpoints, 10);

        let trends =
            systolic_trend(&source, [&high], &BloodPressureAlert::new(140.0, None), 5).await;
        assert_eq!(trends.len(), 1);
        assert!(trends[0].readings.is_empty());
    }
}
