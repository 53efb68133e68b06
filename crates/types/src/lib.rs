//! Value types shared by the `fhir` boundary crate and `vitalwatch-core`.
//!
//! Everything here is an immutable value: equality and hashing are structural, so the types can
//! be used directly as map keys and compared to detect changes between refresh cycles.

use serde::{Deserialize, Serialize};

/// Errors that can occur when creating validated value types.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TypesError {
    /// The identifier value was empty.
    #[error("identifier value cannot be empty")]
    EmptyIdentifierValue,

    /// The resource id was empty or contained only whitespace.
    #[error("resource id cannot be empty")]
    EmptyResourceId,

    /// The resource id contained characters that cannot appear in a URL path segment.
    #[error("resource id contains invalid characters: {0}")]
    InvalidResourceId(String),

    /// A blood pressure pair was built from readings taken at different times.
    #[error("systolic and diastolic readings must share a timestamp ({systolic} != {diastolic})")]
    MismatchedTimestamps { systolic: String, diastolic: String },
}

/// A `(system, value)` pair naming a person in the remote system.
///
/// Two identifiers are equal exactly when both components are equal; there is no partial or
/// case-insensitive matching.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "IdentifierParts")]
pub struct Identifier {
    system: String,
    value: String,
}

#[derive(Deserialize)]
struct IdentifierParts {
    system: String,
    value: String,
}

impl TryFrom<IdentifierParts> for Identifier {
    type Error = TypesError;

    fn try_from(parts: IdentifierParts) -> Result<Self, Self::Error> {
        Self::new(parts.system, parts.value)
    }
}

impl Identifier {
    /// Creates a new identifier.
    ///
    /// The `system` may be empty (FHIR allows system-less identifiers) but the `value` may not.
    pub fn new(system: impl Into<String>, value: impl Into<String>) -> Result<Self, TypesError> {
        let value = value.into();
        if value.is_empty() {
            return Err(TypesError::EmptyIdentifierValue);
        }
        Ok(Self {
            system: system.into(),
            value,
        })
    }

    pub fn system(&self) -> &str {
        &self.system
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// The `system|value` token form used in FHIR search parameters (not URL-encoded).
    pub fn token(&self) -> String {
        format!("{}|{}", self.system, self.value)
    }
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}|{}", self.system, self.value)
    }
}

/// The server-local id of a resource (the `<id>` in `Patient/<id>`).
///
/// The input is trimmed; the result is guaranteed non-empty and safe to splice into a URL path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(String);

impl ResourceId {
    pub fn new(input: impl AsRef<str>) -> Result<Self, TypesError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TypesError::EmptyResourceId);
        }
        if trimmed
            .chars()
            .any(|c| matches!(c, '/' | '?' | '#' | '&') || c.is_whitespace())
        {
            return Err(TypesError::InvalidResourceId(trimmed.to_owned()));
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for ResourceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for ResourceId {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// A single measured value.
///
/// `value` keeps the server's decimal text and `timestamp` the server's date-time string; neither
/// is parsed locally. An observation whose `value` is empty is the "no data retrieved" sentinel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Observation {
    pub value: String,
    pub unit: String,
    pub system: String,
    pub timestamp: String,
}

impl Observation {
    pub fn new(
        value: impl Into<String>,
        unit: impl Into<String>,
        system: impl Into<String>,
        timestamp: impl Into<String>,
    ) -> Self {
        Self {
            value: value.into(),
            unit: unit.into(),
            system: system.into(),
            timestamp: timestamp.into(),
        }
    }

    /// The "no data" sentinel.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// The value as a number, if it is one.
    pub fn numeric_value(&self) -> Option<f64> {
        self.value.parse::<f64>().ok()
    }
}

/// Systolic and diastolic readings taken together.
///
/// Both readings always carry the same timestamp; the pair is only ever built or replaced whole.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "BloodPressureParts")]
pub struct BloodPressure {
    systolic: Observation,
    diastolic: Observation,
}

#[derive(Deserialize)]
struct BloodPressureParts {
    systolic: Observation,
    diastolic: Observation,
}

impl TryFrom<BloodPressureParts> for BloodPressure {
    type Error = TypesError;

    fn try_from(parts: BloodPressureParts) -> Result<Self, Self::Error> {
        Self::new(parts.systolic, parts.diastolic)
    }
}

impl BloodPressure {
    /// Builds a pair from two readings that must share a timestamp.
    pub fn new(systolic: Observation, diastolic: Observation) -> Result<Self, TypesError> {
        if systolic.timestamp != diastolic.timestamp {
            return Err(TypesError::MismatchedTimestamps {
                systolic: systolic.timestamp,
                diastolic: diastolic.timestamp,
            });
        }
        Ok(Self {
            systolic,
            diastolic,
        })
    }

    pub fn systolic(&self) -> &Observation {
        &self.systolic
    }

    pub fn diastolic(&self) -> &Observation {
        &self.diastolic
    }

    pub fn timestamp(&self) -> &str {
        &self.systolic.timestamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn identifier_equality_is_structural() {
        let a = Identifier::new("https://github.com/synthetichealth/synthea", "a1").unwrap();
        let b = Identifier::new("https://github.com/synthetichealth/synthea", "a1").unwrap();
        let c = Identifier::new("https://github.com/synthetichealth/synthea", "A1").unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);

        let mut map = HashMap::new();
        map.insert(a, 1);
        assert_eq!(map.get(&b), Some(&1));
        assert_eq!(map.get(&c), None);
    }

    #[test]
    fn identifier_rejects_empty_value() {
        assert_eq!(
            Identifier::new("urn:system", "").unwrap_err(),
            TypesError::EmptyIdentifierValue
        );
        assert!(Identifier::new("", "123").is_ok());
    }

    #[test]
    fn identifier_token_joins_with_pipe() {
        let id = Identifier::new("urn:oid:1.2", "xyz").unwrap();
        assert_eq!(id.token(), "urn:oid:1.2|xyz");
        assert_eq!(id.to_string(), "urn:oid:1.2|xyz");
    }

    #[test]
    fn resource_id_trims_and_validates() {
        assert_eq!(ResourceId::new("  29163 ").unwrap().as_str(), "29163");
        assert_eq!(ResourceId::new("   ").unwrap_err(), TypesError::EmptyResourceId);
        assert!(matches!(
            ResourceId::new("12/../34"),
            Err(TypesError::InvalidResourceId(_))
        ));
        assert!(matches!(
            ResourceId::new("12?x=1"),
            Err(TypesError::InvalidResourceId(_))
        ));
    }

    #[test]
    fn empty_observation_is_the_sentinel() {
        assert!(Observation::empty().is_empty());
        assert!(!Observation::new("190.0", "mg/dL", "http://unitsofmeasure.org", "t").is_empty());
        // a unit without a value is still "no data"
        assert!(Observation::new("", "mg/dL", "", "").is_empty());
    }

    #[test]
    fn observation_numeric_value() {
        let obs = Observation::new("121.5", "mm[Hg]", "", "");
        assert_eq!(obs.numeric_value(), Some(121.5));
        assert_eq!(Observation::empty().numeric_value(), None);
    }

    #[test]
    fn blood_pressure_requires_shared_timestamp() {
        let sys = Observation::new("120", "mm[Hg]", "u", "2020-01-01T00:00:00Z");
        let dia = Observation::new("80", "mm[Hg]", "u", "2020-01-01T00:00:00Z");
        let bp = BloodPressure::new(sys.clone(), dia.clone()).unwrap();
        assert_eq!(bp.systolic(), &sys);
        assert_eq!(bp.diastolic(), &dia);
        assert_eq!(bp.timestamp(), "2020-01-01T00:00:00Z");

        let late = Observation::new("80", "mm[Hg]", "u", "2020-01-02T00:00:00Z");
        assert!(matches!(
            BloodPressure::new(sys, late),
            Err(TypesError::MismatchedTimestamps { .. })
        ));
    }

    #[test]
    fn observation_serialises_all_fields() {
        let obs = Observation::new("5.2", "mmol/L", "http://unitsofmeasure.org", "2019-05-01");
        let json = serde_json::to_value(&obs).unwrap();
        assert_eq!(json["value"], "5.2");
        assert_eq!(json["unit"], "mmol/L");
        assert_eq!(json["timestamp"], "2019-05-01");
    }

    #[test]
    fn deserialising_runs_the_same_validation() {
        let id: Identifier =
            serde_json::from_value(serde_json::json!({ "system": "urn:s", "value": "7" })).unwrap();
        assert_eq!(id.token(), "urn:s|7");

        let err = serde_json::from_value::<Identifier>(serde_json::json!({
            "system": "urn:s",
            "value": ""
        }))
        .unwrap_err();
        assert!(err.to_string().contains("identifier value cannot be empty"));

        let reading = |t: &str| serde_json::json!({
            "value": "120", "unit": "mm[Hg]", "system": "u", "timestamp": t
        });
        let err = serde_json::from_value::<BloodPressure>(serde_json::json!({
            "systolic": reading("2020-01-01"),
            "diastolic": reading("2020-01-02")
        }))
        .unwrap_err();
        assert!(err.to_string().contains("must share a timestamp"));
    }
}
