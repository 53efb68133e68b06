//! Wire fragments shared by several resource types.

use crate::{FhirError, FhirResult};
use serde::Deserialize;
use serde_json::Value;
use vitalwatch_types::Identifier;

/// Decode `value` into `T`, reporting the path of the first failing field.
///
/// `what` names the document in the error message (e.g. `"Practitioner"`).
pub(crate) fn decode<'de, T>(value: &'de Value, what: &str) -> FhirResult<T>
where
    T: Deserialize<'de>,
{
    serde_path_to_error::deserialize::<_, T>(value).map_err(|err| {
        let path = err.path().to_string();
        let source = err.into_inner();
        let path = if path.is_empty() || path == "." {
            "<root>"
        } else {
            path.as_str()
        };
        FhirError::Translation(format!("{what} schema mismatch at {path}: {source}"))
    })
}

/// `{ "resource": ... }`: the part of a bundle entry we read.
#[derive(Debug, Deserialize)]
pub(crate) struct EntryWire<R> {
    pub resource: R,
}

#[derive(Debug, Deserialize)]
pub(crate) struct IdentifierWire {
    #[serde(default)]
    pub system: Option<String>,
    pub value: String,
}

impl IdentifierWire {
    pub fn into_identifier(self) -> FhirResult<Identifier> {
        Ok(Identifier::new(self.system.unwrap_or_default(), self.value)?)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct HumanNameWire {
    pub family: String,
    pub given: Vec<String>,
}

/// First name entry as `(given, family)`; the first given name only.
pub(crate) fn primary_name(names: Vec<HumanNameWire>, what: &str) -> FhirResult<(String, String)> {
    let name = names
        .into_iter()
        .next()
        .ok_or_else(|| FhirError::MissingField(format!("{what}.name[0]")))?;
    let given = name
        .given
        .into_iter()
        .next()
        .ok_or_else(|| FhirError::MissingField(format!("{what}.name[0].given[0]")))?;
    Ok((given, name.family))
}

/// First identifier entry.
pub(crate) fn primary_identifier(
    identifiers: Vec<IdentifierWire>,
    what: &str,
) -> FhirResult<Identifier> {
    identifiers
        .into_iter()
        .next()
        .ok_or_else(|| FhirError::MissingField(format!("{what}.identifier[0]")))?
        .into_identifier()
}
