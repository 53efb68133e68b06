//! Search result pages.
//!
//! A FHIR search returns a `Bundle` of `searchset` type. VitalWatch reads three things from it:
//! the entries on this page, the optional `total`, and the link whose `relation` is `next`.
//!
//! The `next` link is found by its relation label, never by its position in the `link` array;
//! servers are free to order links however they like.

use crate::wire::decode;
use crate::{FhirError, FhirResult};
use serde::Deserialize;
use serde_json::Value;

/// One page of search results.
#[derive(Clone, Debug, PartialEq)]
pub struct Page {
    total: Option<u64>,
    entries: Vec<Value>,
    next: Option<String>,
}

impl Page {
    /// Build a page directly (used by tests and by callers that already hold entries).
    pub fn new(entries: Vec<Value>, next: Option<String>) -> Self {
        Self {
            total: Some(entries.len() as u64),
            entries,
            next,
        }
    }

    /// Decode a search result page from a parsed JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`FhirError`] if:
    /// - `resourceType` is present and is not `Bundle`,
    /// - `entry` or `link` have an unexpected shape.
    pub fn from_json(document: &Value) -> FhirResult<Self> {
        let wire: BundleWire = decode(document, "Bundle")?;

        if let Some(resource_type) = wire.resource_type.as_deref() {
            if resource_type != "Bundle" {
                return Err(FhirError::InvalidInput(format!(
                    "Expected resourceType 'Bundle', got '{resource_type}'"
                )));
            }
        }

        let next = wire
            .link
            .into_iter()
            .find(|link| link.relation.eq_ignore_ascii_case("next"))
            .map(|link| link.url);

        Ok(Self {
            total: wire.total,
            entries: wire.entry,
            next,
        })
    }

    /// The server-reported `total`, if any. Informational only: indexing uses [`Page::len`].
    pub fn total(&self) -> Option<u64> {
        self.total
    }

    /// Number of entries actually present on this page.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, index: usize) -> Option<&Value> {
        self.entries.get(index)
    }

    pub fn entries(&self) -> &[Value] {
        &self.entries
    }

    /// Consume the page, returning its entries.
    pub fn into_entries(self) -> Vec<Value> {
        self.entries
    }

    /// URL of the next page, if the server advertised one.
    pub fn next_url(&self) -> Option<&str> {
        self.next.as_deref()
    }
}

#[derive(Debug, Deserialize)]
struct BundleWire {
    #[serde(rename = "resourceType", default)]
    resource_type: Option<String>,

    #[serde(default)]
    total: Option<u64>,

    #[serde(default)]
    link: Vec<LinkWire>,

    #[serde(default)]
    entry: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct LinkWire {
    relation: String,
    url: String,
}
