#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("server returned HTTP {status} for {url}")]
    Status { url: String, status: u16 },
    #[error("no document available for {0}")]
    NotFound(String),
    #[error("failed to decode response: {0}")]
    Decode(#[from] fhir::FhirError),
    #[error("failed to parse JSON from {url}: {source}")]
    Json {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("search page has no entries")]
    EmptyPage,
    #[error("index {index} is past the last result")]
    OutOfRange { index: usize },
    #[error("pagination exceeded {0} page hops")]
    PageLimitExceeded(usize),

    #[error("failed to hydrate {resource}: {source}")]
    Hydration {
        resource: String,
        #[source]
        source: Box<SyncError>,
    },

    #[error("invalid refresh frequency '{0}': expected a non-negative number of seconds")]
    InvalidFrequency(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("invalid value: {0}")]
    InvalidValue(#[from] vitalwatch_types::TypesError),
}

pub type SyncResult<T> = std::result::Result<T, SyncError>;
