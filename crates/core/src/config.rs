//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into the fetcher, the
//! discovery pipeline and the refresh controller. Nothing in the core reads environment
//! variables while a refresh cycle is running; the binaries read them and hand the raw values to
//! the `*_from_env_value` resolvers below.

use crate::constants::{DEFAULT_MAX_PAGE_HOPS, DEFAULT_REQUEST_TIMEOUT_SECS};
use crate::{SyncError, SyncResult};
use fhir::Endpoints;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// What the refresh controller does when a tick fires while an earlier run is still in flight.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OverlapPolicy {
    /// Runs race freely; whichever finishes last overwrites the roster.
    Overlap,
    /// A tick is dropped while a previous run is still in flight.
    SkipWhileRunning,
    /// Runs overlap, but a run that finishes after a newer one has published is discarded.
    #[default]
    DiscardStale,
}

impl FromStr for OverlapPolicy {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "overlap" => Ok(Self::Overlap),
            "skip-while-running" => Ok(Self::SkipWhileRunning),
            "discard-stale" => Ok(Self::DiscardStale),
            other => Err(SyncError::InvalidConfig(format!(
                "unknown overlap policy '{other}' (expected overlap, skip-while-running or discard-stale)"
            ))),
        }
    }
}

impl fmt::Display for OverlapPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Overlap => "overlap",
            Self::SkipWhileRunning => "skip-while-running",
            Self::DiscardStale => "discard-stale",
        })
    }
}

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    endpoints: Endpoints,
    request_timeout: Duration,
    max_page_hops: usize,
    overlap_policy: OverlapPolicy,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    pub fn new(
        endpoints: Endpoints,
        request_timeout: Duration,
        max_page_hops: usize,
        overlap_policy: OverlapPolicy,
    ) -> SyncResult<Self> {
        if request_timeout.is_zero() {
            return Err(SyncError::InvalidConfig(
                "request timeout must be greater than zero".into(),
            ));
        }
        if max_page_hops == 0 {
            return Err(SyncError::InvalidConfig(
                "max page hops must be greater than zero".into(),
            ));
        }

        Ok(Self {
            endpoints,
            request_timeout,
            max_page_hops,
            overlap_policy,
        })
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn max_page_hops(&self) -> usize {
        self.max_page_hops
    }

    pub fn overlap_policy(&self) -> OverlapPolicy {
        self.overlap_policy
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            endpoints: Endpoints::default(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            max_page_hops: DEFAULT_MAX_PAGE_HOPS,
            overlap_policy: OverlapPolicy::default(),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Resolve the server root from an optional `FHIR_BASE_URL` value.
///
/// If `value` is `None` or blank, the public HAPI test server is used.
pub fn endpoints_from_env_value(value: Option<String>) -> SyncResult<Endpoints> {
    match non_blank(value) {
        Some(url) => Endpoints::new(&url)
            .map_err(|e| SyncError::InvalidConfig(format!("FHIR_BASE_URL: {e}"))),
        None => Ok(Endpoints::default()),
    }
}

/// Parse `FHIR_REQUEST_TIMEOUT_SECS`.
pub fn request_timeout_from_env_value(value: Option<String>) -> SyncResult<Duration> {
    let Some(raw) = non_blank(value) else {
        return Ok(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS));
    };
    match raw.parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(SyncError::InvalidConfig(format!(
            "FHIR_REQUEST_TIMEOUT_SECS must be a positive integer, got '{raw}'"
        ))),
    }
}

/// Parse `FHIR_MAX_PAGE_HOPS`.
pub fn max_page_hops_from_env_value(value: Option<String>) -> SyncResult<usize> {
    let Some(raw) = non_blank(value) else {
        return Ok(DEFAULT_MAX_PAGE_HOPS);
    };
    match raw.parse::<usize>() {
        Ok(hops) if hops > 0 => Ok(hops),
        _ => Err(SyncError::InvalidConfig(format!(
            "FHIR_MAX_PAGE_HOPS must be a positive integer, got '{raw}'"
        ))),
    }
}

/// Parse `VITALWATCH_OVERLAP_POLICY`; blank means [`OverlapPolicy::DiscardStale`].
pub fn overlap_policy_from_env_value(value: Option<String>) -> SyncResult<OverlapPolicy> {
    non_blank(value)
        .map(|v| v.parse::<OverlapPolicy>())
        .transpose()
        .map(Option::unwrap_or_default)
}

/// Build a [`CoreConfig`] from the raw values of `FHIR_BASE_URL`, `FHIR_REQUEST_TIMEOUT_SECS`,
/// `FHIR_MAX_PAGE_HOPS` and `VITALWATCH_OVERLAP_POLICY`.
pub fn core_config_from_env_values(
    base_url: Option<String>,
    request_timeout_secs: Option<String>,
    max_page_hops: Option<String>,
    overlap_policy: Option<String>,
) -> SyncResult<CoreConfig> {
    CoreConfig::new(
        endpoints_from_env_value(base_url)?,
        request_timeout_from_env_value(request_timeout_secs)?,
        max_page_hops_from_env_value(max_page_hops)?,
        overlap_policy_from_env_value(overlap_policy)?,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_unset() {
        assert_eq!(
            endpoints_from_env_value(None).expect("endpoints").base_url(),
            fhir::query::DEFAULT_BASE_URL
        );
        assert_eq!(
            request_timeout_from_env_value(Some("  ".into())).expect("timeout"),
            Duration::from_secs(30)
        );
        assert_eq!(max_page_hops_from_env_value(None).expect("hops"), 1000);
        assert_eq!(
            overlap_policy_from_env_value(None).expect("policy"),
            OverlapPolicy::DiscardStale
        );
    }

    #[test]
    fn parses_overrides() {
        let endpoints =
            endpoints_from_env_value(Some("http://localhost:8080/fhir".into())).expect("endpoints");
        assert_eq!(endpoints.base_url(), "http://localhost:8080/fhir/");
        assert_eq!(
            request_timeout_from_env_value(Some("5".into())).expect("timeout"),
            Duration::from_secs(5)
        );
        assert_eq!(max_page_hops_from_env_value(Some("12".into())).expect("hops"), 12);
        assert_eq!(
            overlap_policy_from_env_value(Some("Skip-While-Running".into())).expect("policy"),
            OverlapPolicy::SkipWhileRunning
        );
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(matches!(
            endpoints_from_env_value(Some("ftp://example.org".into())),
            Err(SyncError::InvalidConfig(_))
        ));
        assert!(matches!(
            request_timeout_from_env_value(Some("0".into())),
            Err(SyncError::InvalidConfig(_))
        ));
        assert!(matches!(
            max_page_hops_from_env_value(Some("-1".into())),
            Err(SyncError::InvalidConfig(_))
        ));

        let err = overlap_policy_from_env_value(Some("newest".into())).expect_err("should fail");
        match err {
            SyncError::InvalidConfig(msg) => assert!(msg.contains("newest")),
            other => panic!("expected InvalidConfig error, got {other:?}"),
        }
    }

    #[test]
    fn config_rejects_zero_limits() {
        assert!(CoreConfig::new(
            Endpoints::default(),
            Duration::ZERO,
            10,
            OverlapPolicy::Overlap
        )
        .is_err());
        assert!(CoreConfig::new(
            Endpoints::default(),
            Duration::from_secs(1),
            0,
            OverlapPolicy::Overlap
        )
        .is_err());
    }

    #[test]
    fn overlap_policy_display_round_trips() {
        for policy in [
            OverlapPolicy::Overlap,
            OverlapPolicy::SkipWhileRunning,
            OverlapPolicy::DiscardStale,
        ] {
            assert_eq!(policy.to_string().parse::<OverlapPolicy>().expect("parse"), policy);
        }
    }
}
