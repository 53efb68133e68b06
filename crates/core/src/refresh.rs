//! Timer-driven roster refresh.
//!
//! [`RefreshController`] is a two-state machine, `Idle` or `Armed { every_secs }`, driven by the
//! clinician's frequency field. While armed, a timer task fires immediately and then every
//! `every_secs` seconds; each tick spawns one independent [`RefreshJob`] run on the runtime.
//! Re-arming or cancelling stops the timer only. Runs already in flight finish and publish.
//!
//! How overlapping runs interact is governed by [`OverlapPolicy`].

use crate::config::OverlapPolicy;
use crate::discovery::DiscoveryPipeline;
use crate::practitioner::Practitioner;
use crate::{SyncError, SyncResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// One unit of refresh work.
#[async_trait]
pub trait RefreshJob: Send + Sync + 'static {
    /// `generation` is set when the batch should be published with stale-run rejection.
    async fn run(&self, generation: Option<u64>) -> SyncResult<()>;
}

/// Re-discovers a practitioner's roster and publishes it.
pub struct RosterRefresh {
    pipeline: Arc<DiscoveryPipeline>,
    practitioner: Arc<Practitioner>,
}

impl RosterRefresh {
    pub fn new(pipeline: Arc<DiscoveryPipeline>, practitioner: Arc<Practitioner>) -> Self {
        Self {
            pipeline,
            practitioner,
        }
    }
}

#[async_trait]
impl RefreshJob for RosterRefresh {
    async fn run(&self, generation: Option<u64>) -> SyncResult<()> {
        self.pipeline
            .refresh(&self.practitioner, generation)
            .await
            .map(|_| ())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshState {
    Idle,
    Armed { every_secs: u64 },
}

/// Parse a clinician-entered frequency in seconds.
///
/// Fractions round to the nearest second, halves upward (`2.5` is 3, `-0.5` is 0).
///
/// # Errors
///
/// [`SyncError::InvalidFrequency`] if `text` is not a number or rounds to a negative value.
pub fn parse_frequency(text: &str) -> SyncResult<u64> {
    let trimmed = text.trim();
    let invalid = || SyncError::InvalidFrequency(trimmed.to_string());

    let value: f64 = trimmed.parse().map_err(|_| invalid())?;
    if !value.is_finite() {
        return Err(invalid());
    }
    let rounded = (value + 0.5).floor();
    if rounded < 0.0 || rounded > u64::MAX as f64 {
        return Err(invalid());
    }
    Ok(rounded as u64)
}

struct ControllerState {
    state: RefreshState,
    timer: Option<JoinHandle<()>>,
}

pub struct RefreshController {
    ticker: Arc<Ticker>,
    inner: Mutex<ControllerState>,
}

impl RefreshController {
    /// A controller that spawns its timer and runs on `handle`. Starts idle.
    pub fn new(handle: Handle, job: Arc<dyn RefreshJob>, policy: OverlapPolicy) -> Self {
        Self {
            ticker: Arc::new(Ticker {
                handle,
                job,
                policy,
                generation: AtomicU64::new(0),
                in_flight: Arc::new(AtomicBool::new(false)),
            }),
            inner: Mutex::new(ControllerState {
                state: RefreshState::Idle,
                timer: None,
            }),
        }
    }

    pub fn state(&self) -> RefreshState {
        self.inner.lock().state
    }

    pub fn policy(&self) -> OverlapPolicy {
        self.ticker.policy
    }

    /// Apply a frequency typed by the clinician.
    ///
    /// `0` cancels, a positive value re-arms. Invalid input leaves the current timer untouched.
    pub fn submit_frequency(&self, text: &str) -> SyncResult<RefreshState> {
        let every_secs = parse_frequency(text)?;
        if every_secs == 0 {
            self.cancel();
        } else {
            self.arm(every_secs);
        }
        Ok(self.state())
    }

    /// Cancel any timer and start a new one that ticks now and then every `every_secs` seconds.
    pub fn arm(&self, every_secs: u64) {
        if every_secs == 0 {
            self.cancel();
            return;
        }

        let mut inner = self.inner.lock();
        if let Some(timer) = inner.timer.take() {
            timer.abort();
        }

        let ticker = self.ticker.clone();
        let period = Duration::from_secs(every_secs);
        inner.timer = Some(self.ticker.handle.spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                ticker.tick();
            }
        }));
        inner.state = RefreshState::Armed { every_secs };
        tracing::info!("refresh armed every {every_secs}s ({})", self.ticker.policy);
    }

    /// Stop the timer. In-flight runs are not interrupted.
    pub fn cancel(&self) {
        let mut inner = self.inner.lock();
        if let Some(timer) = inner.timer.take() {
            timer.abort();
            tracing::info!("refresh cancelled");
        }
        inner.state = RefreshState::Idle;
    }
}

impl Drop for RefreshController {
    fn drop(&mut self) {
        if let Some(timer) = self.inner.get_mut().timer.take() {
            timer.abort();
        }
    }
}

struct Ticker {
    handle: Handle,
    job: Arc<dyn RefreshJob>,
    policy: OverlapPolicy,
    generation: AtomicU64,
    in_flight: Arc<AtomicBool>,
}

impl Ticker {
    fn tick(&self) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let guard = match self.policy {
            OverlapPolicy::SkipWhileRunning => {
                if self
                    .in_flight
                    .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                    .is_err()
                {
                    tracing::debug!("skipping refresh {generation}: previous run still in flight");
                    return;
                }
                Some(InFlight(self.in_flight.clone()))
            }
            OverlapPolicy::Overlap | OverlapPolicy::DiscardStale => None,
        };
        let versioned = match self.policy {
            OverlapPolicy::DiscardStale => Some(generation),
            OverlapPolicy::Overlap | OverlapPolicy::SkipWhileRunning => None,
        };

        let job = self.job.clone();
        self.handle.spawn(async move {
            let _guard = guard;
            tracing::debug!("refresh {generation} started");
            if let Err(err) = job.run(versioned).await {
                tracing::warn!("refresh {generation} failed, keeping previous roster: {err}");
            }
        });
    }
}

/// Clears the in-flight flag when a run ends, however it ends.
struct InFlight(Arc<AtomicBool>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
