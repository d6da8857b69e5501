// Rust guideline compliant 2026-10-16

//! Snapshot poller -- periodically fetches the full case collection and hands
//! it to the [`Reconciler`] as the new baseline.
//!
//! Entry points: [`SnapshotPoller::poll_once`], [`SnapshotPoller::run`],
//! [`SnapshotPoller::stop`], and [`RefreshHandle::request`] to cut the current
//! interval short. Configuration via [`PollerConfig::builder`].

use domain::{Clock, FetchError, SnapshotSource};
use reconciler::{Reconciler, SnapshotReport};
use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;
use tokio::sync::{Notify, watch};

/// Default period between two snapshot fetches.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// PollerError
// ---------------------------------------------------------------------------

/// Errors that can occur while configuring the poller.
///
/// Fetch failures are not among them: they are recorded on the cache and
/// the loop keeps polling.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PollerError {
    /// The supplied configuration is invalid.
    #[error("invalid poller configuration: {reason}")]
    InvalidConfig {
        /// Human-readable description of the problem.
        reason: String,
    },
}

// ---------------------------------------------------------------------------
// PollerConfig + builder
// ---------------------------------------------------------------------------

/// Runtime configuration for a [`SnapshotPoller`].
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Delay between the end of one poll and the start of the next.
    pub interval: Duration,
    /// Optional upper bound on the number of polls. `None` means infinite.
    pub iterations: Option<u64>,
}

/// Builder for [`PollerConfig`].
#[derive(Debug)]
pub struct PollerConfigBuilder {
    interval: Duration,
    iterations: Option<u64>,
}

impl PollerConfig {
    /// Create a builder. Default values: `interval = 30 s`, `iterations = None`.
    #[must_use]
    pub fn builder() -> PollerConfigBuilder {
        PollerConfigBuilder { interval: DEFAULT_POLL_INTERVAL, iterations: None }
    }
}

impl PollerConfigBuilder {
    #[must_use]
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set a finite poll count. Without this the poller runs until stopped.
    #[must_use]
    pub fn iterations(mut self, n: u64) -> Self {
        self.iterations = Some(n);
        self
    }

    /// Validate and build the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`PollerError::InvalidConfig`] when `interval` is zero.
    #[must_use = "the Result must be checked; use ? or unwrap"]
    pub fn build(self) -> Result<PollerConfig, PollerError> {
        if self.interval.is_zero() {
            return Err(PollerError::InvalidConfig { reason: "interval must be > 0".to_owned() });
        }
        Ok(PollerConfig { interval: self.interval, iterations: self.iterations })
    }
}

// ---------------------------------------------------------------------------
// SnapshotPoller
// ---------------------------------------------------------------------------

/// Asks a running [`SnapshotPoller`] to fetch now instead of at the end of
/// its interval.
///
/// Requests made while a fetch is in flight are kept and served right after
/// it; several pending requests collapse into one fetch.
#[derive(Debug, Clone)]
pub struct RefreshHandle {
    notify: Rc<Notify>,
}

impl RefreshHandle {
    pub fn request(&self) {
        tracing::debug!("poller.refresh.requested");
        self.notify.notify_one();
    }
}

/// Drives periodic full fetches from a [`SnapshotSource`].
#[derive(Debug)]
pub struct SnapshotPoller {
    config: PollerConfig,
    stop: watch::Sender<bool>,
    refresh: Rc<Notify>,
    failures: Cell<u64>,
}

impl SnapshotPoller {
    #[must_use]
    pub fn new(config: PollerConfig) -> Self {
        let (stop, _) = watch::channel(false);
        Self { config, stop, refresh: Rc::new(Notify::new()), failures: Cell::new(0) }
    }

    /// Handle that wakes this poller's [`run`](Self::run) loop early.
    #[must_use]
    pub fn refresh_handle(&self) -> RefreshHandle {
        RefreshHandle { notify: Rc::clone(&self.refresh) }
    }

    /// Number of failed fetches since construction.
    #[must_use]
    pub fn failures(&self) -> u64 {
        self.failures.get()
    }

    /// Fetch once and apply the result.
    ///
    /// The ticket is taken before the fetch is issued, so pushes merged while
    /// the fetch is in flight are not overwritten by older data.
    ///
    /// # Errors
    ///
    /// Returns the [`FetchError`] of a failed fetch after recording it on the
    /// cache; the previous snapshot is kept.
    pub async fn poll_once<S, C>(
        &self,
        source: &S,
        reconciler: &Reconciler<C>,
    ) -> Result<SnapshotReport, FetchError>
    where
        S: SnapshotSource,
        C: Clock,
    {
        let ticket = reconciler.begin_snapshot();
        match source.fetch_all().await {
            Ok(cases) => Ok(reconciler.apply_snapshot(ticket, cases)),
            Err(e) => {
                self.failures.set(self.failures.get() + 1);
                reconciler.record_fetch_failure(&e);
                Err(e)
            }
        }
    }

    /// Poll immediately, then every `interval`, until [`stop`](Self::stop) or
    /// the iteration bound. Stopping cancels an in-flight fetch. A refresh
    /// request ends the current wait early.
    pub async fn run<S, C>(&self, source: &S, reconciler: &Reconciler<C>)
    where
        S: SnapshotSource,
        C: Clock,
    {
        let mut stop = self.stop.subscribe();
        let mut count = 0u64;
        loop {
            tokio::select! {
                biased;
                () = wait_stopped(&mut stop) => {
                    tracing::info!(polls = count, "poller.run.stopped");
                    return;
                }
                result = self.poll_once(source, reconciler) => {
                    if let Err(e) = result {
                        tracing::warn!(error = %e, failures = self.failures(), "poller.poll.failed");
                    }
                }
            }

            count += 1;
            tracing::debug!(iteration = count, "poller.poll.done");

            if let Some(max) = self.config.iterations
                && count >= max
            {
                tracing::info!("poller.run.stopped: iteration limit reached");
                return;
            }

            tokio::select! {
                biased;
                () = wait_stopped(&mut stop) => {
                    tracing::info!(polls = count, "poller.run.stopped");
                    return;
                }
                () = self.refresh.notified() => {
                    tracing::debug!(polls = count, "poller.run.refresh");
                }
                () = tokio::time::sleep(self.config.interval) => {}
            }
        }
    }

    /// Stop the loop; no fetch is issued afterwards.
    pub fn stop(&self) {
        self.stop.send_replace(true);
    }
}

async fn wait_stopped(stop: &mut watch::Receiver<bool>) {
    let _ = stop.wait_for(|stopped| *stopped).await;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
