// Rust guideline compliant 2026-10-16

//! Connection Manager -- owns one live push-channel connection, its keep-alive
//! ping, and its reconnect policy.
//!
//! Entry points: [`ConnectionManager::open`], [`ConnectionManager::close`],
//! [`ConnectionManager::state`]. Configuration via [`ConnectionConfig::builder`].
//!
//! The manager depends only on the `domain::PushTransport` port. Inbound
//! liveness acknowledgements are consumed here; every other text frame is
//! handed to the caller's frame sink unchanged.

use domain::{ChannelError, ConnectionState, PING, PONG, PushConnection, PushTransport};
use rand::{Rng as _, SeedableRng as _, rngs::StdRng};
use std::cell::{Cell, RefCell};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};

/// Fixed delay before each reconnect attempt.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Liveness ping period while the channel is open.
pub const DEFAULT_KEEPALIVE_INTERVAL: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// ConnectionError
// ---------------------------------------------------------------------------

/// Errors returned by the Connection Manager.
///
/// Channel failures are not among them: those are recovered by reconnecting
/// and only show through [`ConnectionManager::state`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectionError {
    /// The supplied configuration is invalid.
    #[error("invalid connection configuration: {reason}")]
    InvalidConfig {
        /// Human-readable description of the problem.
        reason: String,
    },
    /// The manager was closed; it cannot be reopened.
    #[error("connection manager is closed")]
    Closed,
    /// The optional reconnect bound was reached.
    #[error("gave up after {attempts} reconnect attempt(s)")]
    ReconnectExhausted {
        /// Configured bound.
        attempts: u32,
    },
}

// ---------------------------------------------------------------------------
// ConnectionConfig + builder
// ---------------------------------------------------------------------------

/// Runtime configuration for a [`ConnectionManager`].
///
/// Construct via [`ConnectionConfig::builder`].
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Delay between losing the channel and the next connect attempt.
    pub reconnect_delay: Duration,
    /// Period of the outbound liveness ping while open.
    pub keepalive_interval: Duration,
    /// Optional bound on consecutive reconnect attempts. `None` retries forever.
    pub max_reconnect_attempts: Option<u32>,
    /// Optional upper bound of a uniform random delay added to each reconnect.
    pub reconnect_jitter: Option<Duration>,
    /// Optional RNG seed for reproducible jitter. `None` seeds from the OS.
    pub seed: Option<u64>,
}

/// Builder for [`ConnectionConfig`].
#[derive(Debug)]
pub struct ConnectionConfigBuilder {
    reconnect_delay: Duration,
    keepalive_interval: Duration,
    max_reconnect_attempts: Option<u32>,
    reconnect_jitter: Option<Duration>,
    seed: Option<u64>,
}

impl ConnectionConfig {
    /// Create a builder.
    ///
    /// Default values: `reconnect_delay = 5 s`, `keepalive_interval = 30 s`,
    /// unbounded reconnects, no jitter.
    #[must_use]
    pub fn builder() -> ConnectionConfigBuilder {
        ConnectionConfigBuilder {
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            keepalive_interval: DEFAULT_KEEPALIVE_INTERVAL,
            max_reconnect_attempts: None,
            reconnect_jitter: None,
            seed: None,
        }
    }
}

impl ConnectionConfigBuilder {
    #[must_use]
    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    #[must_use]
    pub fn keepalive_interval(mut self, interval: Duration) -> Self {
        self.keepalive_interval = interval;
        self
    }

    /// Give up after `n` consecutive failed reconnect attempts.
    #[must_use]
    pub fn max_reconnect_attempts(mut self, n: u32) -> Self {
        self.max_reconnect_attempts = Some(n);
        self
    }

    /// Add a uniform random delay in `[0, max]` to each reconnect.
    #[must_use]
    pub fn reconnect_jitter(mut self, max: Duration) -> Self {
        self.reconnect_jitter = Some(max);
        self
    }

    /// Fix the RNG seed for deterministic jitter (useful in tests).
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Validate and build the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::InvalidConfig`] when `reconnect_delay` or
    /// `keepalive_interval` is zero.
    #[must_use = "the Result must be checked; use ? or unwrap"]
    pub fn build(self) -> Result<ConnectionConfig, ConnectionError> {
        if self.reconnect_delay.is_zero() {
            return Err(ConnectionError::InvalidConfig {
                reason: "reconnect_delay must be > 0".to_owned(),
            });
        }
        if self.keepalive_interval.is_zero() {
            return Err(ConnectionError::InvalidConfig {
                reason: "keepalive_interval must be > 0".to_owned(),
            });
        }
        Ok(ConnectionConfig {
            reconnect_delay: self.reconnect_delay,
            keepalive_interval: self.keepalive_interval,
            max_reconnect_attempts: self.max_reconnect_attempts,
            reconnect_jitter: self.reconnect_jitter,
            seed: self.seed,
        })
    }
}

// ---------------------------------------------------------------------------
// ConnectionManager
// ---------------------------------------------------------------------------

/// Why the frame pump returned.
enum PumpExit {
    Shutdown,
    Lost(ChannelError),
}

/// Resets the running flag even when the `open` future is dropped mid-flight.
struct RunningGuard<'a>(&'a Cell<bool>);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// Resolves once `close` has been called.
async fn wait_closed(shutdown: &mut watch::Receiver<bool>) {
    // An error means the sender is gone, which only happens when the manager is dropped.
    let _ = shutdown.wait_for(|closed| *closed).await;
}

/// Owns the push channel and its timers.
///
/// All methods take `&self`; state lives in `Cell`/`RefCell` so the manager
/// can be shared with the rest of a single-threaded runtime.
#[derive(Debug)]
pub struct ConnectionManager {
    config: ConnectionConfig,
    /// `None` until the first `open`.
    state: Cell<Option<ConnectionState>>,
    running: Cell<bool>,
    reconnect_attempts: Cell<u32>,
    pings_sent: Cell<u64>,
    shutdown: watch::Sender<bool>,
    rng: RefCell<StdRng>,
}

impl ConnectionManager {
    /// Create an idle manager from `config`.
    #[must_use]
    pub fn new(config: ConnectionConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let (shutdown, _) = watch::channel(false);
        Self {
            config,
            state: Cell::new(None),
            running: Cell::new(false),
            reconnect_attempts: Cell::new(0),
            pings_sent: Cell::new(0),
            shutdown,
            rng: RefCell::new(rng),
        }
    }

    /// Current connectivity; `None` before the first [`open`](Self::open).
    #[must_use]
    pub fn state(&self) -> Option<ConnectionState> {
        self.state.get()
    }

    /// Consecutive reconnect attempts since the channel was last open.
    #[must_use]
    pub fn reconnect_attempts(&self) -> u32 {
        self.reconnect_attempts.get()
    }

    /// liveness pings sent since construction.
    #[must_use]
    pub fn pings_sent(&self) -> u64 {
        self.pings_sent.get()
    }

    fn is_closed(&self) -> bool {
        *self.shutdown.borrow()
    }

    fn set_state(&self, next: ConnectionState) {
        let previous = self.state.get();
        if previous == Some(ConnectionState::Closed) || previous == Some(next) {
            return;
        }
        self.state.set(Some(next));
        tracing::info!(
            from = ?previous,
            to = %next,
            "connection.state.changed"
        );
    }

    /// Establish the channel and keep it alive until [`close`](Self::close).
    ///
    /// Drives the connect, pump, and reconnect cycle; each non-ping inbound
    /// text frame is passed to `on_frame`. Idempotent: while a previous call
    /// is still running, a second call returns `Ok(())` immediately.
    ///
    /// # Errors
    ///
    /// - [`ConnectionError::Closed`] when called after `close`.
    /// - [`ConnectionError::ReconnectExhausted`] when a reconnect bound is
    ///   configured and reached; the manager is then closed.
    pub async fn open<T, F>(&self, transport: &T, mut on_frame: F) -> Result<(), ConnectionError>
    where
        T: PushTransport,
        F: FnMut(&str),
    {
        if self.is_closed() {
            return Err(ConnectionError::Closed);
        }
        if self.running.replace(true) {
            tracing::debug!("connection.open.ignored");
            return Ok(());
        }
        let _running = RunningGuard(&self.running);
        self.run(transport, &mut on_frame).await
    }

    /// Shut the channel down. Terminal: cancels the keep-alive and reconnect
    /// timers, releases the channel, and moves to `CLOSED`.
    pub fn close(&self) {
        self.set_state(ConnectionState::Closed);
        self.shutdown.send_replace(true);
        tracing::info!("connection.closed");
    }

    async fn run<T, F>(&self, transport: &T, on_frame: &mut F) -> Result<(), ConnectionError>
    where
        T: PushTransport,
        F: FnMut(&str),
    {
        let mut shutdown = self.shutdown.subscribe();
        self.set_state(ConnectionState::Connecting);

        loop {
            let connected = tokio::select! {
                biased;
                () = wait_closed(&mut shutdown) => return Ok(()),
                result = transport.connect() => result,
            };

            match connected {
                Ok(mut conn) => {
                    self.reconnect_attempts.set(0);
                    self.set_state(ConnectionState::Open);
                    let exit = self.pump(&mut conn, &mut shutdown, on_frame).await;
                    conn.close().await;
                    match exit {
                        PumpExit::Shutdown => return Ok(()),
                        PumpExit::Lost(e) => tracing::warn!(error = %e, "connection.lost"),
                    }
                }
                Err(e) => tracing::warn!(error = %e, "connection.connect.failed"),
            }

            if self.is_closed() {
                return Ok(());
            }
            self.set_state(ConnectionState::Reconnecting);

            let attempt = self.reconnect_attempts.get() + 1;
            if let Some(max) = self.config.max_reconnect_attempts
                && attempt > max
            {
                tracing::error!(attempts = max, "connection.reconnect.exhausted");
                self.close();
                return Err(ConnectionError::ReconnectExhausted { attempts: max });
            }
            self.reconnect_attempts.set(attempt);

            let delay = self.config.reconnect_delay + self.jitter();
            tracing::info!(
                attempt,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "connection.reconnect.scheduled"
            );
            tokio::select! {
                biased;
                () = wait_closed(&mut shutdown) => return Ok(()),
                () = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// Forward frames and send pings until the channel is lost or closed.
    async fn pump<C, F>(
        &self,
        conn: &mut C,
        shutdown: &mut watch::Receiver<bool>,
        on_frame: &mut F,
    ) -> PumpExit
    where
        C: PushConnection,
        F: FnMut(&str),
    {
        let period = self.config.keepalive_interval;
        let mut keepalive = tokio::time::interval_at(Instant::now() + period, period);
        keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                () = wait_closed(shutdown) => return PumpExit::Shutdown,
                _ = keepalive.tick() => {
                    if let Err(e) = conn.send_text(PING).await {
                        return PumpExit::Lost(e);
                    }
                    self.pings_sent.set(self.pings_sent.get() + 1);
                    tracing::trace!("connection.keepalive.sent");
                }
                frame = conn.next_text() => match frame {
                    Some(Ok(text)) if text.trim() == PONG => tracing::trace!("connection.keepalive.ack"),
                    Some(Ok(text)) => on_frame(&text),
                    Some(Err(e)) => return PumpExit::Lost(e),
                    None => return PumpExit::Lost(ChannelError::Closed),
                },
            }
        }
    }

    fn jitter(&self) -> Duration {
        match self.config.reconnect_jitter {
            Some(max) if !max.is_zero() => {
                let max_ms = u64::try_from(max.as_millis()).unwrap_or(u64::MAX);
                Duration::from_millis(self.rng.borrow_mut().random_range(0..=max_ms))
            }
            _ => Duration::ZERO,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
