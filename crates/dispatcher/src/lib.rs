// Rust guideline compliant 2026-10-16

//! Event Dispatcher -- decodes push-channel frames and fans typed events out
//! to listeners registered per [`EventKind`].
//!
//! Entry points: [`EventDispatcher::subscribe`], [`EventDispatcher::unsubscribe`],
//! [`EventDispatcher::dispatch`]. The dispatcher holds listeners through
//! `Weak` references only; dropping the last `Rc` silently unregisters them.

use domain::{DecodeError, EventKind, PING, PONG, PushEvent};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::{Rc, Weak};

// ---------------------------------------------------------------------------
// Listener port
// ---------------------------------------------------------------------------

/// Errors a listener may report for one event.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ListenerError {
    /// The listener could not process the event.
    #[error("listener rejected event: {reason}")]
    Rejected {
        /// Human-readable description.
        reason: String,
    },
}

/// Receiver of typed push events.
///
/// Called synchronously inside the dispatching turn. A failure (error or
/// panic) is isolated: remaining listeners still receive the event.
pub trait Listener {
    /// Handle one event of a kind this listener subscribed to.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError`] when the event cannot be processed.
    fn on_event(&self, event: &PushEvent) -> Result<(), ListenerError>;
}

/// Handle returned by [`EventDispatcher::subscribe`]; pass to `unsubscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionToken(u64);

/// Outcome of dispatching one raw frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// Reserved liveness token; never decoded, never delivered.
    Liveness,
    /// Decoded and offered to every live listener of `kind`.
    Delivered {
        /// Routing kind of the event.
        kind: EventKind,
        /// Listeners that accepted the event.
        delivered: usize,
        /// Listeners that returned an error or panicked.
        failed: usize,
    },
    /// Structured frame with a discriminator outside the closed set.
    Ignored {
        /// The unrecognised discriminator.
        kind: String,
    },
    /// Frame that failed to decode; dropped.
    Dropped(DecodeError),
}

// ---------------------------------------------------------------------------
// EventDispatcher
// ---------------------------------------------------------------------------

struct Registration {
    token: SubscriptionToken,
    kind: EventKind,
    listener: Weak<dyn Listener>,
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("token", &self.token)
            .field("kind", &self.kind)
            .field("alive", &(self.listener.strong_count() > 0))
            .finish()
    }
}

/// Typed event-kind-to-listener registry.
///
/// Listeners of one kind are invoked in registration order. Interior
/// mutability lets listeners subscribe or unsubscribe from inside a callback:
/// the registry borrow is released before any listener runs.
#[derive(Debug, Default)]
pub struct EventDispatcher {
    registrations: RefCell<Vec<Registration>>,
    next_token: Cell<u64>,
}

impl EventDispatcher {
    /// Create an empty dispatcher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener` for events of `kind`.
    ///
    /// Only a weak reference is kept; the caller owns the listener.
    pub fn subscribe<L: Listener + 'static>(&self, kind: EventKind, listener: &Rc<L>) -> SubscriptionToken {
        let token = SubscriptionToken(self.next_token.get());
        self.next_token.set(token.0 + 1);
        let weak = Rc::downgrade(listener);
        let listener: Weak<dyn Listener> = weak;
        self.registrations.borrow_mut().push(Registration { token, kind, listener });
        tracing::debug!(token = token.0, ?kind, "dispatcher.subscribed");
        token
    }

    /// Remove the registration behind `token`. Returns `false` if it was
    /// already gone.
    pub fn unsubscribe(&self, token: SubscriptionToken) -> bool {
        let mut registrations = self.registrations.borrow_mut();
        let before = registrations.len();
        registrations.retain(|r| r.token != token);
        let removed = registrations.len() != before;
        tracing::debug!(token = token.0, removed, "dispatcher.unsubscribed");
        removed
    }

    /// Number of live listeners registered for `kind`.
    #[must_use]
    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.registrations
            .borrow()
            .iter()
            .filter(|r| r.kind == kind && r.listener.strong_count() > 0)
            .count()
    }

    /// Decode one raw frame and deliver it.
    ///
    /// The liveness tokens are recognised before decoding. Unknown
    /// discriminators are ignored; other decode failures are logged and
    /// swallowed. Never panics on malformed input.
    pub fn dispatch(&self, raw: &str) -> Dispatch {
        let frame = raw.trim();
        if frame == PONG || frame == PING {
            tracing::trace!("dispatcher.liveness");
            return Dispatch::Liveness;
        }
        match PushEvent::decode(frame) {
            Ok(event) => self.deliver(&event),
            Err(DecodeError::UnknownKind { kind }) => {
                tracing::debug!(%kind, "dispatcher.event.ignored");
                Dispatch::Ignored { kind }
            }
            Err(e) => {
                tracing::warn!(error = %e, "dispatcher.decode.failed");
                Dispatch::Dropped(e)
            }
        }
    }

    /// Deliver an already-decoded event to every live listener of its kind.
    ///
    /// The listener set is captured before the first call: registrations made
    /// by a listener take effect from the next event.
    pub fn deliver(&self, event: &PushEvent) -> Dispatch {
        let kind = event.kind();
        let targets: Vec<(SubscriptionToken, Weak<dyn Listener>)> = {
            let mut registrations = self.registrations.borrow_mut();
            registrations.retain(|r| r.listener.strong_count() > 0);
            registrations
                .iter()
                .filter(|r| r.kind == kind)
                .map(|r| (r.token, Weak::clone(&r.listener)))
                .collect()
        }; // borrow released before any listener runs

        let mut delivered = 0;
        let mut failed = 0;
        for (token, weak) in targets {
            let Some(listener) = weak.upgrade() else {
                continue;
            };
            match catch_unwind(AssertUnwindSafe(|| listener.on_event(event))) {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(e)) => {
                    failed += 1;
                    tracing::warn!(token = token.0, error = %e, "dispatcher.listener.failed");
                }
                Err(_) => {
                    failed += 1;
                    tracing::error!(token = token.0, "dispatcher.listener.panicked");
                }
            }
        }

        tracing::debug!(?kind, case_id = event.case_id(), delivered, failed, "dispatcher.event.delivered");
        Dispatch::Delivered { kind, delivered, failed }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
