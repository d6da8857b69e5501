// Rust guideline compliant 2026-10-16

//! `Listener` adapter feeding decoded push events into the reconciler.

use dispatcher::{Listener, ListenerError};
use domain::{Clock, PushEvent};
use poller::RefreshHandle;
use reconciler::{MergeOutcome, Reconciler};
use std::rc::Rc;

/// Forwards every event it receives to [`Reconciler::apply_event`].
///
/// Stale events are an expected outcome and count as handled. A new case
/// announced without its record asks the poller for an early snapshot.
/// Rejected records and status changes for uncached cases are reported as
/// failures.
#[derive(Debug)]
pub struct CacheListener<C: Clock> {
    reconciler: Rc<Reconciler<C>>,
    refresh: RefreshHandle,
}

impl<C: Clock> CacheListener<C> {
    #[must_use]
    pub fn new(reconciler: Rc<Reconciler<C>>, refresh: RefreshHandle) -> Self {
        Self { reconciler, refresh }
    }
}

impl<C: Clock> Listener for CacheListener<C> {
    fn on_event(&self, event: &PushEvent) -> Result<(), ListenerError> {
        match self.reconciler.apply_event(event) {
            MergeOutcome::Inserted | MergeOutcome::Updated | MergeOutcome::Stale => Ok(()),
            MergeOutcome::Incomplete => {
                self.refresh.request();
                Ok(())
            }
            MergeOutcome::UnknownCase => Err(ListenerError::Rejected {
                reason: format!("case {} is not cached", event.case_id()),
            }),
            MergeOutcome::Rejected { reason } => Err(ListenerError::Rejected { reason }),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
