// Rust guideline compliant 2026-10-16

//! Case Lifecycle Controller -- validates and applies case status transitions.
//!
//! A transition is a two-phase action: check the target against the
//! lifecycle table, write it through the [`StatusWriter`] port, and only on
//! acceptance apply it to the cache through the [`Reconciler`]. An illegal
//! target never reaches the backend; a failed write leaves the cache untouched.
//!
//! Legal moves: `PENDING -> {INVESTIGATING, CONFIRMED, REJECTED}`,
//! `INVESTIGATING -> {CONFIRMED, REJECTED, RESOLVED}`, `CONFIRMED -> RESOLVED`.
//! `REJECTED` and `RESOLVED` are terminal.

use domain::{CaseId, CaseStatus, Clock, FraudCase, StatusUpdate, StatusWriter, WriteError};
use reconciler::{MergeOutcome, Reconciler};

// ---------------------------------------------------------------------------
// LifecycleError
// ---------------------------------------------------------------------------

/// Errors surfaced to the caller of [`LifecycleController::transition`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    /// The case is not in the cache.
    #[error("case {case_id} not found")]
    CaseNotFound {
        /// Requested case.
        case_id: CaseId,
    },
    /// The target is not a legal successor of the current status.
    #[error("case {case_id}: transition {from} -> {to} is not allowed")]
    InvalidTransition {
        /// Requested case.
        case_id: CaseId,
        /// Current cached status.
        from: CaseStatus,
        /// Requested status.
        to: CaseStatus,
    },
    /// The backend rejected or never received the write.
    #[error("case {case_id}: status write failed: {source}")]
    ActionFailed {
        /// Requested case.
        case_id: CaseId,
        /// Underlying write failure.
        source: WriteError,
    },
}

// ---------------------------------------------------------------------------
// Transition table
// ---------------------------------------------------------------------------

/// Statuses reachable from `from` in one step.
#[must_use]
pub fn legal_successors(from: CaseStatus) -> &'static [CaseStatus] {
    match from {
        CaseStatus::Pending => &[CaseStatus::Confirmed, CaseStatus::Rejected, CaseStatus::Investigating],
        CaseStatus::Investigating => &[CaseStatus::Confirmed, CaseStatus::Rejected, CaseStatus::Resolved],
        CaseStatus::Confirmed => &[CaseStatus::Resolved],
        CaseStatus::Rejected | CaseStatus::Resolved => &[],
    }
}

#[must_use]
pub fn can_transition(from: CaseStatus, to: CaseStatus) -> bool {
    legal_successors(from).contains(&to)
}

/// `true` for statuses with no successor.
#[must_use]
pub fn is_terminal(status: CaseStatus) -> bool {
    legal_successors(status).is_empty()
}

// ---------------------------------------------------------------------------
// LifecycleController
// ---------------------------------------------------------------------------

/// Drives status transitions against one [`StatusWriter`] adapter.
///
/// Generic over the port for static dispatch; holds no cache of its own.
#[derive(Debug)]
pub struct LifecycleController<W: StatusWriter> {
    writer: W,
}

impl<W: StatusWriter> LifecycleController<W> {
    #[must_use]
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Move `case_id` to `target`.
    ///
    /// Returns the cached case after the transition was applied. `notes` and
    /// `actor` are forwarded to the backend as audit data.
    ///
    /// # Errors
    ///
    /// - [`LifecycleError::CaseNotFound`] when the case is not cached, before
    ///   or after the write.
    /// - [`LifecycleError::InvalidTransition`] when `target` is not a legal
    ///   successor; no remote call is made.
    /// - [`LifecycleError::ActionFailed`] when the write fails; the cache is unchanged.
    pub async fn transition<C: Clock>(
        &self,
        reconciler: &Reconciler<C>,
        case_id: CaseId,
        target: CaseStatus,
        notes: Option<String>,
        actor: &str,
    ) -> Result<FraudCase, LifecycleError> {
        let Some(current) = reconciler.case(case_id) else {
            return Err(LifecycleError::CaseNotFound { case_id });
        };
        if !can_transition(current.status, target) {
            tracing::info!(case_id, from = %current.status, to = %target, "lifecycle.transition.invalid");
            return Err(LifecycleError::InvalidTransition { case_id, from: current.status, to: target });
        }

        let update = StatusUpdate { case_id, status: target, notes, actor: actor.to_owned() };
        if let Err(source) = self.writer.write_status(&update).await {
            tracing::warn!(case_id, to = %target, error = %source, "lifecycle.transition.failed");
            return Err(LifecycleError::ActionFailed { case_id, source });
        }

        // The case may have been dropped by a snapshot while the write was in flight.
        match reconciler.apply_local_status(case_id, target) {
            MergeOutcome::UnknownCase => Err(LifecycleError::CaseNotFound { case_id }),
            outcome => {
                tracing::info!(
                    case_id,
                    from = %current.status,
                    to = %target,
                    actor,
                    ?outcome,
                    "lifecycle.transition.applied"
                );
                reconciler.case(case_id).ok_or(LifecycleError::CaseNotFound { case_id })
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::{LifecycleController, LifecycleError, can_transition, is_terminal, legal_successors};
    use chrono::{DateTime, Duration, TimeZone as _, Utc};
    use domain::{
        CaseStatus, Clock, DetectorType, FraudCase, Severity, StatusUpdate, StatusWriter, WriteError,
    };
    use reconciler::Reconciler;
    use std::cell::{Cell, RefCell};

    // ------------------------------------------------------------------
    // Test helpers
    // ------------------------------------------------------------------

    struct FixedClock;

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            t(30)
        }
    }

    fn t(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 3, 9, 0, 0).unwrap() + Duration::minutes(minutes)
    }

    fn make_case(id: u64, status: CaseStatus) -> FraudCase {
        FraudCase {
            id,
            case_number: format!("FRD-{id:05}"),
            detector_type: DetectorType::ExcessiveDiscount,
            severity: Severity::High,
            status,
            title: Some("Discount above policy".to_owned()),
            description: None,
            amount: Some(420.0),
            confidence_score: Some(91.0),
            client_code: Some("C-001".to_owned()),
            client_name: None,
            detection_date: t(-60),
            created_at: Some(t(-60)),
            updated_at: Some(t(1)),
        }
    }

    fn seeded(status: CaseStatus) -> Reconciler<FixedClock> {
        let reconciler = Reconciler::new(FixedClock);
        reconciler.merge_case(make_case(1, status));
        reconciler
    }

    struct MockWriter {
        calls: Cell<u32>,
        last: RefCell<Option<StatusUpdate>>,
        fail_with: Option<WriteError>,
    }

    impl MockWriter {
        fn new() -> Self {
            Self { calls: Cell::new(0), last: RefCell::new(None), fail_with: None }
        }

        fn failing(error: WriteError) -> Self {
            Self { fail_with: Some(error), ..Self::new() }
        }
    }

    impl StatusWriter for MockWriter {
        async fn write_status(&self, update: &StatusUpdate) -> Result<(), WriteError> {
            self.calls.set(self.calls.get() + 1);
            *self.last.borrow_mut() = Some(update.clone());
            match &self.fail_with {
                Some(e) => Err(e.clone()),
                None => Ok(()),
            }
        }
    }

    // ------------------------------------------------------------------
    // Transition table
    // ------------------------------------------------------------------

    #[test]
    fn table_matches_lifecycle() {
        assert!(can_transition(CaseStatus::Pending, CaseStatus::Investigating));
        assert!(can_transition(CaseStatus::Pending, CaseStatus::Confirmed));
        assert!(can_transition(CaseStatus::Pending, CaseStatus::Rejected));
        assert!(!can_transition(CaseStatus::Pending, CaseStatus::Resolved));
        assert!(can_transition(CaseStatus::Investigating, CaseStatus::Confirmed));
        assert!(can_transition(CaseStatus::Investigating, CaseStatus::Rejected));
        assert!(can_transition(CaseStatus::Investigating, CaseStatus::Resolved));
        assert!(can_transition(CaseStatus::Confirmed, CaseStatus::Resolved));
        assert!(!can_transition(CaseStatus::Confirmed, CaseStatus::Pending));
    }

    #[test]
    fn terminal_statuses_have_no_successors() {
        assert!(is_terminal(CaseStatus::Resolved));
        assert!(is_terminal(CaseStatus::Rejected));
        assert!(!is_terminal(CaseStatus::Confirmed));
        for to in CaseStatus::ALL {
            assert!(!can_transition(CaseStatus::Resolved, to));
            assert!(!can_transition(CaseStatus::Rejected, to));
        }
    }

    #[test]
    fn no_self_transitions() {
        for status in CaseStatus::ALL {
            assert!(!legal_successors(status).contains(&status), "{status} -> {status}");
        }
    }

    // ------------------------------------------------------------------
    // transition
    // ------------------------------------------------------------------

    // LC-T01: terminal statuses reject every target without a remote call.
    #[tokio::test]
    async fn terminal_status_rejects_without_remote_call() {
        for terminal in [CaseStatus::Resolved, CaseStatus::Rejected] {
            let reconciler = seeded(terminal);
            let writer = MockWriter::new();
            let controller = LifecycleController::new(writer);

            for target in CaseStatus::ALL {
                let result = controller.transition(&reconciler, 1, target, None, "analyst").await;
                assert_eq!(
                    result,
                    Err(LifecycleError::InvalidTransition { case_id: 1, from: terminal, to: target })
                );
            }
            assert_eq!(controller.writer.calls.get(), 0);
        }
    }

    // LC-T02: PENDING -> RESOLVED is illegal and leaves the cache unchanged.
    #[tokio::test]
    async fn pending_to_resolved_is_invalid_and_cache_unchanged() {
        let reconciler = seeded(CaseStatus::Pending);
        let before = reconciler.case(1);
        let controller = LifecycleController::new(MockWriter::new());

        let result = controller
            .transition(&reconciler, 1, CaseStatus::Resolved, Some("ok".to_owned()), "analyst")
            .await;

        assert!(matches!(result, Err(LifecycleError::InvalidTransition { .. })));
        assert_eq!(reconciler.case(1), before);
        assert_eq!(controller.writer.calls.get(), 0);
    }

    // LC-T03: accepted write applies the status with a newer timestamp.
    #[tokio::test]
    async fn accepted_write_applies_new_status() {
        let reconciler = seeded(CaseStatus::Pending);
        let controller = LifecycleController::new(MockWriter::new());

        let case = controller
            .transition(&reconciler, 1, CaseStatus::Confirmed, Some("verified".to_owned()), "analyst")
            .await
            .unwrap();

        assert_eq!(case.status, CaseStatus::Confirmed);
        assert!(case.updated_at.unwrap() > t(1));
        assert_eq!(reconciler.stats().confirmed_cases(), 1);
        assert_eq!(reconciler.stats().pending_cases(), 0);

        let sent = controller.writer.last.borrow().clone().unwrap();
        assert_eq!(
            sent,
            StatusUpdate {
                case_id: 1,
                status: CaseStatus::Confirmed,
                notes: Some("verified".to_owned()),
                actor: "analyst".to_owned(),
            }
        );
    }

    // LC-T04: failed write surfaces ActionFailed and leaves the cache unchanged.
    #[tokio::test]
    async fn failed_write_leaves_cache_unchanged() {
        let reconciler = seeded(CaseStatus::Investigating);
        let before = reconciler.case(1);
        let error = WriteError::Rejected { status: 500, reason: "db down".to_owned() };
        let controller = LifecycleController::new(MockWriter::failing(error.clone()));

        let result = controller.transition(&reconciler, 1, CaseStatus::Resolved, None, "analyst").await;

        assert_eq!(result, Err(LifecycleError::ActionFailed { case_id: 1, source: error }));
        assert_eq!(reconciler.case(1), before);
        assert_eq!(controller.writer.calls.get(), 1);
    }

    #[tokio::test]
    async fn unknown_case_is_not_found() {
        let reconciler = Reconciler::new(FixedClock);
        let controller = LifecycleController::new(MockWriter::new());

        let result = controller.transition(&reconciler, 42, CaseStatus::Confirmed, None, "analyst").await;

        assert_eq!(result, Err(LifecycleError::CaseNotFound { case_id: 42 }));
        assert_eq!(controller.writer.calls.get(), 0);
    }

    #[tokio::test]
    async fn chained_transitions_reach_resolved() {
        let reconciler = seeded(CaseStatus::Pending);
        let controller = LifecycleController::new(MockWriter::new());

        controller.transition(&reconciler, 1, CaseStatus::Investigating, None, "a").await.unwrap();
        controller.transition(&reconciler, 1, CaseStatus::Confirmed, None, "a").await.unwrap();
        let case = controller.transition(&reconciler, 1, CaseStatus::Resolved, None, "a").await.unwrap();

        assert_eq!(case.status, CaseStatus::Resolved);
        assert_eq!(controller.writer.calls.get(), 3);
    }

    #[test]
    fn error_messages() {
        let e = LifecycleError::InvalidTransition {
            case_id: 3,
            from: CaseStatus::Resolved,
            to: CaseStatus::Pending,
        };
        assert_eq!(e.to_string(), "case 3: transition RESOLVED -> PENDING is not allowed");
    }
}
