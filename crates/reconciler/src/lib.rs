// Rust guideline compliant 2026-10-16

//! Snapshot Cache and Reconciliation Engine.
//!
//! [`Reconciler`] exclusively owns the [`SnapshotCache`]: the live case
//! collection keyed by id, the derived [`DashboardStats`], and the fetch
//! bookkeeping. Every mutation goes through one of three merge paths:
//!
//! - [`Reconciler::apply_snapshot`] -- full-collection baseline from a poll,
//! - [`Reconciler::merge_case`] / [`Reconciler::apply_event`] -- incremental
//!   last-writer-wins merge of push events,
//! - [`Reconciler::apply_local_status`] -- accepted status writes.
//!
//! Stats are refolded from scratch with [`metrics::aggregate`] after every merge.
//! All methods are synchronous; a merge completes within one scheduler turn.

use chrono::{DateTime, Duration, Utc};
use domain::{
    CaseId, CaseStatus, Clock, DashboardStats, DetectedCase, EventPayload, FetchError, FraudCase,
    PushEvent,
};
use std::cell::{Cell, Ref, RefCell};
use std::collections::{BTreeMap, HashMap};

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Result of merging one case or event into the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The id was not cached; the record was added.
    Inserted,
    /// The cached record was replaced by a newer one.
    Updated,
    /// The incoming record was not strictly newer; discarded.
    Stale,
    /// A status change named an id that is not cached; nothing to update.
    UnknownCase,
    /// A new case was announced without its full record; a snapshot fetch
    /// is needed before it can be cached.
    Incomplete,
    /// The record violated a collection invariant; discarded.
    Rejected {
        /// Human-readable description.
        reason: String,
    },
}

impl MergeOutcome {
    /// `true` when the cache content changed.
    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Inserted | Self::Updated)
    }
}

/// Marker taken when a snapshot fetch is issued.
///
/// Cases merged after the ticket was taken are newer than anything the fetch
/// can return and survive the snapshot unless it carries a strictly newer
/// `updated_at` for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotTicket(u64);

/// Summary of one applied snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotReport {
    /// Records in the fetched collection.
    pub received: usize,
    /// Fetched records sharing an id with an earlier fetched record.
    pub duplicates: usize,
    /// Fetched records dropped for violating an invariant.
    pub rejected: usize,
    /// Cached cases kept because they were newer than the fetched record.
    pub kept_newer: usize,
    /// Cached cases absent from the snapshot but merged after the fetch was issued.
    pub kept_recent: usize,
    /// Cached cases absent from the snapshot and dropped.
    pub removed: usize,
    /// Cases in the cache after the snapshot.
    pub total: usize,
}

// ---------------------------------------------------------------------------
// SnapshotCache
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Entry {
    case: FraudCase,
    /// Merge generation that last wrote this entry.
    generation: u64,
}

/// The last known case collection and everything derived from it.
///
/// Read-only outside this crate; borrow it through [`Reconciler::snapshot`].
#[derive(Debug)]
pub struct SnapshotCache {
    entries: BTreeMap<CaseId, Entry>,
    /// `case_number` -> owning id; keeps case numbers unique.
    numbers: HashMap<String, CaseId>,
    stats: DashboardStats,
    last_snapshot_at: Option<DateTime<Utc>>,
    fetch_notice: Option<String>,
}

impl SnapshotCache {
    fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            numbers: HashMap::new(),
            stats: DashboardStats::default(),
            last_snapshot_at: None,
            fetch_notice: None,
        }
    }

    /// Cached case with `id`.
    #[must_use]
    pub fn get(&self, id: CaseId) -> Option<&FraudCase> {
        self.entries.get(&id).map(|e| &e.case)
    }

    /// All cached cases in ascending id order.
    pub fn cases(&self) -> impl Iterator<Item = &FraudCase> {
        self.entries.values().map(|e| &e.case)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Statistics folded from the current collection.
    #[must_use]
    pub fn stats(&self) -> &DashboardStats {
        &self.stats
    }

    /// When the last snapshot was successfully applied.
    #[must_use]
    pub fn last_snapshot_at(&self) -> Option<DateTime<Utc>> {
        self.last_snapshot_at
    }

    /// Message of the last failed fetch; cleared by the next successful snapshot.
    #[must_use]
    pub fn fetch_notice(&self) -> Option<&str> {
        self.fetch_notice.as_deref()
    }

    fn refold(&mut self, now: DateTime<Utc>) {
        self.stats = metrics::aggregate(self.cases(), now);
    }
}

// ---------------------------------------------------------------------------
// Reconciler
// ---------------------------------------------------------------------------

/// `incoming` replaces `cached` only when strictly newer. An unknown incoming
/// time is always newer; an unknown cached time is always older.
fn supersedes(incoming: Option<DateTime<Utc>>, cached: Option<DateTime<Utc>>) -> bool {
    match (incoming, cached) {
        (None, _) | (Some(_), None) => true,
        (Some(incoming), Some(cached)) => incoming > cached,
    }
}

/// Both times known and `a > b`.
fn strictly_newer(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> bool {
    matches!((a, b), (Some(a), Some(b)) if a > b)
}

/// Reconciliation engine; sole writer of the [`SnapshotCache`].
///
/// Generic over the [`Clock`] port so tests control "now" for stats and
/// local timestamps.
#[derive(Debug)]
pub struct Reconciler<C: Clock> {
    cache: RefCell<SnapshotCache>,
    /// Monotonic merge counter backing [`SnapshotTicket`].
    generation: Cell<u64>,
    clock: C,
}

impl<C: Clock> Reconciler<C> {
    /// Create a reconciler with an empty cache.
    #[must_use]
    pub fn new(clock: C) -> Self {
        Self { cache: RefCell::new(SnapshotCache::new()), generation: Cell::new(0), clock }
    }

    /// Borrow the cache for reading. Do not hold the borrow across an `.await`.
    #[must_use]
    pub fn snapshot(&self) -> Ref<'_, SnapshotCache> {
        self.cache.borrow()
    }

    /// Owned copy of the cached case with `id`.
    #[must_use]
    pub fn case(&self, id: CaseId) -> Option<FraudCase> {
        self.cache.borrow().get(id).cloned()
    }

    /// Owned copy of every cached case, ascending id.
    #[must_use]
    pub fn cases(&self) -> Vec<FraudCase> {
        self.cache.borrow().cases().cloned().collect()
    }

    /// Owned copy of the current statistics.
    #[must_use]
    pub fn stats(&self) -> DashboardStats {
        self.cache.borrow().stats.clone()
    }

    fn next_generation(&self) -> u64 {
        let generation = self.generation.get() + 1;
        self.generation.set(generation);
        generation
    }

    // ------------------------------------------------------------------
    // Full snapshot
    // ------------------------------------------------------------------

    /// Take a ticket immediately before issuing a snapshot fetch.
    #[must_use]
    pub fn begin_snapshot(&self) -> SnapshotTicket {
        SnapshotTicket(self.generation.get())
    }

    /// Replace the collection with a fetched snapshot.
    ///
    /// The snapshot is baseline truth with two exceptions: a cached case
    /// whose `updated_at` is strictly newer than its fetched record is kept,
    /// and a case merged after `ticket` is kept unless the fetched record is
    /// strictly newer. Cached cases absent from the snapshot are dropped
    /// unless merged after `ticket`.
    pub fn apply_snapshot(&self, ticket: SnapshotTicket, fetched: Vec<FraudCase>) -> SnapshotReport {
        let generation = self.next_generation();
        let now = self.clock.now();
        let mut report = SnapshotReport { received: fetched.len(), ..SnapshotReport::default() };

        let mut next: BTreeMap<CaseId, Entry> = BTreeMap::new();
        for case in fetched {
            if let Err(e) = case.validate() {
                report.rejected += 1;
                tracing::warn!(case_id = case.id, error = %e, "reconciler.snapshot.invalid_record");
                continue;
            }
            if let Some(seen) = next.get(&case.id) {
                report.duplicates += 1;
                if !supersedes(case.updated_at, seen.case.updated_at) {
                    continue;
                }
            }
            next.insert(case.id, Entry { case, generation });
        }

        let mut cache = self.cache.borrow_mut();
        let previous = std::mem::take(&mut cache.entries);
        for (id, cached) in previous {
            let recent = cached.generation > ticket.0;
            match next.get_mut(&id) {
                Some(fresh) => {
                    let keep_cached = if recent {
                        !strictly_newer(fresh.case.updated_at, cached.case.updated_at)
                    } else {
                        strictly_newer(cached.case.updated_at, fresh.case.updated_at)
                    };
                    if keep_cached {
                        report.kept_newer += 1;
                        *fresh = cached;
                    } else if fresh.case.updated_at.is_none() {
                        // Stored times never move backwards.
                        fresh.case.updated_at = cached.case.updated_at;
                    }
                }
                None if recent => {
                    report.kept_recent += 1;
                    next.insert(id, cached);
                }
                None => report.removed += 1,
            }
        }

        let mut numbers: HashMap<String, CaseId> = HashMap::with_capacity(next.len());
        next.retain(|id, entry| {
            if let Some(owner) = numbers.get(&entry.case.case_number) {
                report.rejected += 1;
                tracing::warn!(
                    case_id = id,
                    owner = owner,
                    case_number = %entry.case.case_number,
                    "reconciler.snapshot.duplicate_case_number"
                );
                return false;
            }
            numbers.insert(entry.case.case_number.clone(), *id);
            true
        });

        cache.entries = next;
        cache.numbers = numbers;
        cache.last_snapshot_at = Some(now);
        cache.fetch_notice = None;
        cache.refold(now);
        report.total = cache.entries.len();

        tracing::info!(
            received = report.received,
            total = report.total,
            kept_newer = report.kept_newer,
            kept_recent = report.kept_recent,
            removed = report.removed,
            rejected = report.rejected,
            "reconciler.snapshot.applied"
        );
        report
    }

    /// Record a failed fetch. The previous snapshot stays in place.
    pub fn record_fetch_failure(&self, error: &FetchError) {
        tracing::warn!(error = %error, "reconciler.fetch.failed");
        self.cache.borrow_mut().fetch_notice = Some(error.to_string());
    }

    // ------------------------------------------------------------------
    // Incremental merge
    // ------------------------------------------------------------------

    /// Last-writer-wins merge of one full record.
    ///
    /// An unknown id is inserted. A known id is replaced only when the
    /// incoming `updated_at` is strictly newer; an absent incoming time is
    /// accepted and the cached time is carried forward.
    pub fn merge_case(&self, mut case: FraudCase) -> MergeOutcome {
        let id = case.id;
        if let Err(e) = case.validate() {
            tracing::warn!(case_id = id, error = %e, "reconciler.merge.rejected");
            return MergeOutcome::Rejected { reason: e.to_string() };
        }

        let now = self.clock.now();
        let mut cache = self.cache.borrow_mut();

        if let Some(&owner) = cache.numbers.get(&case.case_number)
            && owner != id
        {
            tracing::warn!(
                case_id = id,
                owner,
                case_number = %case.case_number,
                "reconciler.merge.rejected"
            );
            return MergeOutcome::Rejected {
                reason: format!("case_number {} already belongs to case {owner}", case.case_number),
            };
        }

        let outcome = match cache.entries.get(&id) {
            None => MergeOutcome::Inserted,
            Some(cached) if supersedes(case.updated_at, cached.case.updated_at) => {
                if case.updated_at.is_none() {
                    case.updated_at = cached.case.updated_at;
                }
                MergeOutcome::Updated
            }
            Some(_) => MergeOutcome::Stale,
        };

        if outcome.is_applied() {
            let generation = self.next_generation();
            let number = case.case_number.clone();
            if let Some(replaced) = cache.entries.insert(id, Entry { case, generation })
                && replaced.case.case_number != number
            {
                cache.numbers.remove(&replaced.case.case_number);
            }
            cache.numbers.insert(number, id);
            tracing::debug!(case_id = id, ?outcome, "reconciler.merge.applied");
        } else {
            tracing::debug!(case_id = id, "reconciler.merge.stale");
        }
        cache.refold(now);
        outcome
    }

    /// Merge one decoded push event.
    ///
    /// A status change for an id that is not cached cannot be applied: the
    /// event carries no full record. Neither can a new-case summary; it is
    /// reported as [`MergeOutcome::Incomplete`] unless the id is already cached.
    pub fn apply_event(&self, event: &PushEvent) -> MergeOutcome {
        match &event.payload {
            EventPayload::NewCaseDetected(DetectedCase::Complete(case)) => self.merge_case(case.clone()),
            EventPayload::NewCaseDetected(DetectedCase::Summary(summary)) => {
                if self.snapshot().get(summary.id).is_some() {
                    tracing::debug!(case_id = summary.id, "reconciler.summary.known");
                    MergeOutcome::Stale
                } else {
                    tracing::debug!(
                        case_id = summary.id,
                        case_number = %summary.case_number,
                        "reconciler.summary.incomplete"
                    );
                    MergeOutcome::Incomplete
                }
            }
            EventPayload::CaseStatusChanged(change) => {
                let Some(mut case) = self.case(change.case_id) else {
                    tracing::warn!(case_id = change.case_id, "reconciler.event.unknown_case");
                    return MergeOutcome::UnknownCase;
                };
                case.status = change.new_status;
                case.updated_at = change.updated_at;
                self.merge_case(case)
            }
        }
    }

    /// Apply a status the backend has accepted.
    ///
    /// Stamps a fresh `updated_at` strictly newer than the cached one, so the
    /// write always wins over what is cached.
    pub fn apply_local_status(&self, case_id: CaseId, status: CaseStatus) -> MergeOutcome {
        let Some(mut case) = self.case(case_id) else {
            return MergeOutcome::UnknownCase;
        };
        let now = self.clock.now();
        let fresh = match case.updated_at {
            Some(previous) if previous >= now => previous + Duration::milliseconds(1),
            _ => now,
        };
        case.status = status;
        case.updated_at = Some(fresh);
        self.merge_case(case)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
