// Rust guideline compliant 2026-10-16

//! Metrics Aggregator -- folds a fraud-case collection into [`DashboardStats`].
//!
//! [`aggregate`] is a pure function: same collection and same `now` give the
//! same statistics, independent of iteration order. It keeps no accumulator
//! state between calls, so callers recompute from scratch after every merge.

use chrono::{DateTime, Duration, NaiveTime, Utc};
use domain::{CaseId, DashboardStats, FraudCase};

/// Number of case ids reported in [`DashboardStats::recent_cases`].
pub const RECENT_CASES_LEN: usize = 10;

/// Length of the trailing window behind [`DashboardStats::detection_rate_week`].
const WEEK_DAYS: i64 = 7;

/// Fold `cases` into dashboard statistics as of `now`.
///
/// "Today" is the current UTC day of `now`; the weekly window starts seven
/// days before the start of today. `recent_cases` orders by detection date,
/// newest first, ties broken by descending id.
#[must_use]
pub fn aggregate<'a, I>(cases: I, now: DateTime<Utc>) -> DashboardStats
where
    I: IntoIterator<Item = &'a FraudCase>,
{
    let today_start = now.date_naive().and_time(NaiveTime::MIN).and_utc();
    let week_start = today_start - Duration::days(WEEK_DAYS);

    let mut stats = DashboardStats::default();
    let mut amounts: Vec<(CaseId, f64)> = vec![];
    let mut by_detection: Vec<(DateTime<Utc>, CaseId)> = vec![];

    for case in cases {
        stats.total_cases += 1;
        *stats.cases_by_status.entry(case.status).or_insert(0) += 1;
        *stats.cases_by_severity.entry(case.severity).or_insert(0) += 1;
        *stats.cases_by_detector.entry(case.detector_type).or_insert(0) += 1;

        if let Some(amount) = case.amount {
            amounts.push((case.id, amount));
        }
        if case.detection_date >= today_start {
            stats.detection_rate_today += 1;
        }
        if case.detection_date >= week_start {
            stats.detection_rate_week += 1;
        }
        by_detection.push((case.detection_date, case.id));
    }

    // Float addition is not associative; summing in id order keeps the
    // result independent of the caller's iteration order.
    amounts.sort_unstable_by_key(|(id, _)| *id);
    stats.total_amount = amounts.iter().map(|(_, amount)| amount).sum();

    by_detection.sort_unstable_by(|a, b| b.cmp(a));
    stats.recent_cases = by_detection
        .into_iter()
        .take(RECENT_CASES_LEN)
        .map(|(_, id)| id)
        .collect();

    stats
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::{RECENT_CASES_LEN, aggregate};
    use chrono::{DateTime, Duration, TimeZone as _, Utc};
    use domain::{CaseStatus, DetectorType, FraudCase, Severity};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 10, 15, 0, 0).unwrap()
    }

    fn make_case(id: u64, status: CaseStatus, severity: Severity, amount: Option<f64>) -> FraudCase {
        FraudCase {
            id,
            case_number: format!("FRD-{id:05}"),
            detector_type: DetectorType::InvoiceAnomaly,
            severity,
            status,
            title: None,
            description: None,
            amount,
            confidence_score: None,
            client_code: None,
            client_name: None,
            detection_date: now() - Duration::days(30),
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn empty_collection_yields_zero_counts() {
        let cases: Vec<FraudCase> = vec![];
        let stats = aggregate(&cases, now());
        assert_eq!(stats.total_cases, 0);
        for status in CaseStatus::ALL {
            assert_eq!(stats.status_count(status), 0);
        }
        for severity in Severity::ALL {
            assert_eq!(stats.severity_count(severity), 0);
        }
        assert!(stats.recent_cases.is_empty());
        assert!(stats.total_amount.abs() < f64::EPSILON);
    }

    #[test]
    fn counts_per_status_and_severity() {
        let cases = vec![
            make_case(1, CaseStatus::Pending, Severity::Low, None),
            make_case(2, CaseStatus::Pending, Severity::High, None),
            make_case(3, CaseStatus::Confirmed, Severity::High, None),
            make_case(4, CaseStatus::Rejected, Severity::Critical, None),
        ];
        let stats = aggregate(&cases, now());
        assert_eq!(stats.total_cases, 4);
        assert_eq!(stats.pending_cases(), 2);
        assert_eq!(stats.confirmed_cases(), 1);
        assert_eq!(stats.rejected_cases(), 1);
        assert_eq!(stats.status_count(CaseStatus::Resolved), 0);
        assert_eq!(stats.severity_count(Severity::High), 2);
        assert_eq!(stats.severity_count(Severity::Medium), 0);
        assert_eq!(stats.cases_by_detector.get(&DetectorType::InvoiceAnomaly), Some(&4));
    }

    #[test]
    fn total_amount_skips_missing_amounts() {
        let cases = vec![
            make_case(1, CaseStatus::Pending, Severity::Low, Some(100.25)),
            make_case(2, CaseStatus::Pending, Severity::Low, None),
            make_case(3, CaseStatus::Pending, Severity::Low, Some(50.0)),
        ];
        let stats = aggregate(&cases, now());
        assert!((stats.total_amount - 150.25).abs() < 1e-9);
    }

    #[test]
    fn detection_rates_use_utc_day_and_trailing_week() {
        let mut today = make_case(1, CaseStatus::Pending, Severity::Low, None);
        today.detection_date = Utc.with_ymd_and_hms(2024, 5, 10, 0, 0, 0).unwrap();
        let mut yesterday = make_case(2, CaseStatus::Pending, Severity::Low, None);
        yesterday.detection_date = Utc.with_ymd_and_hms(2024, 5, 9, 23, 59, 59).unwrap();
        let mut week_edge = make_case(3, CaseStatus::Pending, Severity::Low, None);
        week_edge.detection_date = Utc.with_ymd_and_hms(2024, 5, 3, 0, 0, 0).unwrap();
        let old = make_case(4, CaseStatus::Pending, Severity::Low, None);

        let stats = aggregate(&[today, yesterday, week_edge, old], now());
        assert_eq!(stats.detection_rate_today, 1);
        assert_eq!(stats.detection_rate_week, 3);
    }

    #[test]
    fn recent_cases_newest_first_and_bounded() {
        let cases: Vec<FraudCase> = (1..=15)
            .map(|id| {
                let mut case = make_case(id, CaseStatus::Pending, Severity::Low, None);
                case.detection_date = now() - Duration::hours(i64::try_from(id).unwrap());
                case
            })
            .collect();
        let stats = aggregate(&cases, now());
        assert_eq!(stats.recent_cases.len(), RECENT_CASES_LEN);
        assert_eq!(stats.recent_cases[0], 1);
        assert_eq!(stats.recent_cases[RECENT_CASES_LEN - 1], 10);
    }

    #[test]
    fn aggregate_is_order_independent() {
        let mut cases: Vec<FraudCase> = (1..=20)
            .map(|id| {
                let status = CaseStatus::ALL[usize::try_from(id).unwrap() % CaseStatus::ALL.len()];
                #[expect(clippy::cast_precision_loss, reason = "small test ids")]
                let amount = Some(0.1 * id as f64);
                make_case(id, status, Severity::Medium, amount)
            })
            .collect();
        let forward = aggregate(&cases, now());
        cases.reverse();
        let reversed = aggregate(&cases, now());
        assert_eq!(forward, reversed);
    }

    #[test]
    fn aggregate_is_repeatable() {
        let cases = vec![
            make_case(1, CaseStatus::Investigating, Severity::Critical, Some(10.0)),
            make_case(2, CaseStatus::Resolved, Severity::Low, Some(5.5)),
        ];
        assert_eq!(aggregate(&cases, now()), aggregate(&cases, now()));
    }
}
