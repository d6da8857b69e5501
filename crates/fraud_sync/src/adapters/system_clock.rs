// Rust guideline compliant 2026-10-16

//! Wall-clock adapter for the `Clock` port.

use chrono::{DateTime, Utc};
use domain::Clock;

/// `Clock` adapter reading the system time in UTC.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
