use chrono::{DateTime, Duration, NaiveDate, Utc};
use parking_lot::RwLock;
use std::sync::Arc;

use crate::domain::Clock;

/// Manually controlled clock for tests and replays.
///
/// Time only moves through [`FixedClock::set_time`] and [`FixedClock::advance`].
/// Clones share the same underlying time.
#[derive(Debug, Clone)]
pub struct FixedClock {
    inner: Arc<RwLock<DateTime<Utc>>>,
}

impl FixedClock {
    /// Create a clock frozen at a specific instant
    pub fn at(time: DateTime<Utc>) -> Self {
        FixedClock {
            inner: Arc::new(RwLock::new(time)),
        }
    }

    /// Create a clock frozen at noon UTC on `date`
    pub fn on(date: NaiveDate) -> Self {
        let noon = date
            .and_hms_opt(12, 0, 0)
            .map(|t| t.and_utc())
            .unwrap_or_else(Utc::now);
        Self::at(noon)
    }

    /// Create a clock frozen at the current instant
    pub fn now_frozen() -> Self {
        Self::at(Utc::now())
    }

    pub fn set_time(&self, time: DateTime<Utc>) {
        *self.inner.write() = time;
    }

    pub fn advance(&self, duration: Duration) {
        let mut time = self.inner.write();
        *time += duration;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.inner.read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frozen_until_advanced() {
        let day = NaiveDate::from_ymd_opt(2024, 2, 28).unwrap();
        let clock = FixedClock::on(day);
        assert_eq!(clock.today(), day);
        assert_eq!(clock.now(), clock.now());

        clock.advance(Duration::days(2));
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
    }

    #[test]
    fn test_clones_share_time() {
        let clock = FixedClock::on(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        let other = clock.clone();
        clock.advance(Duration::days(1));
        assert_eq!(other.today(), NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
    }
}
