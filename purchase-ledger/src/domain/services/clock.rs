use chrono::{DateTime, NaiveDate, Utc};

/// Source of "now" for the ledger.
///
/// The rate resolver decides between the provisional (today) path and the
/// cached historical path using [`Clock::today`], so tests inject a fixed clock.
pub trait Clock: Send + Sync {
    /// Current instant
    fn now(&self) -> DateTime<Utc>;

    /// Current processing day (UTC)
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}
