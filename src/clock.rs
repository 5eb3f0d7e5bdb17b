//! Time sources for scheduling and queue building.
//!
//! Everything that needs "now" takes a [`Clock`] so sessions can be replayed
//! against a fixed instant in tests, or pushed forward by whole days from the CLI.

use chrono::{DateTime, Duration, TimeZone, Utc};

pub const MILLIS_PER_DAY: i64 = 86_400_000;

pub trait Clock {
    fn now(&self) -> DateTime<Utc>;

    /// Current time as epoch milliseconds, the unit scheduling state is stored in.
    fn now_millis(&self) -> i64 {
        self.now().timestamp_millis()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

/// Wall clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Always reports the same instant.
#[derive(Clone, Copy, Debug)]
pub struct FixedClock(DateTime<Utc>);

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(now)
    }

    /// Out-of-range values fall back to the epoch.
    pub fn from_millis(millis: i64) -> Self {
        Self(Utc.timestamp_millis_opt(millis).single().unwrap_or_default())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Wall clock shifted forward by a number of simulated days.
#[derive(Clone, Copy, Debug)]
pub struct OffsetClock<C = SystemClock> {
    inner: C,
    days: i64,
}

impl<C: Clock> OffsetClock<C> {
    pub fn new(inner: C, days: i64) -> Self {
        Self { inner, days }
    }
}

impl<C: Clock> Clock for OffsetClock<C> {
    fn now(&self) -> DateTime<Utc> {
        self.inner.now() + Duration::days(self.days)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock_millis() {
        let clock = FixedClock::from_millis(1_700_000_000_000);
        assert_eq!(clock.now_millis(), 1_700_000_000_000);
    }

    #[test]
    fn test_offset_clock_adds_days() {
        let base = FixedClock::from_millis(0);
        let clock = OffsetClock::new(base, 3);
        assert_eq!(clock.now_millis(), 3 * MILLIS_PER_DAY);
    }

    #[test]
    fn test_clock_by_reference() {
        let clock = FixedClock::from_millis(42);
        let by_ref: &dyn Clock = &clock;
        assert_eq!(by_ref.now_millis(), 42);
    }
}
