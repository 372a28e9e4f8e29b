//! Wall-clock time source for the state engine.
//!
//! The engine never calls `Utc::now()` directly. Everything time-dependent
//! (the daily reset, battle start stamps, battle deadlines) reads a
//! [`Clock`], so tests can pin and advance time deterministically.
//!
//! # Calendar days
//!
//! `today()` is the calendar date at a fixed UTC offset. The default offset
//! is zero, i.e. days roll over at midnight UTC. Hosts that want the
//! user's local midnight configure `session.utc_offset_minutes`.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, TimeDelta, Utc};

/// A source of the current instant and calendar date.
pub trait Clock {
    /// The current instant.
    fn now(&self) -> DateTime<Utc>;

    /// The current calendar date.
    fn today(&self) -> NaiveDate;
}

/// The real system clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemClock {
    offset: FixedOffset,
}

impl SystemClock {
    /// A system clock whose days roll over at midnight UTC.
    pub fn utc() -> Self {
        Self { offset: Utc.fix() }
    }

    /// A system clock whose days roll over at midnight of the given offset.
    ///
    /// Offsets outside +/- 24 hours fall back to UTC.
    pub fn with_offset_minutes(minutes: i32) -> Self {
        let offset = minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| Utc.fix());
        Self { offset }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::utc()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.offset).date_naive()
    }
}

/// A manually driven clock for tests and replays.
///
/// Clones share the same underlying instant, so a test can hand one clone
/// to a session and keep another to advance time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    /// Create a clock frozen at `now`.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(now)),
        }
    }

    /// Create a clock frozen at noon UTC on the given date.
    ///
    /// Falls back to midnight if noon cannot be represented.
    pub fn at_date(date: NaiveDate) -> Self {
        let noon = date
            .and_hms_opt(12, 0, 0)
            .unwrap_or_else(|| date.and_time(chrono::NaiveTime::MIN));
        Self::new(noon.and_utc())
    }

    /// Jump to an absolute instant.
    pub fn set(&self, now: DateTime<Utc>) {
        match self.now.lock() {
            Ok(mut guard) => *guard = now,
            Err(poisoned) => *poisoned.into_inner() = now,
        }
    }

    /// Move the clock forward (or backward, for a negative delta).
    ///
    /// Saturates at the representable range instead of overflowing.
    pub fn advance(&self, delta: TimeDelta) {
        let current = self.now();
        let next = current.checked_add_signed(delta).unwrap_or(current);
        self.set(next);
    }

    /// Move the clock forward by whole milliseconds.
    pub fn advance_ms(&self, ms: i64) {
        self.advance(TimeDelta::milliseconds(ms));
    }

    /// Move the clock forward by whole calendar days.
    pub fn advance_days(&self, days: i64) {
        self.advance(TimeDelta::days(days));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        match self.now.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }

    fn today(&self) -> NaiveDate {
        (**self).today()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn manual_clock_starts_at_noon() {
        let clock = ManualClock::at_date(date(2026, 5, 4));
        assert_eq!(clock.today(), date(2026, 5, 4));
        assert_eq!(clock.now().to_rfc3339(), "2026-05-04T12:00:00+00:00");
    }

    #[test]
    fn clones_share_time() {
        let clock = ManualClock::at_date(date(2026, 5, 4));
        let handle = clock.clone();
        handle.advance_days(1);
        assert_eq!(clock.today(), date(2026, 5, 5));
    }

    #[test]
    fn advance_ms_moves_the_instant() {
        let clock = ManualClock::at_date(date(2026, 5, 4));
        let before = clock.now();
        clock.advance_ms(3_600_001);
        assert_eq!((clock.now() - before).num_milliseconds(), 3_600_001);
    }

    #[test]
    fn out_of_range_offset_falls_back_to_utc() {
        let clock = SystemClock::with_offset_minutes(60 * 48);
        assert_eq!(clock, SystemClock::utc());
    }

    #[test]
    fn positive_offset_is_kept() {
        let clock = SystemClock::with_offset_minutes(120);
        assert_ne!(clock, SystemClock::utc());
    }
}
