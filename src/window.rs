use std::fmt;

use chrono::{NaiveDate, TimeDelta};

/// Half-open date range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Window {
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date < self.end
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// The current and previous windows for one interval length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowPair {
    pub current: Window,
    pub previous: Window,
}

impl WindowPair {
    /// Callers guarantee `interval_days > 0`. Starts that would fall before
    /// the earliest representable date clamp to `NaiveDate::MIN`.
    pub fn new(anchor: NaiveDate, interval_days: i64) -> Self {
        let current = Window {
            start: days_before(anchor, interval_days).unwrap_or(NaiveDate::MIN),
            end: anchor,
        };
        let previous = Window {
            start: days_before(current.start, interval_days).unwrap_or(NaiveDate::MIN),
            end: current.start,
        };
        Self { current, previous }
    }
}

fn days_before(date: NaiveDate, days: i64) -> Option<NaiveDate> {
    TimeDelta::try_days(days).and_then(|delta| date.checked_sub_signed(delta))
}

/// Latest date on or before which a client needs a record to be eligible.
///
/// `None` when that date is not representable, in which case nobody qualifies.
pub fn eligibility_cutoff(anchor: NaiveDate, interval_days: i64) -> Option<NaiveDate> {
    interval_days
        .checked_mul(2)
        .and_then(|days| days_before(anchor, days))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn windows_are_contiguous_and_disjoint() {
        let anchor = day(2024, 3, 31);
        for interval in [1, 7, 30, 60, 90, 365] {
            let pair = WindowPair::new(anchor, interval);
            assert_eq!(pair.previous.end, pair.current.start);
            assert_eq!(pair.current.end, anchor);
            assert_eq!((pair.current.end - pair.current.start).num_days(), interval);
            assert_eq!((pair.previous.end - pair.previous.start).num_days(), interval);
            assert!(!pair.previous.contains(pair.current.start));
        }
    }

    #[test]
    fn window_is_half_open() {
        let pair = WindowPair::new(day(2024, 1, 31), 30);
        assert_eq!(pair.current.start, day(2024, 1, 1));
        assert!(pair.current.contains(day(2024, 1, 1)));
        assert!(pair.current.contains(day(2024, 1, 30)));
        assert!(!pair.current.contains(day(2024, 1, 31)));
        assert!(pair.previous.contains(day(2023, 12, 2)));
        assert!(!pair.previous.contains(day(2023, 12, 1)));
    }

    #[test]
    fn cutoff_is_two_intervals_back() {
        assert_eq!(eligibility_cutoff(day(2024, 3, 1), 30), Some(day(2024, 1, 1)));
    }

    #[test]
    fn huge_intervals_clamp_instead_of_overflowing() {
        let anchor = day(2024, 6, 30);
        for interval in [100_000_000, i64::MAX / 2 + 1, i64::MAX] {
            assert_eq!(eligibility_cutoff(anchor, interval), None);

            let pair = WindowPair::new(anchor, interval);
            assert_eq!(pair.current.start, NaiveDate::MIN);
            assert_eq!(pair.current.end, anchor);
            assert_eq!(pair.previous.end, pair.current.start);
            assert!(!pair.previous.contains(NaiveDate::MIN));
        }
    }
}
