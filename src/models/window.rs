//! Time window model.
//!
//! Jobs occupy their technician during a half-open interval
//! `[start, end)`: the start instant is included, the end is not. Two jobs
//! that touch at a single instant (one ends at 10:00, the next starts at
//! 10:00) therefore do not overlap.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A time interval [start, end).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Interval start (inclusive).
    pub start: DateTime<Utc>,
    /// Interval end (exclusive).
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Creates a new time window.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Length of this window. Negative for an inverted window.
    #[inline]
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Whether `start < end`.
    #[inline]
    pub fn is_well_formed(&self) -> bool {
        self.start < self.end
    }

    /// Whether an instant falls within this window.
    #[inline]
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant < self.end
    }

    /// Whether two windows overlap.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Whether this window lies entirely inside the closed range `[start, end]`.
    pub fn is_within(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start >= start && self.end <= end
    }

    /// Length of the intersection with `other`, or `None` if they don't overlap.
    pub fn overlap_duration(&self, other: &Self) -> Option<Duration> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        if end > start {
            Some(end - start)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, hour, minute, 0).unwrap()
    }

    #[test]
    fn test_time_window() {
        let w = TimeWindow::new(at(9, 0), at(10, 0));
        assert_eq!(w.duration(), Duration::hours(1));
        assert!(w.is_well_formed());
        assert!(w.contains(at(9, 0)));
        assert!(w.contains(at(9, 59)));
        assert!(!w.contains(at(10, 0))); // exclusive end
        assert!(!w.contains(at(8, 30)));
    }

    #[test]
    fn test_time_window_overlap() {
        let a = TimeWindow::new(at(9, 0), at(10, 0));
        let b = TimeWindow::new(at(9, 30), at(10, 30));
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));

        let c = TimeWindow::new(at(10, 0), at(11, 0)); // touching but not overlapping
        assert!(!a.overlaps(&c));
        assert!(!c.overlaps(&a));

        let inner = TimeWindow::new(at(9, 15), at(9, 45));
        assert!(a.overlaps(&inner));
        assert!(inner.overlaps(&a));
    }

    #[test]
    fn test_is_within_closed_range() {
        let w = TimeWindow::new(at(11, 0), at(12, 0));
        assert!(w.is_within(at(11, 0), at(12, 0)));
        assert!(w.is_within(at(8, 0), at(17, 0)));
        assert!(!w.is_within(at(11, 30), at(17, 0)));
        assert!(!w.is_within(at(8, 0), at(11, 30)));
    }

    #[test]
    fn test_overlap_duration() {
        let a = TimeWindow::new(at(9, 0), at(11, 0));
        let b = TimeWindow::new(at(10, 0), at(12, 0));
        assert_eq!(a.overlap_duration(&b), Some(Duration::hours(1)));

        let c = TimeWindow::new(at(11, 0), at(12, 0));
        assert_eq!(a.overlap_duration(&c), None);
    }

    #[test]
    fn test_inverted_window() {
        let w = TimeWindow::new(at(10, 0), at(9, 0));
        assert!(!w.is_well_formed());
        assert!(w.duration() < Duration::zero());
    }
}
