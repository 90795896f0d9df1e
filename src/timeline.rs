//! Time intervals shared by captions and background segments.

use serde::{Deserialize, Serialize};

/// A span of the narration timeline, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeInterval {
    /// Start time in seconds.
    pub start: f64,
    /// End time in seconds.
    pub end: f64,
}

impl TimeInterval {
    /// Create a new interval.
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// Build an interval from millisecond offsets.
    pub fn from_millis(start_ms: f64, end_ms: f64) -> Self {
        Self::new(start_ms / 1000.0, end_ms / 1000.0)
    }

    /// Duration of this interval in seconds.
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Zero-width interval (start == end).
    pub fn is_degenerate(&self) -> bool {
        self.start == self.end
    }

    /// Finite, non-negative bounds with `start <= end`.
    pub fn is_well_formed(&self) -> bool {
        self.start.is_finite() && self.end.is_finite() && self.start >= 0.0 && self.start <= self.end
    }

    /// Smallest interval covering both.
    pub fn hull(&self, other: &TimeInterval) -> TimeInterval {
        TimeInterval::new(self.start.min(other.start), self.end.max(other.end))
    }
}

impl std::fmt::Display for TimeInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:.3}s - {:.3}s]", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_millis() {
        let interval = TimeInterval::from_millis(1200.0, 2600.0);
        assert_eq!(interval.start, 1.2);
        assert_eq!(interval.end, 2.6);
        assert!((interval.duration() - 1.4).abs() < 1e-9);
    }

    #[test]
    fn test_well_formed() {
        assert!(TimeInterval::new(0.0, 0.0).is_well_formed());
        assert!(TimeInterval::new(1.0, 2.0).is_well_formed());
        assert!(!TimeInterval::new(2.0, 1.0).is_well_formed());
        assert!(!TimeInterval::new(-1.0, 1.0).is_well_formed());
        assert!(!TimeInterval::new(f64::NAN, 1.0).is_well_formed());
        assert!(!TimeInterval::new(0.0, f64::INFINITY).is_well_formed());
    }

    #[test]
    fn test_degenerate() {
        assert!(TimeInterval::new(3.0, 3.0).is_degenerate());
        assert!(!TimeInterval::new(3.0, 3.5).is_degenerate());
    }

    #[test]
    fn test_hull() {
        let a = TimeInterval::new(2.0, 5.0);
        let b = TimeInterval::new(0.0, 3.0);
        assert_eq!(a.hull(&b), TimeInterval::new(0.0, 5.0));
    }
}
