//! Monotonic timestamps supplied by the host page.
//!
//! The core never reads a clock itself; every time value comes in from the
//! host (`performance.now()` style) so a capture can be driven deterministically.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Monotonic host timestamp with microsecond resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp {
    micros: u64,
}

impl Timestamp {
    /// Time origin of the host page
    #[must_use]
    pub const fn zero() -> Self {
        Self { micros: 0 }
    }

    /// Create from whole milliseconds since the page's time origin
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self {
            micros: millis * 1_000,
        }
    }

    /// Create from microseconds since the page's time origin
    #[must_use]
    pub const fn from_micros(micros: u64) -> Self {
        Self { micros }
    }

    /// Milliseconds as a float, the unit the driver records checkpoints in
    #[must_use]
    pub fn as_millis_f64(&self) -> f64 {
        self.micros as f64 / 1_000.0
    }

    /// Microseconds since the time origin
    #[must_use]
    pub const fn as_micros(&self) -> u64 {
        self.micros
    }

    /// Add a duration, saturating at the maximum representable time
    #[must_use]
    pub fn saturating_add(&self, duration: Duration) -> Self {
        let add = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX);
        Self {
            micros: self.micros.saturating_add(add),
        }
    }

    /// Time elapsed since `earlier` (zero if `earlier` is later)
    #[must_use]
    pub fn duration_since(&self, earlier: Timestamp) -> Duration {
        Duration::from_micros(self.micros.saturating_sub(earlier.micros))
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::zero()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:03}ms", self.micros / 1_000, self.micros % 1_000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_millis() {
        let t = Timestamp::from_millis(16);
        assert_eq!(t.as_micros(), 16_000);
        assert!((t.as_millis_f64() - 16.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_saturating_add() {
        let t = Timestamp::from_millis(10).saturating_add(Duration::from_millis(5));
        assert_eq!(t, Timestamp::from_millis(15));

        let max = Timestamp::from_micros(u64::MAX).saturating_add(Duration::from_secs(1));
        assert_eq!(max.as_micros(), u64::MAX);
    }

    #[test]
    fn test_duration_since() {
        let a = Timestamp::from_millis(100);
        let b = Timestamp::from_millis(250);
        assert_eq!(b.duration_since(a), Duration::from_millis(150));
        assert_eq!(a.duration_since(b), Duration::ZERO);
    }

    #[test]
    fn test_display() {
        assert_eq!(Timestamp::from_micros(1_500).to_string(), "1.500ms");
    }
}
