//! Core type definitions for telemdb.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier for a channel (a single stream of telemetry).
///
/// Channel keys are stable and assigned when channels are created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChannelKey(pub u32);

impl ChannelKey {
    /// Creates a new channel key.
    #[must_use]
    pub const fn new(key: u32) -> Self {
        Self(key)
    }

    /// Returns the raw key value.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ch:{}", self.0)
    }
}

/// A point in time, in nanoseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeStamp(pub i64);

impl TimeStamp {
    /// The smallest representable timestamp.
    pub const MIN: Self = Self(i64::MIN);
    /// The largest representable timestamp.
    pub const MAX: Self = Self(i64::MAX);
    /// The Unix epoch.
    pub const ZERO: Self = Self(0);

    /// Nanoseconds in one second.
    pub const SECOND: i64 = 1_000_000_000;

    /// Creates a timestamp from raw nanoseconds.
    #[must_use]
    pub const fn new(nanos: i64) -> Self {
        Self(nanos)
    }

    /// Creates a timestamp from whole seconds.
    #[must_use]
    pub const fn from_seconds(seconds: i64) -> Self {
        Self(seconds.saturating_mul(Self::SECOND))
    }

    /// Returns the raw nanosecond value.
    #[must_use]
    pub const fn as_nanos(self) -> i64 {
        self.0
    }

    /// Returns the half-open range `[self, end)`.
    #[must_use]
    pub const fn range(self, end: TimeStamp) -> TimeRange {
        TimeRange::new(self, end)
    }
}

impl fmt::Display for TimeStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ns", self.0)
    }
}

/// A half-open interval of time, `[start, end)`.
///
/// A range whose start equals its end is a point range; it still occupies
/// the single instant `start` for overlap purposes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    /// Inclusive lower bound.
    pub start: TimeStamp,
    /// Exclusive upper bound.
    pub end: TimeStamp,
}

impl TimeRange {
    /// The range covering every representable timestamp.
    pub const MAX: Self = Self::new(TimeStamp::MIN, TimeStamp::MAX);
    /// The zero range; never a valid control range.
    pub const ZERO: Self = Self::new(TimeStamp::ZERO, TimeStamp::ZERO);

    /// Creates a new range.
    #[must_use]
    pub const fn new(start: TimeStamp, end: TimeStamp) -> Self {
        Self { start, end }
    }

    /// Creates a range from whole seconds.
    #[must_use]
    pub const fn from_seconds(start: i64, end: i64) -> Self {
        Self::new(TimeStamp::from_seconds(start), TimeStamp::from_seconds(end))
    }

    /// Returns true if both bounds are zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    /// Returns true if the range covers a single instant.
    #[must_use]
    pub fn is_point(&self) -> bool {
        self.start == self.end
    }

    /// Returns true if the start does not come after the end.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.start <= self.end
    }

    /// Returns true if `ts` falls inside the range.
    #[must_use]
    pub fn contains(&self, ts: TimeStamp) -> bool {
        if self.is_point() {
            return ts == self.start;
        }
        ts >= self.start && ts < self.end
    }

    /// Returns true if the two ranges share at least one instant.
    ///
    /// Ranges that merely touch (`[0, 5)` and `[5, 10)`) do not overlap.
    #[must_use]
    pub fn overlaps_with(&self, other: TimeRange) -> bool {
        match (self.is_point(), other.is_point()) {
            (true, true) => self.start == other.start,
            (true, false) => other.contains(self.start),
            (false, true) => self.contains(other.start),
            (false, false) => self.start < other.end && other.start < self.end,
        }
    }

    /// Returns the smallest range covering both ranges.
    #[must_use]
    pub fn union(&self, other: TimeRange) -> TimeRange {
        TimeRange::new(self.start.min(other.start), self.end.max(other.end))
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}
