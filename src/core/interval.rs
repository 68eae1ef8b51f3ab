//! Closed time intervals.
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::NDAError;

/// A closed time interval `[start, end]`.
///
/// An interval is valid iff `start <= end`. Operations such as [`Interval::intersection`]
/// may produce an invalid interval, which is then considered empty.
#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize)]
pub struct Interval {
    start: f64,
    end: f64,
}

impl Interval {
    /// The empty interval. It contains no time at all.
    pub const EMPTY: Interval = Interval {
        start: f64::NAN,
        end: f64::NAN,
    };

    /// The infinite interval. It contains every time.
    pub const INF: Interval = Interval {
        start: f64::NEG_INFINITY,
        end: f64::INFINITY,
    };

    /// Create the interval `[start, end]`.
    /// The function returns an error if the range is not valid.
    pub fn make(start: f64, end: f64) -> Result<Self, NDAError> {
        let interval = Interval { start, end };
        if interval.is_valid() {
            Ok(interval)
        } else {
            Err(NDAError::InvalidRange { start, end })
        }
    }

    /// Create the interval `[start, end]` without checking it.
    pub fn new_unchecked(start: f64, end: f64) -> Self {
        Interval { start, end }
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    pub fn is_valid(&self) -> bool {
        self.start <= self.end
    }

    pub fn is_empty(&self) -> bool {
        !self.is_valid()
    }

    /// Returns true if `start <= time <= end`.
    pub fn contains(&self, time: f64) -> bool {
        self.start <= time && time <= self.end
    }

    /// Returns true if `other` is a subset of this interval.
    /// An empty interval is never contained.
    pub fn contains_interval(&self, other: &Interval) -> bool {
        other.is_valid() && self.start <= other.start && other.end <= self.end
    }

    /// The largest interval contained in both intervals. The result may be empty.
    pub fn intersection(&self, other: &Interval) -> Interval {
        if self.is_empty() || other.is_empty() {
            return Interval::EMPTY;
        }
        Interval {
            start: self.start.max(other.start),
            end: self.end.min(other.end),
        }
    }

    /// The smallest interval containing both intervals.
    pub fn enclose(&self, other: &Interval) -> Interval {
        match (self.is_empty(), other.is_empty()) {
            (true, _) => *other,
            (_, true) => *self,
            _ => Interval {
                start: self.start.min(other.start),
                end: self.end.max(other.end),
            },
        }
    }

    pub fn shift(&self, offset: f64) -> Interval {
        Interval {
            start: self.start + offset,
            end: self.end + offset,
        }
    }

    /// Split the interval into `n` contiguous sub-intervals of equal duration.
    pub fn split(&self, n: usize) -> Vec<Interval> {
        if n == 0 || self.is_empty() {
            return vec![];
        }

        let step = self.duration() / n as f64;
        (0..n)
            .map(|i| {
                let start = if i == 0 {
                    self.start
                } else {
                    self.start + i as f64 * step
                };
                let end = if i == n - 1 {
                    self.end
                } else {
                    self.start + (i + 1) as f64 * step
                };
                Interval { start, end }
            })
            .collect()
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{:.3}, {:.3}]", self.start, self.end)
    }
}
