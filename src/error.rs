//! Error module for the Rusty NDA library.
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The half of a sampling round a pattern (or a quota) belongs to.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Split {
    Train,
    Test,
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Split::Train => write!(f, "train"),
            Split::Test => write!(f, "test"),
        }
    }
}

/// Error types for the library.
#[derive(Error, Debug, PartialEq, Clone)]
pub enum NDAError {
    /// Error for invalid parameters, e.g., a non-positive bin size or a window wider than the matrix.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    /// Error for an interval, column or time that falls outside the matrix bounds.
    #[error("Out of range: {0}")]
    OutOfRange(String),
    /// Error for an interval whose start is after its end (or not a number).
    #[error("Invalid range: [{start}, {end}]")]
    InvalidRange { start: f64, end: f64 },
    /// Error for a label whose pattern pool can not satisfy its quota.
    #[error("Can't sample {required} {split} patterns from label {label} (it only has {available} patterns)")]
    InsufficientSamples {
        label: String,
        split: Split,
        required: usize,
        available: usize,
    },
    /// Error for a label that is unknown to the behavior source or to a pattern set.
    #[error("Unknown label: {0}")]
    UnknownLabel(String),
    /// Error for I/O operations.
    #[error("I/O error: {0}")]
    IOError(String),
}
