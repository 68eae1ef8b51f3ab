//! Core module defining the data structures of the Rusty NDA library.
//!
//! It consists of the following components:
//!
//! - [`interval`]: closed time intervals
//! - [`histogram`]: binning of sorted event times
//! - [`source`]: spike and behavior sources, with in-memory implementations
//! - [`rate_matrix`]: the neurons × bins count matrix and its pattern addressing
//! - [`pattern_set`]: labeled pattern tables produced by the sampler
//!
//! # Examples
//!
//! ```
//! use rusty_nda::core::interval::Interval;
//! use rusty_nda::core::rate_matrix::RateMatrix;
//! use rusty_nda::core::source::{BehaviorSource, Contacts, SpikeTrains};
//!
//! let spikes = SpikeTrains::build(vec![("n1", vec![0.1, 0.3, 0.6, 1.9]), ("n2", vec![0.2, 1.25])]).unwrap();
//! let contacts = Contacts::build(vec![("ball", Interval::make(1.0, 2.0).unwrap())]).unwrap();
//!
//! let matrix = RateMatrix::from_spike_source(&spikes, 0.5).unwrap();
//! assert_eq!(matrix.num_columns(), 4);
//!
//! // number of single-column windows during the contact with the ball
//! let contact = contacts.intervals_for("ball").unwrap()[0];
//! assert_eq!(matrix.num_patterns(&contact), 2);
//! ```
pub mod histogram;
pub mod interval;
pub mod pattern_set;
pub mod rate_matrix;
pub mod source;

/// Minimum number of neurons to consider parallel binning.
pub const MIN_NEURONS_PAR: usize = 100;
