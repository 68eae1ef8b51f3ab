//! This crate provides tools for turning spike trains into labeled datasets in Rust.
//!
//! Spike trains are binned into a count matrix (one row per neuron, one column per bin).
//! Sliding windows over the matrix give fixed-size patterns, which are sampled per
//! behavioral label into balanced train and test sets.
//!
//! # Building a Rate Matrix
//!
//! ```rust
//! use rusty_nda::core::rate_matrix::RateMatrix;
//! use rusty_nda::core::source::SpikeTrains;
//!
//! let spikes = SpikeTrains::build(vec![
//!     ("S1_01a", vec![0.1, 0.3, 0.6, 0.99]),
//!     ("S1_02a", vec![0.2, 0.25]),
//! ])
//! .unwrap();
//!
//! let mut matrix = RateMatrix::from_spike_source(&spikes, 0.25).unwrap();
//! matrix.set_window_width(2).unwrap();
//!
//! assert_eq!(matrix.row(1).unwrap(), &[1, 1, 0, 0]);
//! assert_eq!(matrix.pattern_at_column(0, 2).unwrap(), vec![1.0, 1.0, 1.0, 1.0]);
//! ```
//!
//! # Sampling Datasets
//!
//! ```rust
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//! use rusty_nda::core::interval::Interval;
//! use rusty_nda::core::rate_matrix::RateMatrix;
//! use rusty_nda::core::source::{Contacts, SpikeTrains};
//! use rusty_nda::sampler::{ClassSpec, PatternSampler};
//! use rusty_nda::transform::with_neuron_drop;
//!
//! let spikes = SpikeTrains::build(vec![
//!     ("S1_01a", (0..100).map(|i| i as f64 * 0.1).collect()),
//!     ("S1_02a", (0..50).map(|i| i as f64 * 0.2).collect()),
//!     ("S1_03a", (0..20).map(|i| i as f64 * 0.5).collect()),
//! ])
//! .unwrap();
//! let contacts = Contacts::build(vec![
//!     ("ball", Interval::make(1.0, 3.0).unwrap()),
//!     ("food", Interval::make(5.0, 7.0).unwrap()),
//! ])
//! .unwrap();
//!
//! let mut rng = StdRng::seed_from_u64(42);
//! let matrix = RateMatrix::from_spike_source(&spikes, 0.25).unwrap();
//!
//! // drop a random neuron before sampling
//! let matrix = with_neuron_drop(&matrix, 1, &mut rng).unwrap();
//!
//! let classes = vec![
//!     ClassSpec::new("yes", vec!["ball"], 3, 2),
//!     ClassSpec::new("no", vec!["food"], 3, 2),
//! ];
//! let sampler = PatternSampler::new(&matrix, &contacts);
//! let (train, test) = sampler.sample_round("train", "test", &classes, &mut rng).unwrap();
//!
//! assert_eq!(train.dimension(), 2);
//! assert_eq!(train.len(), 6);
//! assert_eq!(test.len(), 4);
//! ```
//!
//! # Generating from a Setup
//!
//! See [`setup::GeneratorSetup`] for the setup format and [`generator::Generator`] to build
//! every dataset of a setup in parallel.
//!
//! # Behavior Statistics
//!
//! [`features`] samples firing rates, inter-spike intervals and pattern distances per
//! behavioral label.

pub mod core;
pub mod error;
pub mod features;
pub mod generator;
pub mod sampler;
pub mod setup;
pub mod transform;
pub mod utils;

/// The default bin size (in seconds) of a rate matrix.
pub const DEFAULT_BIN_SIZE: f64 = 0.250;
/// The default number of rate matrices kept in a generator cache.
pub const DEFAULT_CACHE_SIZE: usize = 32;
