//! Quota-based random sampling of train and test patterns from a rate matrix.
//!
//! For every class of a round, the columns of the matrix lying in the behavioral intervals of
//! each label of the class form the label pool. The class quotas are spread evenly across its
//! labels (the residual going to a random subset of labels) and every label draws its share of
//! train and test columns from its pool, without replacement.
//!
//! # Examples
//!
//! ```rust
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//! use rusty_nda::core::interval::Interval;
//! use rusty_nda::core::rate_matrix::RateMatrix;
//! use rusty_nda::core::source::Contacts;
//! use rusty_nda::sampler::{ClassSpec, PatternSampler};
//!
//! let names = vec!["n1".to_string(), "n2".to_string()];
//! let rows = vec![(0..40).collect(), (0..40).rev().collect()];
//! let matrix = RateMatrix::from_rows(names, rows, Interval::make(0.0, 10.0).unwrap(), 0.25).unwrap();
//! let contacts = Contacts::build(vec![
//!     ("ball", Interval::make(1.0, 3.0).unwrap()),
//!     ("food", Interval::make(6.0, 8.0).unwrap()),
//! ])
//! .unwrap();
//!
//! let classes = vec![
//!     ClassSpec::new("yes", vec!["ball"], 4, 2),
//!     ClassSpec::new("no", vec!["food"], 4, 2),
//! ];
//!
//! let mut rng = StdRng::seed_from_u64(42);
//! let sampler = PatternSampler::new(&matrix, &contacts);
//! let (train, test) = sampler.sample_round("train", "test", &classes, &mut rng).unwrap();
//!
//! assert_eq!(train.len(), 8);
//! assert_eq!(test.len(), 4);
//! assert_eq!(train.patterns_for("yes").count(), 4);
//! ```
use itertools::Itertools;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::interval::Interval;
use crate::core::pattern_set::PatternSet;
use crate::core::rate_matrix::RateMatrix;
use crate::core::source::BehaviorSource;
use crate::error::{NDAError, Split};
use crate::utils::random_n_sample;

/// A class of a dataset: the labels it gathers and the number of patterns to sample for it.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct ClassSpec {
    pub name: String,
    pub labels: Vec<String>,
    pub train_quota: usize,
    pub test_quota: usize,
}

impl ClassSpec {
    pub fn new<S: Into<String>>(name: &str, labels: Vec<S>, train_quota: usize, test_quota: usize) -> Self {
        ClassSpec {
            name: name.to_string(),
            labels: labels.into_iter().map(Into::into).collect(),
            train_quota,
            test_quota,
        }
    }
}

/// The starting columns of the patterns available for a label.
#[derive(Debug, PartialEq, Clone)]
pub struct IndexPool {
    pub label: String,
    pub columns: Vec<usize>,
}

impl IndexPool {
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Spread `total` over `num_labels` labels: every label gets `total / num_labels` and a
/// random subset of `total % num_labels` labels gets one more.
pub fn partition_quota<R: Rng + ?Sized>(
    total: usize,
    num_labels: usize,
    rng: &mut R,
) -> Result<Vec<usize>, NDAError> {
    if num_labels == 0 {
        return Err(NDAError::InvalidConfiguration(
            "can't spread a quota over zero labels".to_string(),
        ));
    }

    let mut quotas = vec![total / num_labels; num_labels];
    for label in random_n_sample(num_labels, total % num_labels, rng)? {
        quotas[label] += 1;
    }
    Ok(quotas)
}

/// Draw `train + test` distinct indices in `0..n`; the first `train` drawn are the train
/// indices and the others the test indices. Both are returned sorted.
///
/// The function returns an error naming the unmet split if `n` is too small. The label of
/// the error is left empty for the caller to fill.
pub fn sample_train_test<R: Rng + ?Sized>(
    n: usize,
    train: usize,
    test: usize,
    rng: &mut R,
) -> Result<(Vec<usize>, Vec<usize>), NDAError> {
    if train + test > n {
        let (split, required) = if train > n {
            (Split::Train, train)
        } else {
            (Split::Test, test)
        };
        return Err(NDAError::InsufficientSamples {
            label: String::new(),
            split,
            required,
            available: n,
        });
    }

    let mut drawn = random_n_sample(n, train + test, rng)?;
    let mut test_indices = drawn.split_off(train);
    drawn.sort_unstable();
    test_indices.sort_unstable();
    Ok((drawn, test_indices))
}

/// Samples labeled patterns from a rate matrix according to a behavior source.
pub struct PatternSampler<'a, B: BehaviorSource + ?Sized> {
    matrix: &'a RateMatrix,
    behavior: &'a B,
}

impl<'a, B: BehaviorSource + ?Sized> PatternSampler<'a, B> {
    pub fn new(matrix: &'a RateMatrix, behavior: &'a B) -> Self {
        PatternSampler { matrix, behavior }
    }

    /// The starting columns of every pattern lying in an interval of `label`, in interval
    /// order. Every interval is widened by one bin on each side before being matched against
    /// the bin grid, so a column straddling a contact boundary is kept.
    pub fn pattern_indices(&self, label: &str) -> Result<Vec<usize>, NDAError> {
        let intervals = self
            .behavior
            .intervals_for(label)
            .ok_or_else(|| NDAError::UnknownLabel(label.to_string()))?;

        let bin_size = self.matrix.bin_size();
        Ok(intervals
            .iter()
            .flat_map(|interval| {
                let widened =
                    Interval::new_unchecked(interval.start() - bin_size, interval.end() + bin_size);
                self.matrix.pattern_columns(&widened)
            })
            .collect())
    }

    /// The index pool of every label of the class, in label order.
    pub fn class_pool(&self, class: &ClassSpec) -> Result<Vec<IndexPool>, NDAError> {
        class
            .labels
            .iter()
            .map(|label| {
                Ok(IndexPool {
                    label: label.clone(),
                    columns: self.pattern_indices(label)?,
                })
            })
            .collect()
    }

    /// Sample the train and test patterns of a class, tagged with the class name.
    ///
    /// Either every label of the class meets its quotas and all patterns are returned, or
    /// the function returns an error and nothing is sampled.
    pub fn sample_class<R: Rng + ?Sized>(
        &self,
        class: &ClassSpec,
        rng: &mut R,
    ) -> Result<(Vec<Vec<f64>>, Vec<Vec<f64>>), NDAError> {
        if class.labels.is_empty() {
            return Err(NDAError::InvalidConfiguration(format!(
                "class {} has no label",
                class.name
            )));
        }

        let pools = self.class_pool(class)?;
        let train_quotas = partition_quota(class.train_quota, pools.len(), rng)?;
        let test_quotas = partition_quota(class.test_quota, pools.len(), rng)?;

        log::debug!(
            "Class {}: train quotas {:?}, test quotas {:?}, pool sizes {:?}",
            class.name,
            train_quotas,
            test_quotas,
            pools.iter().map(IndexPool::len).collect_vec()
        );

        let mut selections = Vec::with_capacity(pools.len());
        for ((pool, &train), &test) in pools.iter().zip(&train_quotas).zip(&test_quotas) {
            let (train_indices, test_indices) = sample_train_test(pool.len(), train, test, rng)
                .map_err(|e| match e {
                    NDAError::InsufficientSamples {
                        split,
                        required,
                        available,
                        ..
                    } => NDAError::InsufficientSamples {
                        label: pool.label.clone(),
                        split,
                        required,
                        available,
                    },
                    e => e,
                })?;
            selections.push((pool, train_indices, test_indices));
        }

        let width = self.matrix.window_width();
        let mut train_patterns = Vec::with_capacity(class.train_quota);
        let mut test_patterns = Vec::with_capacity(class.test_quota);
        for (pool, train_indices, test_indices) in selections {
            for i in train_indices {
                train_patterns.push(self.matrix.pattern_at_column(pool.columns[i], width)?);
            }
            for i in test_indices {
                test_patterns.push(self.matrix.pattern_at_column(pool.columns[i], width)?);
            }
        }

        Ok((train_patterns, test_patterns))
    }

    /// Sample one round: a train and a test pattern set with every class of `classes`.
    pub fn sample_round<R: Rng + ?Sized>(
        &self,
        train_name: &str,
        test_name: &str,
        classes: &[ClassSpec],
        rng: &mut R,
    ) -> Result<(PatternSet, PatternSet), NDAError> {
        let class_names = classes.iter().map(|class| class.name.as_str()).collect_vec();
        let names = self.matrix.neuron_names();
        let width = self.matrix.window_width();

        let mut train_set = PatternSet::for_matrix(train_name, names, width, class_names.clone());
        let mut test_set = PatternSet::for_matrix(test_name, names, width, class_names);

        for class in classes {
            let (train_patterns, test_patterns) = self.sample_class(class, rng)?;
            train_set.add_patterns(train_patterns, &class.name)?;
            test_set.add_patterns(test_patterns, &class.name)?;
        }

        Ok((train_set, test_set))
    }
}
