//! Generator setup: the parameter choices and dataset descriptions of an experiment, and
//! their expansion into concrete datasets.
//!
//! A setup is written in JSON:
//!
//! ```json
//! {
//!     "name": "ge4",
//!     "seed": 7,
//!     "params": {
//!         "areas": ["S1", "HP, V1"],
//!         "bin_size": [0.25, 0.5],
//!         "window_width": 1,
//!         "surrogate": { "type": "col_swap", "pct": [0.1, 0.5] }
//!     },
//!     "datasets": [
//!         {
//!             "rounds": 5,
//!             "train_ratio": 0.8,
//!             "1_vs_n": { "labels": ["ball", "brush", "food"], "class_ratio": 1.0, "total_positives": 50 }
//!         }
//!     ]
//! }
//! ```
//!
//! Every combination of areas, bin size and window width is a parameter choice. For every
//! choice and every positive label of a `1_vs_n` description, the setup yields one dataset
//! opposing the positive label (class `yes`) to the other labels (class `no`), possibly
//! expanded into several perturbed sub-datasets.
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use itertools::{iproduct, Itertools};
use serde::{Deserialize, Serialize};

use crate::error::{NDAError, Split};
use crate::sampler::ClassSpec;
use crate::transform::Transform;
use crate::{DEFAULT_BIN_SIZE, DEFAULT_CACHE_SIZE};

/// A single value or a list of values.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T: Clone> OneOrMany<T> {
    pub fn to_vec(&self) -> Vec<T> {
        match self {
            OneOrMany::One(value) => vec![value.clone()],
            OneOrMany::Many(values) => values.clone(),
        }
    }
}

fn default_cache_size() -> usize {
    DEFAULT_CACHE_SIZE
}

fn default_bin_size() -> OneOrMany<f64> {
    OneOrMany::One(DEFAULT_BIN_SIZE)
}

fn default_window_width() -> OneOrMany<usize> {
    OneOrMany::One(1)
}

/// The surrogate block of the parameters: the surrogate type and the values it is run with.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct SurrogateSetup {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub pct: Vec<f64>,
    #[serde(default)]
    pub dist: Vec<f64>,
    #[serde(default)]
    pub t0: Vec<f64>,
}

impl SurrogateSetup {
    fn values<'a>(&self, values: &'a [f64], name: &str) -> Result<&'a [f64], NDAError> {
        if values.is_empty() {
            return Err(NDAError::InvalidConfiguration(format!(
                "surrogate {} needs at least one {} value",
                self.kind, name
            )));
        }
        Ok(values)
    }

    /// The transforms of the sub-datasets, with their name suffix. `num_neurons` is the number
    /// of neurons of the dataset, for the per-neuron surrogates.
    fn transforms(&self, num_neurons: usize) -> Result<Vec<(String, Option<Transform>)>, NDAError> {
        let per_neuron = |make: &dyn Fn(usize) -> Transform| {
            (0..=num_neurons)
                .map(|k| (format!("_s{}", k), (k > 0).then(|| make(k))))
                .collect_vec()
        };
        let per_value = |transforms: Vec<Transform>| {
            transforms
                .into_iter()
                .enumerate()
                .map(|(i, transform)| (format!("_s{}", i), Some(transform)))
                .collect_vec()
        };

        let transforms = match self.kind.as_str() {
            "uniform" => per_neuron(&|num_surrogates| Transform::Uniform { num_surrogates }),
            "poisson" => per_neuron(&|num_surrogates| Transform::Poisson { num_surrogates }),
            "neuron_swap" => {
                let pct = match self.values(&self.pct, "pct")? {
                    [pct] => *pct,
                    _ => {
                        return Err(NDAError::InvalidConfiguration(
                            "surrogate neuron_swap takes a single pct value".to_string(),
                        ))
                    }
                };
                per_neuron(&|num_surrogates| Transform::NeuronSwap {
                    num_surrogates,
                    pct,
                })
            }
            "col_swap" => per_value(
                self.values(&self.pct, "pct")?
                    .iter()
                    .map(|&pct| Transform::ColSwap { pct })
                    .collect(),
            ),
            "matrix_swap" => per_value(
                self.values(&self.pct, "pct")?
                    .iter()
                    .map(|&pct| Transform::MatrixSwap { pct })
                    .collect(),
            ),
            "contact_swap" => per_value(
                self.values(&self.pct, "pct")?
                    .iter()
                    .map(|&pct| Transform::ContactSwap { pct })
                    .collect(),
            ),
            "col_swap_d" => per_value(
                iproduct!(
                    self.values(&self.pct, "pct")?.iter(),
                    self.values(&self.dist, "dist")?.iter()
                )
                .map(|(&pct, &dist)| Transform::ColSwapD { pct, dist })
                .collect(),
            ),
            "uniform_d" => per_value(
                self.values(&self.dist, "dist")?
                    .iter()
                    .map(|&dist| Transform::UniformD { dist })
                    .collect(),
            ),
            "poisson_d" => per_value(
                self.values(&self.dist, "dist")?
                    .iter()
                    .map(|&dist| Transform::PoissonD { dist })
                    .collect(),
            ),
            "mean_d" => per_value(
                self.values(&self.dist, "dist")?
                    .iter()
                    .map(|&dist| Transform::MeanD { dist })
                    .collect(),
            ),
            "spike_jitter" => per_value(
                self.values(&self.dist, "dist")?
                    .iter()
                    .map(|&dist| Transform::SpikeJitter { dist })
                    .collect(),
            ),
            "contact_shift" => per_value(
                self.values(&self.t0, "t0")?
                    .iter()
                    .map(|&t0| Transform::ContactShift { t0 })
                    .collect(),
            ),
            kind => {
                return Err(NDAError::InvalidConfiguration(format!(
                    "unknown surrogate type: {}",
                    kind
                )))
            }
        };
        Ok(transforms)
    }
}

/// The parameters shared by every dataset of the setup.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct ParamSetup {
    pub areas: OneOrMany<String>,
    #[serde(default = "default_bin_size")]
    pub bin_size: OneOrMany<f64>,
    #[serde(default = "default_window_width")]
    pub window_width: OneOrMany<usize>,
    #[serde(default)]
    pub neuron_drop: bool,
    #[serde(default)]
    pub surrogate: Option<SurrogateSetup>,
}

/// One combination of the parameters.
#[derive(Debug, PartialEq, Clone)]
pub struct ParamChoice {
    pub id: usize,
    pub areas: String,
    pub bin_size: f64,
    pub window_width: usize,
}

/// A `1_vs_n` description: every label in turn against all the others.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct OneVsN {
    pub labels: Vec<String>,
    pub class_ratio: f64,
    pub total_positives: usize,
}

/// A dataset description of the setup.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct DatasetSetup {
    #[serde(default)]
    pub name: Option<String>,
    pub rounds: usize,
    pub train_ratio: f64,
    #[serde(rename = "1_vs_n")]
    pub one_vs_n: OneVsN,
}

/// A concrete dataset: one parameter choice, its classes and its perturbation.
#[derive(Debug, PartialEq, Clone)]
pub struct Dataset {
    pub name: String,
    pub param_id: usize,
    pub areas: String,
    pub bin_size: f64,
    pub window_width: usize,
    pub rounds: usize,
    pub classes: Vec<ClassSpec>,
    pub transform: Option<Transform>,
}

impl Dataset {
    /// The name of the dataset, suffixed with its parameter choice.
    pub fn full_name(&self) -> String {
        format!("{}_p{}", self.name, self.param_id)
    }

    /// The name of the given half of the given round (rounds start at 1).
    pub fn file_stem(&self, split: Split, round: usize) -> String {
        format!("{}_p{}_r{}_{}", self.name, self.param_id, round, split)
    }

    /// The names of every pattern set of the dataset, train before test, round after round.
    pub fn file_stems(&self) -> Vec<String> {
        (1..=self.rounds)
            .flat_map(|round| [Split::Train, Split::Test].map(|split| self.file_stem(split, round)))
            .collect()
    }
}

/// The setup of a dataset generation.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct GeneratorSetup {
    pub name: String,
    #[serde(default)]
    pub seed: u64,
    #[serde(default = "default_cache_size")]
    pub cache_size: usize,
    pub params: ParamSetup,
    pub datasets: Vec<DatasetSetup>,
}

impl GeneratorSetup {
    /// Parse a setup from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, NDAError> {
        serde_json::from_str(json).map_err(|e| NDAError::InvalidConfiguration(e.to_string()))
    }

    /// Load a setup from a JSON file.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, NDAError> {
        let file = File::open(path).map_err(|e| NDAError::IOError(e.to_string()))?;
        let reader = BufReader::new(file);
        serde_json::from_reader(reader).map_err(|e| NDAError::InvalidConfiguration(e.to_string()))
    }

    /// Every combination of areas, bin size and window width, areas varying slowest.
    /// Choice ids start at 1.
    pub fn parameter_choices(&self) -> Vec<ParamChoice> {
        iproduct!(
            self.params.areas.to_vec(),
            self.params.bin_size.to_vec(),
            self.params.window_width.to_vec()
        )
        .enumerate()
        .map(|(i, (areas, bin_size, window_width))| ParamChoice {
            id: i + 1,
            areas,
            bin_size,
            window_width,
        })
        .collect()
    }

    fn validate(&self) -> Result<(), NDAError> {
        if self.params.neuron_drop && self.params.surrogate.is_some() {
            return Err(NDAError::InvalidConfiguration(
                "can't do neuron dropping and surrogates".to_string(),
            ));
        }
        if self.params.bin_size.to_vec().iter().any(|&b| !(b > 0.0)) {
            return Err(NDAError::InvalidConfiguration(
                "bin sizes must be positive".to_string(),
            ));
        }
        if self.params.window_width.to_vec().contains(&0) {
            return Err(NDAError::InvalidConfiguration(
                "window widths must be positive".to_string(),
            ));
        }

        for dataset in self.datasets.iter() {
            if dataset.rounds == 0 {
                return Err(NDAError::InvalidConfiguration(
                    "a dataset needs at least one round".to_string(),
                ));
            }
            if !(0.0..=1.0).contains(&dataset.train_ratio) {
                return Err(NDAError::InvalidConfiguration(format!(
                    "train ratio must be in [0, 1], got {}",
                    dataset.train_ratio
                )));
            }
            if !(dataset.one_vs_n.class_ratio >= 0.0) {
                return Err(NDAError::InvalidConfiguration(format!(
                    "class ratio must be non-negative, got {}",
                    dataset.one_vs_n.class_ratio
                )));
            }
            if dataset.one_vs_n.labels.len() < 2 {
                return Err(NDAError::InvalidConfiguration(
                    "a 1_vs_n dataset needs at least two labels".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Expand the setup into concrete datasets.
    ///
    /// `neuron_count` returns the number of neurons selected by an area filter; it is used
    /// to expand neuron dropping and per-neuron surrogates.
    pub fn expand<F>(&self, neuron_count: F) -> Result<Vec<Dataset>, NDAError>
    where
        F: Fn(&str) -> usize,
    {
        self.validate()?;

        let mut datasets = vec![];
        for choice in self.parameter_choices() {
            let num_neurons = neuron_count(&choice.areas);
            let perturbations: Vec<(String, Option<Transform>)> = if self.params.neuron_drop {
                (0..num_neurons)
                    .map(|k| (format!("_d{}", k), (k > 0).then_some(Transform::NeuronDrop { num_drop: k })))
                    .collect()
            } else if let Some(surrogate) = &self.params.surrogate {
                surrogate.transforms(num_neurons)?
            } else {
                vec![(String::new(), None)]
            };

            if perturbations.is_empty() {
                log::warn!(
                    "No neuron matches the areas {} of parameter choice {}",
                    choice.areas,
                    choice.id
                );
            }

            for setup in self.datasets.iter() {
                for (name, classes) in setup.one_vs_n_classes(&self.name) {
                    for (suffix, transform) in perturbations.iter() {
                        datasets.push(Dataset {
                            name: format!("{}{}", name, suffix),
                            param_id: choice.id,
                            areas: choice.areas.clone(),
                            bin_size: choice.bin_size,
                            window_width: choice.window_width,
                            rounds: setup.rounds,
                            classes: classes.clone(),
                            transform: *transform,
                        });
                    }
                }
            }
        }

        log::info!("Setup {} expanded into {} datasets", self.name, datasets.len());
        Ok(datasets)
    }
}

impl DatasetSetup {
    /// The name and the classes of the dataset of every positive label.
    fn one_vs_n_classes(&self, setup_name: &str) -> Vec<(String, Vec<ClassSpec>)> {
        let base_name = self.name.as_deref().unwrap_or(setup_name);
        let one_vs_n = &self.one_vs_n;

        let pos_train = (one_vs_n.total_positives as f64 * self.train_ratio).floor() as usize;
        let pos_test = one_vs_n.total_positives - pos_train;
        let neg_train = (pos_train as f64 * one_vs_n.class_ratio).floor() as usize;
        let neg_test = (pos_test as f64 * one_vs_n.class_ratio).floor() as usize;

        one_vs_n
            .labels
            .iter()
            .map(|positive| {
                let negatives = one_vs_n
                    .labels
                    .iter()
                    .filter(|&label| label != positive)
                    .cloned()
                    .collect_vec();
                (
                    format!("{}_{}", base_name, positive),
                    vec![
                        ClassSpec::new("yes", vec![positive.clone()], pos_train, pos_test),
                        ClassSpec::new("no", negatives, neg_train, neg_test),
                    ],
                )
            })
            .collect()
    }
}
