//! Per-label statistics of the neural activity during each behavioral interval.
//!
//! Every sampler returns a map from label (or label pair) to the list of values observed
//! while the animal was engaged in that behavior. Contacts falling outside the recording
//! are skipped, so a label may map to an empty list.
use std::collections::BTreeMap;
use std::str::FromStr;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::core::interval::Interval;
use crate::core::rate_matrix::RateMatrix;
use crate::core::source::{BehaviorSource, SpikeSource};
use crate::error::NDAError;

/// The key of a feature computed over the whole population.
pub const POPULATION_KEY: &str = "*";

/// A feature extracted by [`extract_features`].
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    /// Spike count of one neuron in every bin of every contact.
    FiringRate,
    /// Mean spike count of the population in every bin of every contact.
    PopulationFiringRate,
    /// Time between consecutive spikes of one neuron within a contact.
    Isi,
}

impl FromStr for Feature {
    type Err = NDAError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "firing_rate" => Ok(Feature::FiringRate),
            "population_firing_rate" => Ok(Feature::PopulationFiringRate),
            "isi" => Ok(Feature::Isi),
            _ => Err(NDAError::InvalidConfiguration(format!("unknown feature: {}", s))),
        }
    }
}

fn intervals_of<'a, B: BehaviorSource>(
    behavior: &'a B,
    label: &str,
) -> Result<&'a [Interval], NDAError> {
    behavior
        .intervals_for(label)
        .ok_or_else(|| NDAError::UnknownLabel(label.to_string()))
}

/// The matrix columns covered by each contact of `label`, clipped to the matrix interval.
fn contact_bins<'a, B: BehaviorSource>(
    matrix: &'a RateMatrix,
    behavior: &'a B,
    label: &str,
) -> Result<impl Iterator<Item = usize> + 'a, NDAError> {
    let intervals = intervals_of(behavior, label)?;
    Ok(intervals
        .iter()
        .map(move |interval| interval.intersection(&matrix.interval()))
        .filter(|interval| !interval.is_empty())
        .filter_map(move |interval| {
            match (
                matrix.bin_for_time(interval.start()),
                matrix.bin_for_time(interval.end()),
            ) {
                (Some(start_bin), Some(end_bin)) => Some(start_bin..=end_bin),
                _ => None,
            }
        })
        .flatten())
}

/// The spike count of `neuron` in every bin covered by a contact, per label.
pub fn firing_rate_samples<B: BehaviorSource>(
    matrix: &RateMatrix,
    behavior: &B,
    labels: &[String],
    neuron: &str,
) -> Result<BTreeMap<String, Vec<f64>>, NDAError> {
    let row = matrix
        .row_by_name(neuron)
        .ok_or_else(|| NDAError::UnknownLabel(neuron.to_string()))?;

    labels
        .iter()
        .map(|label| {
            let samples: Vec<f64> = contact_bins(matrix, behavior, label)?
                .map(|bin| row[bin] as f64)
                .collect();
            Ok((label.clone(), samples))
        })
        .collect()
}

/// The mean spike count over every neuron in every bin covered by a contact, per label.
pub fn population_firing_rate_samples<B: BehaviorSource>(
    matrix: &RateMatrix,
    behavior: &B,
    labels: &[String],
) -> Result<BTreeMap<String, Vec<f64>>, NDAError> {
    if matrix.num_rows() == 0 {
        return Err(NDAError::InvalidConfiguration(
            "the population firing rate needs at least one neuron".to_string(),
        ));
    }

    labels
        .iter()
        .map(|label| {
            let samples: Vec<f64> = contact_bins(matrix, behavior, label)?
                .filter_map(|bin| matrix.column(bin))
                .map(|column| {
                    column.iter().map(|&count| count as f64).sum::<f64>() / column.len() as f64
                })
                .collect();
            Ok((label.clone(), samples))
        })
        .collect()
}

/// The inter-spike intervals of `neuron` within each contact, per label.
/// Spikes of different contacts are never paired.
pub fn inter_spike_interval_samples<S: SpikeSource, B: BehaviorSource>(
    spikes: &S,
    behavior: &B,
    labels: &[String],
    neuron: &str,
) -> Result<BTreeMap<String, Vec<f64>>, NDAError> {
    let times = spikes
        .spike_times_for(neuron)
        .ok_or_else(|| NDAError::UnknownLabel(neuron.to_string()))?;

    labels
        .iter()
        .map(|label| {
            let mut samples: Vec<f64> = vec![];
            for interval in intervals_of(behavior, label)? {
                let first = times.partition_point(|&time| time < interval.start());
                let last = times.partition_point(|&time| time <= interval.end());
                if first < last {
                    samples.extend(times[first..last].windows(2).map(|pair| pair[1] - pair[0]));
                }
            }
            Ok((label.clone(), samples))
        })
        .collect()
}

fn euclidean_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

/// The Euclidean distances between the patterns of every pair of labels, keyed `"{a}_{b}"`
/// with `a` preceding or equal to `b` in `labels`.
///
/// Patterns of a label are the sliding windows (of the matrix window width) inside each of its
/// contacts. Two different labels compare every pattern of one against every pattern of the
/// other; a label compared with itself uses each unordered pair of distinct patterns once.
pub fn pattern_distances_samples<B: BehaviorSource>(
    matrix: &RateMatrix,
    behavior: &B,
    labels: &[String],
) -> Result<BTreeMap<String, Vec<f64>>, NDAError> {
    let patterns = labels
        .iter()
        .map(|label| {
            Ok(intervals_of(behavior, label)?
                .iter()
                .flat_map(|interval| matrix.patterns_in(interval))
                .collect::<Vec<_>>())
        })
        .collect::<Result<Vec<_>, NDAError>>()?;

    let mut samples = BTreeMap::new();
    for (i, j) in (0..labels.len()).tuple_combinations().chain((0..labels.len()).map(|i| (i, i))) {
        let distances: Vec<f64> = if i == j {
            patterns[i]
                .iter()
                .tuple_combinations()
                .map(|(p, q)| euclidean_distance(p, q))
                .collect()
        } else {
            patterns[i]
                .iter()
                .cartesian_product(patterns[j].iter())
                .map(|(p, q)| euclidean_distance(p, q))
                .collect()
        };
        log::debug!(
            "{} distances between {} and {}",
            distances.len(),
            labels[i],
            labels[j]
        );
        samples.insert(format!("{}_{}", labels[i], labels[j]), distances);
    }
    Ok(samples)
}

/// Extract `feature` for every label of `behavior`, keyed by neuron name, or by
/// [`POPULATION_KEY`] for a population feature.
pub fn extract_features<S: SpikeSource + Sync, B: BehaviorSource>(
    spikes: &S,
    behavior: &B,
    feature: Feature,
    bin_size: f64,
) -> Result<BTreeMap<String, BTreeMap<String, Vec<f64>>>, NDAError> {
    let labels: Vec<String> = behavior.label_set().into_iter().collect();
    log::debug!("Extracting {:?} for labels {:?}", feature, labels);

    match feature {
        Feature::FiringRate => {
            let matrix = RateMatrix::from_spike_source(spikes, bin_size)?;
            spikes
                .neuron_names()
                .into_iter()
                .map(|neuron| {
                    let samples = firing_rate_samples(&matrix, behavior, &labels, &neuron)?;
                    Ok((neuron, samples))
                })
                .collect()
        }
        Feature::PopulationFiringRate => {
            let matrix = RateMatrix::from_spike_source(spikes, bin_size)?;
            let samples = population_firing_rate_samples(&matrix, behavior, &labels)?;
            Ok(BTreeMap::from([(POPULATION_KEY.to_string(), samples)]))
        }
        Feature::Isi => spikes
            .neuron_names()
            .into_iter()
            .map(|neuron| {
                let samples = inter_spike_interval_samples(spikes, behavior, &labels, &neuron)?;
                Ok((neuron, samples))
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    use crate::core::source::{Contacts, SpikeTrains};

    fn matrix() -> RateMatrix {
        RateMatrix::from_rows(
            vec!["a".to_string(), "b".to_string()],
            vec![vec![1, 2, 3, 4], vec![3, 0, 1, 0]],
            Interval::make(0.0, 1.0).unwrap(),
            0.25,
        )
        .unwrap()
    }

    fn contacts() -> Contacts {
        Contacts::build(vec![
            ("x", Interval::make(0.0, 0.3).unwrap()),
            ("y", Interval::make(0.5, 0.74).unwrap()),
            ("z", Interval::make(2.0, 3.0).unwrap()),
        ])
        .unwrap()
    }

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn test_feature_from_str() {
        assert_eq!("firing_rate".parse::<Feature>(), Ok(Feature::FiringRate));
        assert_eq!(
            "population_firing_rate".parse::<Feature>(),
            Ok(Feature::PopulationFiringRate)
        );
        assert_eq!("isi".parse::<Feature>(), Ok(Feature::Isi));
        assert!(matches!(
            "entropy".parse::<Feature>(),
            Err(NDAError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_firing_rate_samples() {
        let samples =
            firing_rate_samples(&matrix(), &contacts(), &labels(&["x", "y", "z"]), "a").unwrap();
        assert_eq!(samples["x"], vec![1.0, 2.0]);
        assert_eq!(samples["y"], vec![3.0]);
        // a contact outside the matrix interval gives no sample
        assert!(samples["z"].is_empty());

        assert_eq!(
            firing_rate_samples(&matrix(), &contacts(), &labels(&["x"]), "c"),
            Err(NDAError::UnknownLabel("c".to_string()))
        );
        assert_eq!(
            firing_rate_samples(&matrix(), &contacts(), &labels(&["w"]), "a"),
            Err(NDAError::UnknownLabel("w".to_string()))
        );
    }

    #[test]
    fn test_population_firing_rate_samples() {
        let samples =
            population_firing_rate_samples(&matrix(), &contacts(), &labels(&["x", "y"])).unwrap();
        assert_eq!(samples["x"], vec![2.0, 1.0]);
        assert_eq!(samples["y"], vec![2.0]);
    }

    #[test]
    fn test_inter_spike_interval_samples() {
        let spikes = SpikeTrains::build(vec![
            ("a", vec![0.05, 0.1, 0.2, 0.4, 0.6, 0.65, 0.7]),
            ("b", vec![0.9]),
        ])
        .unwrap();

        let samples =
            inter_spike_interval_samples(&spikes, &contacts(), &labels(&["x", "y"]), "a").unwrap();
        // 0.4 lies between both contacts and is never paired
        assert_eq!(samples["x"].len(), 2);
        assert_relative_eq!(samples["x"][0], 0.05);
        assert_relative_eq!(samples["x"][1], 0.1);
        assert_eq!(samples["y"].len(), 2);
        assert_relative_eq!(samples["y"][0], 0.05, max_relative = 1e-9);
        assert_relative_eq!(samples["y"][1], 0.05, max_relative = 1e-9);

        let samples =
            inter_spike_interval_samples(&spikes, &contacts(), &labels(&["x", "y"]), "b").unwrap();
        assert!(samples.values().all(|isis| isis.is_empty()));
    }

    #[test]
    fn test_pattern_distances_samples() {
        let mut matrix = matrix();
        matrix.set_window_width(1).unwrap();

        let samples =
            pattern_distances_samples(&matrix, &contacts(), &labels(&["x", "y"])).unwrap();
        assert_eq!(
            samples.keys().collect::<Vec<_>>(),
            vec!["x_x", "x_y", "y_y"]
        );

        // x holds the patterns [1, 3] and [2, 0], y holds [3, 1]
        assert_eq!(samples["x_x"].len(), 1);
        assert_relative_eq!(samples["x_x"][0], 10f64.sqrt());
        assert_eq!(samples["x_y"].len(), 2);
        assert_relative_eq!(samples["x_y"][0], 8f64.sqrt());
        assert_relative_eq!(samples["x_y"][1], 2f64.sqrt());
        assert!(samples["y_y"].is_empty());
    }

    #[test]
    fn test_extract_features() {
        let spikes = SpikeTrains::build(vec![
            ("a", vec![0.1, 0.3, 0.6, 0.99]),
            ("b", vec![0.2, 0.25]),
        ])
        .unwrap();
        let contacts = Contacts::build(vec![("x", Interval::make(0.0, 0.3).unwrap())]).unwrap();

        let rates = extract_features(&spikes, &contacts, Feature::FiringRate, 0.25).unwrap();
        assert_eq!(rates.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(rates["a"]["x"], vec![1.0, 1.0]);
        assert_eq!(rates["b"]["x"], vec![1.0, 1.0]);

        let population =
            extract_features(&spikes, &contacts, Feature::PopulationFiringRate, 0.25).unwrap();
        assert_eq!(population[POPULATION_KEY]["x"], vec![1.0, 1.0]);

        let isis = extract_features(&spikes, &contacts, Feature::Isi, 0.25).unwrap();
        assert_eq!(isis["a"]["x"].len(), 1);
        assert_relative_eq!(isis["a"]["x"][0], 0.2, max_relative = 1e-9);
        assert_relative_eq!(isis["b"]["x"][0], 0.05, max_relative = 1e-9);
    }
}
