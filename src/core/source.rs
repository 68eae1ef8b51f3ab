//! Spike and behavior data sources consumed by the rate matrix and the sampler.
use std::collections::{BTreeMap, BTreeSet};

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::core::interval::Interval;
use crate::error::NDAError;

/// A source of per-neuron spike trains.
pub trait SpikeSource {
    /// The neuron names, sorted alphabetically.
    fn neuron_names(&self) -> Vec<String>;

    /// The sorted (ascending) spike times of the given neuron.
    /// Returns `None` if the neuron is not found.
    fn spike_times_for(&self, name: &str) -> Option<&[f64]>;

    fn num_neurons(&self) -> usize {
        self.neuron_names().len()
    }

    /// The smallest interval containing every spike of every neuron.
    /// Returns [`Interval::EMPTY`] if there is no spike at all.
    fn global_interval(&self) -> Interval {
        self.neuron_names()
            .iter()
            .filter_map(|name| self.spike_times_for(name))
            .filter_map(|times| match (times.first(), times.last()) {
                (Some(&first), Some(&last)) => Some(Interval::new_unchecked(first, last)),
                _ => None,
            })
            .fold(Interval::EMPTY, |acc, interval| acc.enclose(&interval))
    }
}

/// A source of labeled behavioral intervals (contacts).
pub trait BehaviorSource {
    fn label_set(&self) -> BTreeSet<String>;

    /// The intervals tagged with the given label, sorted by start time.
    /// Returns `None` if the label is not found.
    fn intervals_for(&self, label: &str) -> Option<&[Interval]>;

    /// The label of the first interval (in label order) containing `time`, if any.
    fn label_at(&self, time: f64) -> Option<String> {
        self.label_set().into_iter().find(|label| {
            self.intervals_for(label)
                .map_or(false, |intervals| intervals.iter().any(|i| i.contains(time)))
        })
    }

    /// The smallest interval containing every labeled interval.
    fn exposition_interval(&self) -> Interval {
        self.label_set()
            .iter()
            .filter_map(|label| self.intervals_for(label))
            .flatten()
            .fold(Interval::EMPTY, |acc, interval| acc.enclose(interval))
    }
}

/// An in-memory collection of named spike trains.
#[derive(Debug, PartialEq, Clone, Default, Serialize, Deserialize)]
pub struct SpikeTrains {
    trains: BTreeMap<String, Vec<f64>>,
}

impl SpikeTrains {
    /// Create a collection from (name, firing times) pairs.
    /// If necessary, the firing times are sorted.
    /// The function returns an error for non-finite firing times.
    pub fn build<I, S>(trains: I) -> Result<Self, NDAError>
    where
        I: IntoIterator<Item = (S, Vec<f64>)>,
        S: Into<String>,
    {
        let trains = trains
            .into_iter()
            .map(|(name, mut times)| {
                if let Some(&time) = times.iter().find(|t| !t.is_finite()) {
                    return Err(NDAError::InvalidRange {
                        start: time,
                        end: time,
                    });
                }
                times.sort_by(|t1, t2| t1.total_cmp(t2));
                Ok((name.into(), times))
            })
            .collect::<Result<BTreeMap<String, Vec<f64>>, NDAError>>()?;

        Ok(SpikeTrains { trains })
    }

    /// A new collection with the neurons whose name starts with one of the comma
    /// separated prefixes in `filter`. The filter `"*"` selects every neuron.
    pub fn with_filter(&self, filter: &str) -> SpikeTrains {
        let prefixes = filter
            .split(',')
            .map(str::trim)
            .filter(|prefix| !prefix.is_empty())
            .collect_vec();

        if prefixes.iter().any(|&prefix| prefix == "*") {
            return self.clone();
        }

        let trains = self
            .trains
            .iter()
            .filter(|(name, _)| prefixes.iter().any(|prefix| name.starts_with(prefix)))
            .map(|(name, times)| (name.clone(), times.clone()))
            .collect();
        SpikeTrains { trains }
    }

    pub fn get(&self, name: &str) -> Option<&Vec<f64>> {
        self.trains.get(name)
    }

    pub fn num_spikes(&self) -> usize {
        self.trains.values().map(|times| times.len()).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<f64>)> {
        self.trains.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (&String, &mut Vec<f64>)> {
        self.trains.iter_mut()
    }
}

impl SpikeSource for SpikeTrains {
    fn neuron_names(&self) -> Vec<String> {
        self.trains.keys().cloned().collect()
    }

    fn spike_times_for(&self, name: &str) -> Option<&[f64]> {
        self.trains.get(name).map(|times| &times[..])
    }

    fn num_neurons(&self) -> usize {
        self.trains.len()
    }
}

/// An in-memory collection of labeled contact intervals.
#[derive(Debug, PartialEq, Clone, Default, Serialize, Deserialize)]
pub struct Contacts {
    contacts: BTreeMap<String, Vec<Interval>>,
}

impl Contacts {
    /// Create a collection from (label, interval) pairs.
    /// The function returns an error for invalid intervals.
    pub fn build<I, S>(contacts: I) -> Result<Self, NDAError>
    where
        I: IntoIterator<Item = (S, Interval)>,
        S: Into<String>,
    {
        let mut map: BTreeMap<String, Vec<Interval>> = BTreeMap::new();
        for (label, interval) in contacts {
            if interval.is_empty() {
                return Err(NDAError::InvalidRange {
                    start: interval.start(),
                    end: interval.end(),
                });
            }
            map.entry(label.into()).or_default().push(interval);
        }

        map.values_mut().for_each(|intervals| {
            intervals.sort_by(|a, b| a.start().total_cmp(&b.start()));
        });

        Ok(Contacts { contacts: map })
    }

    /// A new collection with every interval shifted by `offset`.
    pub fn shifted(&self, offset: f64) -> Contacts {
        let contacts = self
            .contacts
            .iter()
            .map(|(label, intervals)| {
                (
                    label.clone(),
                    intervals.iter().map(|i| i.shift(offset)).collect(),
                )
            })
            .collect();
        Contacts { contacts }
    }

    pub fn num_contacts(&self) -> usize {
        self.contacts.values().map(|intervals| intervals.len()).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<Interval>)> {
        self.contacts.iter()
    }
}

impl BehaviorSource for Contacts {
    fn label_set(&self) -> BTreeSet<String> {
        self.contacts.keys().cloned().collect()
    }

    fn intervals_for(&self, label: &str) -> Option<&[Interval]> {
        self.contacts.get(label).map(|intervals| &intervals[..])
    }
}
