//! Labeled pattern tables, the train and test halves of a sampling round.
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::NDAError;

/// A pattern and the class it was sampled for.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct LabeledPattern {
    pub pattern: Vec<f64>,
    pub label: String,
}

/// A named table of fixed-dimension patterns, each tagged with a label of the domain.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct PatternSet {
    name: String,
    labels: BTreeSet<String>,
    attributes: Vec<String>,
    entries: Vec<LabeledPattern>,
}

impl PatternSet {
    /// Create an empty set with the given attribute (column) names.
    pub fn new<I, S>(name: &str, attributes: Vec<String>, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        PatternSet {
            name: name.to_string(),
            labels: labels.into_iter().map(Into::into).collect(),
            attributes,
            entries: vec![],
        }
    }

    /// Create an empty set for the patterns of a matrix with the given rows and window width.
    /// The attribute names are `<neuron>_<i>` for every column `i` of the window, row after row.
    pub fn for_matrix<I, S>(name: &str, neuron_names: &[String], window_width: usize, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let attributes = neuron_names
            .iter()
            .flat_map(|neuron| (0..window_width).map(move |i| format!("{}_{}", neuron, i)))
            .collect();
        PatternSet::new(name, attributes, labels)
    }

    /// Append a pattern.
    /// The function returns an error if the pattern dimension or its label does not fit the set.
    pub fn add_pattern(&mut self, pattern: Vec<f64>, label: &str) -> Result<(), NDAError> {
        if pattern.len() != self.dimension() {
            return Err(NDAError::InvalidConfiguration(format!(
                "pattern of dimension {} added to set {} of dimension {}",
                pattern.len(),
                self.name,
                self.dimension()
            )));
        }
        if !self.labels.contains(label) {
            return Err(NDAError::UnknownLabel(label.to_string()));
        }

        self.entries.push(LabeledPattern {
            pattern,
            label: label.to_string(),
        });
        Ok(())
    }

    /// Append several patterns with the same label. Nothing is added if one of them is invalid.
    pub fn add_patterns(&mut self, patterns: Vec<Vec<f64>>, label: &str) -> Result<(), NDAError> {
        if !self.labels.contains(label) {
            return Err(NDAError::UnknownLabel(label.to_string()));
        }
        if let Some(pattern) = patterns.iter().find(|p| p.len() != self.dimension()) {
            return Err(NDAError::InvalidConfiguration(format!(
                "pattern of dimension {} added to set {} of dimension {}",
                pattern.len(),
                self.name,
                self.dimension()
            )));
        }

        self.entries.extend(patterns.into_iter().map(|pattern| LabeledPattern {
            pattern,
            label: label.to_string(),
        }));
        Ok(())
    }

    pub fn patterns_for<'a>(&'a self, label: &'a str) -> impl Iterator<Item = &'a Vec<f64>> + 'a {
        self.entries
            .iter()
            .filter(move |entry| entry.label == label)
            .map(|entry| &entry.pattern)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dimension(&self) -> usize {
        self.attributes.len()
    }

    pub fn attributes(&self) -> &[String] {
        &self.attributes[..]
    }

    pub fn label_set(&self) -> &BTreeSet<String> {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LabeledPattern> + '_ {
        self.entries.iter()
    }

    /// Save the pattern set to a file.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<(), NDAError> {
        let file = File::create(path).map_err(|e| NDAError::IOError(e.to_string()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)
            .map_err(|e| NDAError::IOError(e.to_string()))?;
        writer.flush().map_err(|e| NDAError::IOError(e.to_string()))
    }

    /// Load a pattern set from a file.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, NDAError> {
        let file = File::open(path).map_err(|e| NDAError::IOError(e.to_string()))?;
        let reader = BufReader::new(file);
        serde_json::from_reader(reader).map_err(|e| NDAError::IOError(e.to_string()))
    }
}
