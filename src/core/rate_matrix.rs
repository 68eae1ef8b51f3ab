//! Count matrix (neurons × time bins) and sliding-window pattern extraction.
//!
//! A [`RateMatrix`] holds one row of binned spike counts per neuron over a shared time
//! interval. Patterns are flattened windows of `window_width` consecutive columns, taken
//! row after row.
//!
//! # Examples
//!
//! ```rust
//! use rusty_nda::core::rate_matrix::RateMatrix;
//! use rusty_nda::core::source::SpikeTrains;
//!
//! let spikes = SpikeTrains::build(vec![
//!     ("n1", vec![0.1, 0.3, 0.6, 0.99]),
//!     ("n2", vec![0.2, 0.25]),
//! ])
//! .unwrap();
//!
//! let mut matrix = RateMatrix::from_spike_source(&spikes, 0.25).unwrap();
//! matrix.set_window_width(2).unwrap();
//!
//! assert_eq!(matrix.num_columns(), 4);
//! assert_eq!(matrix.pattern_at_column(0, 2).unwrap(), vec![1.0, 1.0, 1.0, 1.0]);
//! assert_eq!(matrix.iter().count(), 3);
//! ```
use std::ops::Range;
use std::sync::Arc;

use rayon::prelude::*;

use crate::core::histogram::{bin_index, num_bins_for, Histogram};
use crate::core::interval::Interval;
use crate::core::source::SpikeSource;
use crate::core::MIN_NEURONS_PAR;
use crate::error::NDAError;

/// The default title of a matrix.
pub const DEFAULT_TITLE: &str = "CountMatrix";

/// A matrix of spike counts with one row per neuron and one column per time bin.
///
/// Rows are reference counted: matrices derived from another one (see the
/// [`transform`](crate::transform) module) share every row they do not modify.
#[derive(Debug, PartialEq, Clone)]
pub struct RateMatrix {
    neuron_names: Vec<String>,
    rows: Vec<Arc<[i32]>>,
    interval: Interval,
    bin_size: f64,
    window_width: usize,
    title: String,
}

impl RateMatrix {
    /// Bin every spike train of `source` with bins of width `bin_size`.
    ///
    /// The matrix interval is the global interval of the source expanded to the bin grid,
    /// i.e., `[floor(start / bin_size) * bin_size, ceil(end / bin_size) * bin_size]`.
    /// Rows follow the neuron order of the source.
    pub fn from_spike_source<S>(source: &S, bin_size: f64) -> Result<Self, NDAError>
    where
        S: SpikeSource + Sync + ?Sized,
    {
        if !(bin_size > 0.0) || !bin_size.is_finite() {
            return Err(NDAError::InvalidConfiguration(format!(
                "bin size must be positive, got {}",
                bin_size
            )));
        }

        let global = source.global_interval();
        if global.is_empty() {
            return Err(NDAError::InvalidConfiguration(
                "the spike source has no spikes".to_string(),
            ));
        }

        let interval = Interval::make(
            (global.start() / bin_size).floor() * bin_size,
            (global.end() / bin_size).ceil() * bin_size,
        )?;
        if num_bins_for(&interval, bin_size) == 0 {
            return Err(NDAError::InvalidConfiguration(format!(
                "the recording interval {} is shorter than a single bin",
                interval
            )));
        }

        let neuron_names = source.neuron_names();
        let bin_row = |name: &String| -> Result<Arc<[i32]>, NDAError> {
            let times = source.spike_times_for(name).unwrap_or(&[]);
            let counts = Histogram::build(times, interval, bin_size)?;
            Ok(counts.into_iter().map(|count| count as i32).collect())
        };

        let rows = if neuron_names.len() >= MIN_NEURONS_PAR {
            neuron_names
                .par_iter()
                .map(bin_row)
                .collect::<Result<Vec<_>, _>>()?
        } else {
            neuron_names
                .iter()
                .map(bin_row)
                .collect::<Result<Vec<_>, _>>()?
        };

        log::debug!(
            "Count matrix built: {} neurons x {} bins of {}s over {}",
            neuron_names.len(),
            num_bins_for(&interval, bin_size),
            bin_size,
            interval
        );

        Self::from_shared_rows(neuron_names, rows, interval, bin_size)
    }

    /// Create a matrix from existing counts.
    pub fn from_rows(
        neuron_names: Vec<String>,
        rows: Vec<Vec<i32>>,
        interval: Interval,
        bin_size: f64,
    ) -> Result<Self, NDAError> {
        let rows = rows.into_iter().map(Arc::from).collect();
        Self::from_shared_rows(neuron_names, rows, interval, bin_size)
    }

    fn from_shared_rows(
        neuron_names: Vec<String>,
        rows: Vec<Arc<[i32]>>,
        interval: Interval,
        bin_size: f64,
    ) -> Result<Self, NDAError> {
        if !(bin_size > 0.0) || !bin_size.is_finite() {
            return Err(NDAError::InvalidConfiguration(format!(
                "bin size must be positive, got {}",
                bin_size
            )));
        }
        if interval.is_empty() {
            return Err(NDAError::InvalidRange {
                start: interval.start(),
                end: interval.end(),
            });
        }
        if rows.is_empty() {
            return Err(NDAError::InvalidConfiguration(
                "a count matrix needs at least one row".to_string(),
            ));
        }
        if neuron_names.len() != rows.len() {
            return Err(NDAError::InvalidConfiguration(format!(
                "{} neuron names for {} rows",
                neuron_names.len(),
                rows.len()
            )));
        }

        let num_columns = rows[0].len();
        if num_columns == 0 || rows.iter().any(|row| row.len() != num_columns) {
            return Err(NDAError::InvalidConfiguration(
                "every row must have the same positive number of columns".to_string(),
            ));
        }

        Ok(RateMatrix {
            neuron_names,
            rows,
            interval,
            bin_size,
            window_width: 1,
            title: DEFAULT_TITLE.to_string(),
        })
    }

    /// A matrix with the same parameters (interval, bin size, window width, title) but
    /// other rows. Callers guarantee the rows have the same number of columns.
    pub(crate) fn derive(&self, neuron_names: Vec<String>, rows: Vec<Arc<[i32]>>) -> RateMatrix {
        debug_assert_eq!(neuron_names.len(), rows.len());
        debug_assert!(rows.iter().all(|row| row.len() == self.num_columns()));
        RateMatrix {
            neuron_names,
            rows,
            interval: self.interval,
            bin_size: self.bin_size,
            window_width: self.window_width,
            title: self.title.clone(),
        }
    }

    /// Same as [`RateMatrix::derive`], keeping the neuron names.
    pub(crate) fn with_rows(&self, rows: Vec<Arc<[i32]>>) -> RateMatrix {
        self.derive(self.neuron_names.clone(), rows)
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_columns(&self) -> usize {
        self.rows[0].len()
    }

    pub fn bin_size(&self) -> f64 {
        self.bin_size
    }

    pub fn interval(&self) -> Interval {
        self.interval
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: &str) {
        self.title = title.to_string();
    }

    pub fn neuron_names(&self) -> &[String] {
        &self.neuron_names[..]
    }

    pub fn window_width(&self) -> usize {
        self.window_width
    }

    /// Set the number of columns of every pattern.
    pub fn set_window_width(&mut self, width: usize) -> Result<(), NDAError> {
        if width == 0 || width > self.num_columns() {
            return Err(NDAError::InvalidConfiguration(format!(
                "window width {} must be in [1, {}]",
                width,
                self.num_columns()
            )));
        }
        self.window_width = width;
        Ok(())
    }

    /// The length of every pattern of this matrix.
    pub fn pattern_dimension(&self) -> usize {
        self.num_rows() * self.window_width
    }

    pub fn get(&self, row: usize, column: usize) -> Option<i32> {
        self.rows.get(row).and_then(|row| row.get(column)).copied()
    }

    pub fn row(&self, row: usize) -> Option<&[i32]> {
        self.rows.get(row).map(|row| &row[..])
    }

    pub fn row_by_name(&self, name: &str) -> Option<&[i32]> {
        self.neuron_names
            .iter()
            .position(|neuron| neuron == name)
            .and_then(|row| self.row(row))
    }

    pub(crate) fn shared_rows(&self) -> &[Arc<[i32]>] {
        &self.rows[..]
    }

    pub fn column(&self, column: usize) -> Option<Vec<i32>> {
        if column >= self.num_columns() {
            return None;
        }
        Some(self.rows.iter().map(|row| row[column]).collect())
    }

    /// The column containing `time`, or `None` if it lies outside the matrix interval.
    pub fn bin_for_time(&self, time: f64) -> Option<usize> {
        bin_index(&self.interval, self.bin_size, self.num_columns(), time)
    }

    /// The start time of the given column.
    pub fn time_for_bin(&self, bin: usize) -> f64 {
        self.interval.start() + bin as f64 * self.bin_size
    }

    /// Returns true if `interval` lies entirely within the matrix interval.
    pub fn contains_window(&self, interval: &Interval) -> bool {
        self.interval.contains_interval(interval)
    }

    /// Returns true if the time window `[start_time, start_time + duration]` lies entirely
    /// within the matrix interval.
    pub fn contains_window_at(&self, start_time: f64, duration: f64) -> bool {
        Interval::make(start_time, start_time + duration)
            .map_or(false, |interval| self.contains_window(&interval))
    }

    fn contains_columns(&self, column: usize, width: usize) -> bool {
        width > 0 && column + width <= self.num_columns()
    }

    fn raw_pattern(&self, start_bin: usize, end_bin: usize) -> Vec<f64> {
        let mut pattern = Vec::with_capacity((end_bin - start_bin + 1) * self.num_rows());
        for row in self.rows.iter() {
            pattern.extend(row[start_bin..=end_bin].iter().map(|&count| count as f64));
        }
        pattern
    }

    /// The pattern covering every column from the bin of `interval.start` to the bin of
    /// `interval.end`.
    pub fn pattern(&self, interval: &Interval) -> Result<Vec<f64>, NDAError> {
        if !self.contains_window(interval) {
            return Err(NDAError::OutOfRange(format!(
                "interval {} lies outside the matrix interval {}",
                interval, self.interval
            )));
        }

        match (
            self.bin_for_time(interval.start()),
            self.bin_for_time(interval.end()),
        ) {
            (Some(start_bin), Some(end_bin)) => Ok(self.raw_pattern(start_bin, end_bin)),
            _ => Err(NDAError::OutOfRange(format!(
                "interval {} lies outside the matrix interval {}",
                interval, self.interval
            ))),
        }
    }

    /// The pattern of `width` columns starting at the column containing `start_time`.
    ///
    /// The bounds check is on columns: the window must end by the last column, even if
    /// `start_time + width * bin_size` slightly exceeds the matrix interval.
    pub fn pattern_at_time(&self, start_time: f64, width: usize) -> Result<Vec<f64>, NDAError> {
        let column = self.bin_for_time(start_time).ok_or_else(|| {
            NDAError::OutOfRange(format!(
                "time {} lies outside the matrix interval {}",
                start_time, self.interval
            ))
        })?;
        self.pattern_at_column(column, width)
    }

    /// The pattern of `width` columns starting at `column`.
    pub fn pattern_at_column(&self, column: usize, width: usize) -> Result<Vec<f64>, NDAError> {
        if !self.contains_columns(column, width) {
            return Err(NDAError::OutOfRange(format!(
                "no pattern of width {} starts at column {} ({} columns)",
                width,
                column,
                self.num_columns()
            )));
        }
        Ok(self.raw_pattern(column, column + width - 1))
    }

    /// The columns from which a window of the current width fits in the bins spanned by
    /// `interval ∩ matrix interval`.
    pub fn pattern_columns(&self, interval: &Interval) -> Range<usize> {
        let interval = interval.intersection(&self.interval);
        if interval.is_empty() {
            return 0..0;
        }

        match (
            self.bin_for_time(interval.start()),
            self.bin_for_time(interval.end()),
        ) {
            (Some(start_bin), Some(end_bin)) => {
                let count = (end_bin + 2).saturating_sub(start_bin + self.window_width);
                start_bin..start_bin + count
            }
            _ => 0..0,
        }
    }

    /// The number of sliding-window positions of the current width wholly inside
    /// `interval ∩ matrix interval`.
    pub fn num_patterns(&self, interval: &Interval) -> usize {
        self.pattern_columns(interval).len()
    }

    /// Every pattern of the current width inside `interval ∩ matrix interval`.
    pub fn patterns_in(&self, interval: &Interval) -> Vec<Vec<f64>> {
        self.pattern_columns(interval)
            .map(|column| self.raw_pattern(column, column + self.window_width - 1))
            .collect()
    }

    /// A cursor positioned on the first column.
    pub fn cursor(&self) -> PatternCursor<'_> {
        PatternCursor {
            matrix: self,
            column: 0,
        }
    }

    /// An iterator over every pattern of the current width, from the first column.
    pub fn iter(&self) -> PatternCursor<'_> {
        self.cursor()
    }
}

impl<'a> IntoIterator for &'a RateMatrix {
    type Item = Vec<f64>;
    type IntoIter = PatternCursor<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.cursor()
    }
}

/// A column cursor over a [`RateMatrix`].
///
/// As an iterator, it yields the pattern of the matrix window width starting at the
/// current column and moves one column forward, until no window fits anymore.
#[derive(Debug, Clone)]
pub struct PatternCursor<'a> {
    matrix: &'a RateMatrix,
    column: usize,
}

impl<'a> PatternCursor<'a> {
    /// Move the cursor to `column`. Returns false (and does not move) if the column does
    /// not exist.
    pub fn set_current_column(&mut self, column: usize) -> bool {
        if column < self.matrix.num_columns() {
            self.column = column;
            true
        } else {
            false
        }
    }

    /// Move the cursor to the column containing `time`. Returns false (and does not move)
    /// if the time lies outside the matrix interval.
    pub fn set_current_time(&mut self, time: f64) -> bool {
        match self.matrix.bin_for_time(time) {
            Some(column) => {
                self.column = column;
                true
            }
            None => false,
        }
    }

    /// The current column, or `None` once the cursor went past the last column.
    pub fn current_column(&self) -> Option<usize> {
        if self.column < self.matrix.num_columns() {
            Some(self.column)
        } else {
            None
        }
    }

    pub fn current_time(&self) -> f64 {
        self.matrix.time_for_bin(self.column)
    }

    /// The pattern of `width` columns from the current column; the cursor then moves one
    /// column forward.
    pub fn next_pattern(&mut self, width: usize) -> Result<Vec<f64>, NDAError> {
        let pattern = self.matrix.pattern_at_column(self.column, width)?;
        self.column += 1;
        Ok(pattern)
    }

    /// The number of patterns of `width` columns left from the current column.
    pub fn num_patterns(&self, width: usize) -> usize {
        if width > 0 && self.column + width <= self.matrix.num_columns() {
            self.matrix.num_columns() - self.column - width + 1
        } else {
            0
        }
    }
}

impl Iterator for PatternCursor<'_> {
    type Item = Vec<f64>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_pattern(self.matrix.window_width).ok()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.num_patterns(self.matrix.window_width);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for PatternCursor<'_> {}
