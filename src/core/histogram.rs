//! Binning of sorted event times into fixed-width histograms.
use crate::core::interval::Interval;
use crate::error::NDAError;

/// Returns the bin of `value` on the grid starting at `interval.start` with `num_bins` bins
/// of width `bin_size`, or `None` if the value lies outside the interval.
///
/// Bins are closed on the left and open on the right, except the last one which also
/// contains `interval.end`.
pub fn bin_index(interval: &Interval, bin_size: f64, num_bins: usize, value: f64) -> Option<usize> {
    if num_bins == 0 || !interval.contains(value) {
        return None;
    }

    if value == interval.end() {
        return Some(num_bins - 1);
    }

    let bin = ((value - interval.start()) / bin_size).floor() as usize;
    Some(bin.min(num_bins - 1))
}

/// Number of bins of width `bin_size` needed to cover `interval`.
pub fn num_bins_for(interval: &Interval, bin_size: f64) -> usize {
    (interval.duration() / bin_size).ceil() as usize
}

/// A histogram of event counts over a fixed interval.
///
/// The same histogram can be reused to count several spike trains over the same interval,
/// see [`Histogram::load`].
#[derive(Debug, PartialEq, Clone)]
pub struct Histogram {
    interval: Interval,
    bin_size: f64,
    counts: Vec<u32>,
}

impl Histogram {
    /// Create an empty histogram covering `interval` with bins of width `bin_size`.
    pub fn new(interval: Interval, bin_size: f64) -> Result<Self, NDAError> {
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

        let num_bins = num_bins_for(&interval, bin_size);
        Ok(Histogram {
            interval,
            bin_size,
            counts: vec![0; num_bins],
        })
    }

    /// Create an empty histogram covering `interval` with exactly `bin_count` bins.
    pub fn with_bin_count(interval: Interval, bin_count: usize) -> Result<Self, NDAError> {
        if bin_count == 0 {
            return Err(NDAError::InvalidConfiguration(
                "bin count must be positive".to_string(),
            ));
        }
        if interval.is_empty() || interval.duration() <= 0.0 {
            return Err(NDAError::InvalidRange {
                start: interval.start(),
                end: interval.end(),
            });
        }

        Ok(Histogram {
            interval,
            bin_size: interval.duration() / bin_count as f64,
            counts: vec![0; bin_count],
        })
    }

    /// Count the sorted `times` falling in `interval` with bins of width `bin_size`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rusty_nda::core::histogram::Histogram;
    /// use rusty_nda::core::interval::Interval;
    ///
    /// let interval = Interval::make(0.0, 1.0).unwrap();
    /// let counts = Histogram::build(&[0.1, 0.3, 0.6, 1.0, 1.2], interval, 0.25).unwrap();
    /// assert_eq!(counts, vec![1, 1, 1, 1]);
    /// ```
    pub fn build(times: &[f64], interval: Interval, bin_size: f64) -> Result<Vec<u32>, NDAError> {
        let mut histogram = Histogram::new(interval, bin_size)?;
        histogram.load(times);
        Ok(histogram.counts)
    }

    /// Set every bin count to zero, keeping the interval and bin size.
    pub fn reset(&mut self) {
        self.counts.iter_mut().for_each(|count| *count = 0);
    }

    /// Replace the counts with those of the (ascending) `times`.
    /// Times outside the interval are ignored.
    pub fn load(&mut self, times: &[f64]) {
        self.reset();

        let (start, end) = (self.interval.start(), self.interval.end());
        let first = times.partition_point(|&time| time < start);
        for &time in times[first..].iter().take_while(|&&time| time <= end) {
            self.add_fast(time);
        }
    }

    /// Count a single value. Returns false if the value lies outside the interval.
    pub fn add(&mut self, value: f64) -> bool {
        if self.interval.contains(value) {
            self.add_fast(value);
            true
        } else {
            false
        }
    }

    fn add_fast(&mut self, value: f64) {
        if let Some(bin) = self.bin_for(value) {
            self.counts[bin] += 1;
        }
    }

    /// Returns the bin containing `value`, or `None` if it lies outside the interval.
    pub fn bin_for(&self, value: f64) -> Option<usize> {
        bin_index(&self.interval, self.bin_size, self.counts.len(), value)
    }

    /// Returns the start time of the given bin.
    pub fn time_for_bin(&self, bin: usize) -> f64 {
        self.interval.start() + bin as f64 * self.bin_size
    }

    pub fn bin_count(&self, bin: usize) -> Option<u32> {
        self.counts.get(bin).copied()
    }

    pub fn counts(&self) -> &[u32] {
        &self.counts[..]
    }

    pub fn num_bins(&self) -> usize {
        self.counts.len()
    }

    pub fn bin_size(&self) -> f64 {
        self.bin_size
    }

    pub fn interval(&self) -> Interval {
        self.interval
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;

    const SEED: u64 = 42;

    #[test]
    fn test_histogram_new() {
        let interval = Interval::make(0.0, 1.0).unwrap();
        assert!(matches!(
            Histogram::new(interval, 0.0),
            Err(NDAError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            Histogram::new(interval, -0.25),
            Err(NDAError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            Histogram::new(Interval::EMPTY, 0.25),
            Err(NDAError::InvalidRange { .. })
        ));

        assert_eq!(Histogram::new(interval, 0.25).unwrap().num_bins(), 4);
        assert_eq!(Histogram::new(interval, 0.3).unwrap().num_bins(), 4);
        assert_eq!(Histogram::new(interval, 2.0).unwrap().num_bins(), 1);

        let histogram = Histogram::with_bin_count(interval, 8).unwrap();
        assert_eq!(histogram.num_bins(), 8);
        assert_eq!(histogram.bin_size(), 0.125);
    }

    #[test]
    fn test_histogram_build() {
        let interval = Interval::make(0.0, 1.0).unwrap();

        assert_eq!(
            Histogram::build(&[0.1, 0.3, 0.6], interval, 0.25).unwrap(),
            vec![1, 1, 1, 0]
        );
        assert_eq!(
            Histogram::build(&[0.2, 0.25], interval, 0.25).unwrap(),
            vec![1, 1, 0, 0]
        );

        // values outside the interval are ignored
        assert_eq!(
            Histogram::build(&[-1.0, -0.001, 1.001, 5.0], interval, 0.25).unwrap(),
            vec![0, 0, 0, 0]
        );

        // duplicated values on the left boundary are all counted
        assert_eq!(
            Histogram::build(&[0.0, 0.0, 0.0, 0.5], interval, 0.25).unwrap(),
            vec![3, 0, 1, 0]
        );

        // internal bin boundaries belong to the bin starting there
        assert_eq!(
            Histogram::build(&[0.25, 0.5, 0.75], interval, 0.25).unwrap(),
            vec![0, 1, 1, 1]
        );
    }

    #[test]
    fn test_histogram_end_of_interval() {
        // (end - start) / bin_size is not an exact integer in floating point
        let interval = Interval::make(0.1, 0.7).unwrap();
        let counts = Histogram::build(&[0.7], interval, 0.1).unwrap();
        assert_eq!(counts.iter().sum::<u32>(), 1);
        assert_eq!(counts[counts.len() - 1], 1);

        let interval = Interval::make(0.0, 1.0).unwrap();
        let counts = Histogram::build(&[1.0, 1.0], interval, 0.3).unwrap();
        assert_eq!(counts, vec![0, 0, 0, 2]);
    }

    #[test]
    fn test_histogram_sum_of_counts() {
        let mut rng = StdRng::seed_from_u64(SEED);

        for _ in 0..50 {
            let mut times: Vec<f64> = (0..200).map(|_| rng.gen_range(-5.0..25.0)).collect();
            times.sort_by(|a, b| a.partial_cmp(b).unwrap());

            let start = rng.gen_range(0.0..5.0);
            let end = start + rng.gen_range(0.5..15.0);
            let bin_size = rng.gen_range(0.01..1.0);
            let interval = Interval::make(start, end).unwrap();

            let counts = Histogram::build(&times, interval, bin_size).unwrap();
            assert_eq!(
                counts.len(),
                ((end - start) / bin_size).ceil() as usize
            );
            assert_eq!(
                counts.iter().sum::<u32>() as usize,
                times.iter().filter(|&&t| interval.contains(t)).count()
            );
        }
    }

    #[test]
    fn test_histogram_reuse() {
        let interval = Interval::make(0.0, 2.0).unwrap();
        let mut histogram = Histogram::new(interval, 0.5).unwrap();

        histogram.load(&[0.1, 0.2, 1.9]);
        assert_eq!(histogram.counts(), &[2, 0, 0, 1]);

        histogram.load(&[1.0]);
        assert_eq!(histogram.counts(), &[0, 0, 1, 0]);

        assert!(histogram.add(2.0));
        assert!(!histogram.add(2.5));
        assert_eq!(histogram.bin_count(3), Some(1));
        assert_eq!(histogram.bin_count(4), None);
    }

    #[test]
    fn test_histogram_bin_for() {
        let interval = Interval::make(10.0, 12.0).unwrap();
        let histogram = Histogram::new(interval, 0.5).unwrap();

        assert_eq!(histogram.bin_for(9.99), None);
        assert_eq!(histogram.bin_for(10.0), Some(0));
        assert_eq!(histogram.bin_for(10.5), Some(1));
        assert_eq!(histogram.bin_for(11.99), Some(3));
        assert_eq!(histogram.bin_for(12.0), Some(3));
        assert_eq!(histogram.bin_for(12.01), None);
        assert_eq!(histogram.time_for_bin(2), 11.0);
    }
}
