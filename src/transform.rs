//! Perturbations of rate matrices, spike trains and contacts, used as data-quality controls.
//!
//! Every transform leaves its input untouched and returns a new value. Matrix transforms
//! share the rows they do not modify with the input matrix.
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use rand::Rng;
use rand_distr::{Distribution, Poisson};
use serde::{Deserialize, Serialize};

use crate::core::rate_matrix::RateMatrix;
use crate::core::source::{BehaviorSource, Contacts, SpikeTrains};
use crate::error::NDAError;
use crate::utils::{check_pct, pct_count, random_n_sample, row_stats};

/// The distribution drawing the values of a surrogate row.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurrogateKind {
    /// Uniform integers between the minimum and the maximum of the original row.
    Uniform,
    /// Poisson counts with the mean of the original row.
    Poisson,
}

impl FromStr for SurrogateKind {
    type Err = NDAError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "uniform" => Ok(SurrogateKind::Uniform),
            "poisson" => Ok(SurrogateKind::Poisson),
            _ => Err(NDAError::InvalidConfiguration(format!(
                "unknown surrogate type: {}",
                s
            ))),
        }
    }
}

/// The distribution drawing the values of a surrogate window, see [`with_dist_surrogates`].
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowSurrogateKind {
    UniformD,
    PoissonD,
    MeanD,
}

impl FromStr for WindowSurrogateKind {
    type Err = NDAError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "uniform_d" => Ok(WindowSurrogateKind::UniformD),
            "poisson_d" => Ok(WindowSurrogateKind::PoissonD),
            "mean_d" => Ok(WindowSurrogateKind::MeanD),
            _ => Err(NDAError::InvalidConfiguration(format!(
                "unknown window surrogate type: {}",
                s
            ))),
        }
    }
}

fn poisson_counts<R: Rng + ?Sized>(mean: f64, len: usize, rng: &mut R) -> Result<Vec<i32>, NDAError> {
    if mean <= 0.0 {
        return Ok(vec![0; len]);
    }
    let poisson = Poisson::new(mean).map_err(|e| NDAError::InvalidConfiguration(e.to_string()))?;
    Ok((0..len).map(|_| poisson.sample(rng) as i32).collect())
}

fn uniform_counts<R: Rng + ?Sized>(min: i32, max: i32, len: usize, rng: &mut R) -> Vec<i32> {
    (0..len).map(|_| rng.gen_range(min..=max)).collect()
}

fn owned_rows(matrix: &RateMatrix) -> Vec<Vec<i32>> {
    matrix.shared_rows().iter().map(|row| row.to_vec()).collect()
}

fn shared_rows(rows: Vec<Vec<i32>>) -> Vec<Arc<[i32]>> {
    rows.into_iter().map(Arc::from).collect()
}

/// Swap `num_swaps` random pairs of entries of `row`.
fn swap_entries<R: Rng + ?Sized>(row: &mut [i32], num_swaps: usize, rng: &mut R) {
    let len = row.len();
    for _ in 0..num_swaps {
        let i = rng.gen_range(0..len);
        let j = rng.gen_range(0..len);
        row.swap(i, j);
    }
}

/// Convert a duration into a number of columns, as the column containing `start + dist`.
fn dist_in_bins(matrix: &RateMatrix, dist: f64) -> Result<usize, NDAError> {
    if !(dist >= 0.0) {
        return Err(NDAError::InvalidConfiguration(format!(
            "distance must be non-negative, got {}",
            dist
        )));
    }
    matrix
        .bin_for_time(matrix.interval().start() + dist)
        .ok_or_else(|| {
            NDAError::OutOfRange(format!(
                "distance {} exceeds the matrix interval {}",
                dist,
                matrix.interval()
            ))
        })
}

/// Remove `num_drop` distinct rows chosen uniformly at random.
/// The function returns an error if it would remove every row.
pub fn with_neuron_drop<R: Rng + ?Sized>(
    matrix: &RateMatrix,
    num_drop: usize,
    rng: &mut R,
) -> Result<RateMatrix, NDAError> {
    if num_drop >= matrix.num_rows() {
        return Err(NDAError::InvalidConfiguration(format!(
            "can't drop {} neurons out of {}",
            num_drop,
            matrix.num_rows()
        )));
    }

    let dropped = random_n_sample(matrix.num_rows(), num_drop, rng)?;
    let (names, rows): (Vec<String>, Vec<Arc<[i32]>>) = matrix
        .neuron_names()
        .iter()
        .zip(matrix.shared_rows())
        .enumerate()
        .filter(|(i, _)| !dropped.contains(i))
        .map(|(_, (name, row))| (name.clone(), row.clone()))
        .unzip();

    Ok(matrix.derive(names, rows))
}

/// Replace `num_surrogates` distinct rows chosen uniformly at random with rows drawn from
/// the given distribution.
pub fn with_random_surrogates<R: Rng + ?Sized>(
    matrix: &RateMatrix,
    num_surrogates: usize,
    kind: SurrogateKind,
    rng: &mut R,
) -> Result<RateMatrix, NDAError> {
    let chosen = random_n_sample(matrix.num_rows(), num_surrogates, rng)?;
    let mut rows = matrix.shared_rows().to_vec();

    for i in chosen {
        let (min, max, mean) = row_stats(&rows[i]).ok_or_else(|| {
            NDAError::InvalidConfiguration("can't build the surrogate of an empty row".to_string())
        })?;
        let len = rows[i].len();
        let surrogate = match kind {
            SurrogateKind::Uniform => uniform_counts(min, max, len, rng),
            SurrogateKind::Poisson => poisson_counts(mean, len, rng)?,
        };
        rows[i] = Arc::from(surrogate);
    }

    Ok(matrix.with_rows(rows))
}

/// Swap `round(pct * num_columns)` random pairs of columns, across every row at once.
pub fn with_column_swap<R: Rng + ?Sized>(
    matrix: &RateMatrix,
    pct: f64,
    rng: &mut R,
) -> Result<RateMatrix, NDAError> {
    check_pct(pct)?;
    let num_columns = matrix.num_columns();
    let num_swaps = pct_count(pct, num_columns);
    if num_swaps == 0 {
        return Ok(matrix.clone());
    }

    let mut rows = owned_rows(matrix);
    for _ in 0..num_swaps {
        let i = rng.gen_range(0..num_columns);
        let j = rng.gen_range(0..num_columns);
        rows.iter_mut().for_each(|row| row.swap(i, j));
    }

    Ok(matrix.with_rows(shared_rows(rows)))
}

/// For `num_surrogates` distinct rows chosen uniformly at random, swap
/// `round(pct * num_columns)` random pairs of entries within the row.
pub fn with_neuron_swap<R: Rng + ?Sized>(
    matrix: &RateMatrix,
    num_surrogates: usize,
    pct: f64,
    rng: &mut R,
) -> Result<RateMatrix, NDAError> {
    check_pct(pct)?;
    let chosen = random_n_sample(matrix.num_rows(), num_surrogates, rng)?;
    let num_swaps = pct_count(pct, matrix.num_columns());
    let mut rows = matrix.shared_rows().to_vec();

    for i in chosen {
        let mut row = rows[i].to_vec();
        swap_entries(&mut row, num_swaps, rng);
        rows[i] = Arc::from(row);
    }

    Ok(matrix.with_rows(rows))
}

/// Swap `round(pct * num_rows * num_columns)` random pairs of cells anywhere in the matrix.
pub fn with_matrix_swap<R: Rng + ?Sized>(
    matrix: &RateMatrix,
    pct: f64,
    rng: &mut R,
) -> Result<RateMatrix, NDAError> {
    check_pct(pct)?;
    let (num_rows, num_columns) = (matrix.num_rows(), matrix.num_columns());
    let num_swaps = pct_count(pct, num_rows * num_columns);
    if num_swaps == 0 {
        return Ok(matrix.clone());
    }

    let mut rows = owned_rows(matrix);
    for _ in 0..num_swaps {
        let (a, b) = (rng.gen_range(0..num_rows), rng.gen_range(0..num_columns));
        let (c, d) = (rng.gen_range(0..num_rows), rng.gen_range(0..num_columns));
        let tmp = rows[a][b];
        rows[a][b] = rows[c][d];
        rows[c][d] = tmp;
    }

    Ok(matrix.with_rows(shared_rows(rows)))
}

/// In every row, swap `round(pct * num_columns)` distinct random columns `i` each with a
/// random column `j` at most `dist` time units away from it.
pub fn with_column_swap_dist<R: Rng + ?Sized>(
    matrix: &RateMatrix,
    pct: f64,
    dist: f64,
    rng: &mut R,
) -> Result<RateMatrix, NDAError> {
    check_pct(pct)?;
    let dist_bins = dist_in_bins(matrix, dist)?;
    let num_columns = matrix.num_columns();
    let num_swaps = pct_count(pct, num_columns);

    let mut rows = owned_rows(matrix);
    for row in rows.iter_mut() {
        for i in random_n_sample(num_columns, num_swaps, rng)? {
            let a = i.saturating_sub(dist_bins);
            let b = (i + dist_bins).min(num_columns - 1);
            let j = if a != b { rng.gen_range(a..=b) } else { a };
            row.swap(i, j);
        }
    }

    Ok(matrix.with_rows(shared_rows(rows)))
}

/// Cut every row into consecutive windows of `dist` time units and replace every window with
/// values drawn from its statistics: uniform values in `[min, max]`, Poisson values with its
/// mean (zero for a zero mean) or its rounded mean.
pub fn with_dist_surrogates<R: Rng + ?Sized>(
    matrix: &RateMatrix,
    kind: WindowSurrogateKind,
    dist: f64,
    rng: &mut R,
) -> Result<RateMatrix, NDAError> {
    let dist_bins = dist_in_bins(matrix, dist)?;
    if dist_bins == 0 {
        return Err(NDAError::InvalidConfiguration(format!(
            "distance {} is shorter than a bin",
            dist
        )));
    }

    let mut rows = Vec::with_capacity(matrix.num_rows());
    for row in matrix.shared_rows() {
        let mut surrogate = Vec::with_capacity(row.len());
        for window in row.chunks(dist_bins) {
            let (min, max, mean) = row_stats(window).ok_or_else(|| {
                NDAError::InvalidConfiguration("empty surrogate window".to_string())
            })?;
            match kind {
                WindowSurrogateKind::UniformD => {
                    surrogate.extend(uniform_counts(min, max, window.len(), rng))
                }
                WindowSurrogateKind::PoissonD => {
                    surrogate.extend(poisson_counts(mean, window.len(), rng)?)
                }
                WindowSurrogateKind::MeanD => {
                    surrogate.extend(std::iter::repeat(mean.round() as i32).take(window.len()))
                }
            }
        }
        rows.push(Arc::from(surrogate));
    }

    Ok(matrix.with_rows(rows))
}

/// Like [`with_column_swap`], but both columns of every swap are drawn from the columns
/// covered by a contact of `behavior`. The other columns are left untouched.
pub fn with_contact_swap<B, R>(
    matrix: &RateMatrix,
    behavior: &B,
    pct: f64,
    rng: &mut R,
) -> Result<RateMatrix, NDAError>
where
    B: BehaviorSource + ?Sized,
    R: Rng + ?Sized,
{
    check_pct(pct)?;

    let mut covered = vec![false; matrix.num_columns()];
    for label in behavior.label_set() {
        for interval in behavior.intervals_for(&label).unwrap_or(&[]) {
            let interval = interval.intersection(&matrix.interval());
            if let (Some(first), Some(last)) = (
                matrix.bin_for_time(interval.start()),
                matrix.bin_for_time(interval.end()),
            ) {
                covered[first..=last].iter_mut().for_each(|c| *c = true);
            }
        }
    }
    let columns: Vec<usize> = (0..covered.len()).filter(|&c| covered[c]).collect();

    let num_swaps = pct_count(pct, columns.len());
    if num_swaps == 0 {
        return Ok(matrix.clone());
    }

    let mut rows = owned_rows(matrix);
    for _ in 0..num_swaps {
        let i = columns[rng.gen_range(0..columns.len())];
        let j = columns[rng.gen_range(0..columns.len())];
        rows.iter_mut().for_each(|row| row.swap(i, j));
    }

    Ok(matrix.with_rows(shared_rows(rows)))
}

/// Move every spike time `t` to a uniform random time in `[max(t - dist, 0), t + dist]`.
pub fn with_spike_jitter<R: Rng + ?Sized>(
    spikes: &SpikeTrains,
    dist: f64,
    rng: &mut R,
) -> Result<SpikeTrains, NDAError> {
    if !(dist >= 0.0) || !dist.is_finite() {
        return Err(NDAError::InvalidConfiguration(format!(
            "jitter distance must be non-negative, got {}",
            dist
        )));
    }

    let mut jittered = spikes.clone();
    for (_, times) in jittered.iter_mut() {
        for time in times.iter_mut() {
            let (min, max) = ((*time - dist).max(0.0), *time + dist);
            if min < max {
                *time = rng.gen_range(min..max);
            }
        }
        times.sort_by(|t1, t2| t1.total_cmp(t2));
    }
    Ok(jittered)
}

/// Shift every contact so the exposition interval starts at `t0`.
pub fn with_contact_shift(contacts: &Contacts, t0: f64) -> Result<Contacts, NDAError> {
    let exposition = contacts.exposition_interval();
    if exposition.is_empty() {
        return Err(NDAError::InvalidConfiguration(
            "can't shift an empty set of contacts".to_string(),
        ));
    }
    Ok(contacts.shifted(t0 - exposition.start()))
}

/// A perturbation and its parameters.
#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Transform {
    NeuronDrop { num_drop: usize },
    Uniform { num_surrogates: usize },
    Poisson { num_surrogates: usize },
    NeuronSwap { num_surrogates: usize, pct: f64 },
    ColSwap { pct: f64 },
    MatrixSwap { pct: f64 },
    ColSwapD { pct: f64, dist: f64 },
    UniformD { dist: f64 },
    PoissonD { dist: f64 },
    MeanD { dist: f64 },
    ContactSwap { pct: f64 },
    SpikeJitter { dist: f64 },
    ContactShift { t0: f64 },
}

impl Transform {
    /// Returns true if the transform perturbs the spike trains or the contacts rather than
    /// the rate matrix.
    pub fn is_source_transform(&self) -> bool {
        matches!(
            self,
            Transform::SpikeJitter { .. } | Transform::ContactShift { .. }
        )
    }

    /// Apply the transform to a rate matrix.
    /// Source transforms leave the matrix as is.
    pub fn apply<B, R>(&self, matrix: &RateMatrix, behavior: &B, rng: &mut R) -> Result<RateMatrix, NDAError>
    where
        B: BehaviorSource + ?Sized,
        R: Rng + ?Sized,
    {
        log::debug!("Applying {} to {}", self, matrix.title());
        match *self {
            Transform::NeuronDrop { num_drop } => with_neuron_drop(matrix, num_drop, rng),
            Transform::Uniform { num_surrogates } => {
                with_random_surrogates(matrix, num_surrogates, SurrogateKind::Uniform, rng)
            }
            Transform::Poisson { num_surrogates } => {
                with_random_surrogates(matrix, num_surrogates, SurrogateKind::Poisson, rng)
            }
            Transform::NeuronSwap { num_surrogates, pct } => {
                with_neuron_swap(matrix, num_surrogates, pct, rng)
            }
            Transform::ColSwap { pct } => with_column_swap(matrix, pct, rng),
            Transform::MatrixSwap { pct } => with_matrix_swap(matrix, pct, rng),
            Transform::ColSwapD { pct, dist } => with_column_swap_dist(matrix, pct, dist, rng),
            Transform::UniformD { dist } => {
                with_dist_surrogates(matrix, WindowSurrogateKind::UniformD, dist, rng)
            }
            Transform::PoissonD { dist } => {
                with_dist_surrogates(matrix, WindowSurrogateKind::PoissonD, dist, rng)
            }
            Transform::MeanD { dist } => {
                with_dist_surrogates(matrix, WindowSurrogateKind::MeanD, dist, rng)
            }
            Transform::ContactSwap { pct } => with_contact_swap(matrix, behavior, pct, rng),
            Transform::SpikeJitter { .. } | Transform::ContactShift { .. } => Ok(matrix.clone()),
        }
    }

    /// Apply the transform to spike trains. Only spike jitter changes them.
    pub fn apply_to_spikes<R: Rng + ?Sized>(
        &self,
        spikes: &SpikeTrains,
        rng: &mut R,
    ) -> Result<SpikeTrains, NDAError> {
        match *self {
            Transform::SpikeJitter { dist } => with_spike_jitter(spikes, dist, rng),
            _ => Ok(spikes.clone()),
        }
    }

    /// Apply the transform to contacts. Only contact shift changes them.
    pub fn apply_to_contacts(&self, contacts: &Contacts) -> Result<Contacts, NDAError> {
        match *self {
            Transform::ContactShift { t0 } => with_contact_shift(contacts, t0),
            _ => Ok(contacts.clone()),
        }
    }
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Transform::NeuronDrop { num_drop } => write!(f, "neuron_drop({})", num_drop),
            Transform::Uniform { num_surrogates } => write!(f, "uniform({})", num_surrogates),
            Transform::Poisson { num_surrogates } => write!(f, "poisson({})", num_surrogates),
            Transform::NeuronSwap { num_surrogates, pct } => {
                write!(f, "neuron_swap({}, {})", num_surrogates, pct)
            }
            Transform::ColSwap { pct } => write!(f, "col_swap({})", pct),
            Transform::MatrixSwap { pct } => write!(f, "matrix_swap({})", pct),
            Transform::ColSwapD { pct, dist } => write!(f, "col_swap_d({}, {})", pct, dist),
            Transform::UniformD { dist } => write!(f, "uniform_d({})", dist),
            Transform::PoissonD { dist } => write!(f, "poisson_d({})", dist),
            Transform::MeanD { dist } => write!(f, "mean_d({})", dist),
            Transform::ContactSwap { pct } => write!(f, "contact_swap({})", pct),
            Transform::SpikeJitter { dist } => write!(f, "spike_jitter({})", dist),
            Transform::ContactShift { t0 } => write!(f, "contact_shift({})", t0),
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use itertools::Itertools;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::core::interval::Interval;
    use crate::core::source::SpikeSource;

    const SEED: u64 = 42;
    const NUM_ROWS: usize = 10;
    const NUM_COLUMNS: usize = 200;

    // 10 rows of 200 columns of 0.25s over [0, 50]
    fn random_matrix(rng: &mut StdRng) -> RateMatrix {
        let rows: Vec<Vec<i32>> = (0..NUM_ROWS)
            .map(|i| {
                let max = 2 + i as i32;
                (0..NUM_COLUMNS).map(|_| rng.gen_range(0..=max)).collect()
            })
            .collect();
        let names: Vec<String> = (0..NUM_ROWS).map(|i| format!("n{:02}", i)).collect();
        RateMatrix::from_rows(names, rows, Interval::make(0.0, 50.0).unwrap(), 0.25).unwrap()
    }

    fn sorted_row(matrix: &RateMatrix, i: usize) -> Vec<i32> {
        matrix.row(i).unwrap().iter().copied().sorted().collect()
    }

    fn num_diff_rows(a: &RateMatrix, b: &RateMatrix) -> usize {
        (0..a.num_rows()).filter(|&i| a.row(i) != b.row(i)).count()
    }

    fn assert_same_parameters(a: &RateMatrix, b: &RateMatrix) {
        assert_eq!(a.interval(), b.interval());
        assert_eq!(a.bin_size(), b.bin_size());
        assert_eq!(a.window_width(), b.window_width());
        assert_eq!(a.title(), b.title());
        assert_eq!(a.num_columns(), b.num_columns());
    }

    #[test]
    fn test_neuron_drop() {
        let mut rng = StdRng::seed_from_u64(SEED);
        let mut matrix = random_matrix(&mut rng);
        matrix.set_window_width(3).unwrap();

        for num_drop in 1..NUM_ROWS {
            let dropped = with_neuron_drop(&matrix, num_drop, &mut rng).unwrap();
            assert_same_parameters(&matrix, &dropped);
            assert_eq!(dropped.num_rows(), NUM_ROWS - num_drop);

            for (i, name) in dropped.neuron_names().iter().enumerate() {
                assert_eq!(dropped.row(i), matrix.row_by_name(name));
            }
            // row order is kept
            assert!(dropped.neuron_names().windows(2).all(|w| w[0] < w[1]));
        }

        let same = with_neuron_drop(&matrix, 0, &mut rng).unwrap();
        assert_eq!(same, matrix);
        assert!(matches!(
            with_neuron_drop(&matrix, NUM_ROWS, &mut rng),
            Err(NDAError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_uniform_surrogates() {
        let mut rng = StdRng::seed_from_u64(SEED);
        let matrix = random_matrix(&mut rng);

        for k in 0..=NUM_ROWS {
            let surrogate =
                with_random_surrogates(&matrix, k, SurrogateKind::Uniform, &mut rng).unwrap();
            assert_same_parameters(&matrix, &surrogate);
            assert_eq!(num_diff_rows(&matrix, &surrogate), k);

            for i in 0..NUM_ROWS {
                let (old_min, old_max, _) = row_stats(matrix.row(i).unwrap()).unwrap();
                let (new_min, new_max, _) = row_stats(surrogate.row(i).unwrap()).unwrap();
                assert!(new_min >= old_min);
                assert!(new_max <= old_max);

                // untouched rows are shared with the original matrix
                if matrix.row(i) == surrogate.row(i) {
                    assert!(Arc::ptr_eq(
                        &matrix.shared_rows()[i],
                        &surrogate.shared_rows()[i]
                    ));
                }
            }
        }

        assert!(with_random_surrogates(&matrix, NUM_ROWS + 1, SurrogateKind::Uniform, &mut rng).is_err());
    }

    #[test]
    fn test_poisson_surrogates() {
        let mut rng = StdRng::seed_from_u64(SEED);
        let matrix = random_matrix(&mut rng);

        let surrogate =
            with_random_surrogates(&matrix, NUM_ROWS, SurrogateKind::Poisson, &mut rng).unwrap();
        assert_eq!(num_diff_rows(&matrix, &surrogate), NUM_ROWS);
        for i in 0..NUM_ROWS {
            let (_, _, old_mean) = row_stats(matrix.row(i).unwrap()).unwrap();
            let (new_min, _, new_mean) = row_stats(surrogate.row(i).unwrap()).unwrap();
            assert!(new_min >= 0);
            assert_relative_eq!(new_mean, old_mean, max_relative = 0.3);
        }

        // a silent row stays silent
        let zeros = RateMatrix::from_rows(
            vec!["a".to_string()],
            vec![vec![0; 10]],
            Interval::make(0.0, 2.5).unwrap(),
            0.25,
        )
        .unwrap();
        let surrogate = with_random_surrogates(&zeros, 1, SurrogateKind::Poisson, &mut rng).unwrap();
        assert_eq!(surrogate, zeros);
    }

    #[test]
    fn test_column_swap() {
        let mut rng = StdRng::seed_from_u64(SEED);
        let matrix = random_matrix(&mut rng);

        assert_eq!(with_column_swap(&matrix, 0.0, &mut rng).unwrap(), matrix);

        for pct in [0.3, 0.5, 1.0] {
            let swapped = with_column_swap(&matrix, pct, &mut rng).unwrap();
            assert_same_parameters(&matrix, &swapped);
            for i in 0..NUM_ROWS {
                assert_eq!(sorted_row(&swapped, i), sorted_row(&matrix, i));
            }

            // columns move as a whole
            let old_columns = (0..NUM_COLUMNS).map(|c| matrix.column(c).unwrap()).sorted().collect_vec();
            let new_columns = (0..NUM_COLUMNS).map(|c| swapped.column(c).unwrap()).sorted().collect_vec();
            assert_eq!(old_columns, new_columns);
        }
        assert_ne!(with_column_swap(&matrix, 1.0, &mut rng).unwrap(), matrix);

        assert!(matches!(
            with_column_swap(&matrix, 1.5, &mut rng),
            Err(NDAError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_neuron_swap() {
        let mut rng = StdRng::seed_from_u64(SEED);
        let matrix = random_matrix(&mut rng);

        let swapped = with_neuron_swap(&matrix, 3, 0.8, &mut rng).unwrap();
        assert_eq!(num_diff_rows(&matrix, &swapped), 3);
        for i in 0..NUM_ROWS {
            assert_eq!(sorted_row(&swapped, i), sorted_row(&matrix, i));
        }

        let same = with_neuron_swap(&matrix, NUM_ROWS, 0.0, &mut rng).unwrap();
        assert_eq!(same, matrix);
        assert!(with_neuron_swap(&matrix, 2, -0.1, &mut rng).is_err());
    }

    #[test]
    fn test_matrix_swap() {
        let mut rng = StdRng::seed_from_u64(SEED);
        let matrix = random_matrix(&mut rng);
        let all_values = |m: &RateMatrix| {
            (0..NUM_ROWS)
                .flat_map(|i| m.row(i).unwrap().to_vec())
                .sorted()
                .collect_vec()
        };

        assert_eq!(with_matrix_swap(&matrix, 0.0, &mut rng).unwrap(), matrix);

        let swapped = with_matrix_swap(&matrix, 0.5, &mut rng).unwrap();
        assert_same_parameters(&matrix, &swapped);
        assert_ne!(swapped, matrix);
        assert_eq!(all_values(&swapped), all_values(&matrix));
    }

    #[test]
    fn test_column_swap_dist() {
        let mut rng = StdRng::seed_from_u64(SEED);
        let matrix = random_matrix(&mut rng);

        // every row is a permutation of itself, swapped within 2 columns
        let swapped = with_column_swap_dist(&matrix, 0.5, 0.5, &mut rng).unwrap();
        assert_same_parameters(&matrix, &swapped);
        for i in 0..NUM_ROWS {
            assert_eq!(sorted_row(&swapped, i), sorted_row(&matrix, i));
        }
        assert_ne!(swapped, matrix);

        // a zero distance swaps every column with itself
        assert_eq!(with_column_swap_dist(&matrix, 1.0, 0.0, &mut rng).unwrap(), matrix);

        assert!(matches!(
            with_column_swap_dist(&matrix, 0.5, 60.0, &mut rng),
            Err(NDAError::OutOfRange(_))
        ));
    }

    #[test]
    fn test_column_swap_dist_locality() {
        let mut rng = StdRng::seed_from_u64(SEED);
        // every value of the row is its own column index
        let matrix = RateMatrix::from_rows(
            vec!["a".to_string()],
            vec![(0..NUM_COLUMNS as i32).collect()],
            Interval::make(0.0, 50.0).unwrap(),
            0.25,
        )
        .unwrap();

        // a single swap per row, hence a single displacement of at most 2 columns
        let swapped = with_column_swap_dist(&matrix, 1.0 / NUM_COLUMNS as f64, 0.5, &mut rng).unwrap();
        for (c, &value) in swapped.row(0).unwrap().iter().enumerate() {
            assert!((value - c as i32).abs() <= 2);
        }
    }

    #[test]
    fn test_dist_surrogates() {
        let mut rng = StdRng::seed_from_u64(SEED);
        let matrix = random_matrix(&mut rng);

        // windows of 4 columns
        for kind in [
            WindowSurrogateKind::UniformD,
            WindowSurrogateKind::PoissonD,
            WindowSurrogateKind::MeanD,
        ] {
            let surrogate = with_dist_surrogates(&matrix, kind, 1.0, &mut rng).unwrap();
            assert_same_parameters(&matrix, &surrogate);

            for i in 0..NUM_ROWS {
                let old_row = matrix.row(i).unwrap();
                let new_row = surrogate.row(i).unwrap();
                for (old, new) in old_row.chunks(4).zip(new_row.chunks(4)) {
                    let (min, max, mean) = row_stats(old).unwrap();
                    match kind {
                        WindowSurrogateKind::UniformD => {
                            assert!(new.iter().all(|&v| min <= v && v <= max))
                        }
                        WindowSurrogateKind::MeanD => {
                            assert!(new.iter().all(|&v| v == mean.round() as i32))
                        }
                        WindowSurrogateKind::PoissonD => assert!(new.iter().all(|&v| v >= 0)),
                    }
                }
            }
        }

        assert!(matches!(
            with_dist_surrogates(&matrix, WindowSurrogateKind::MeanD, 0.1, &mut rng),
            Err(NDAError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            with_dist_surrogates(&matrix, WindowSurrogateKind::MeanD, 51.0, &mut rng),
            Err(NDAError::OutOfRange(_))
        ));
    }

    #[test]
    fn test_contact_swap() {
        let mut rng = StdRng::seed_from_u64(SEED);
        let matrix = random_matrix(&mut rng);
        let contacts = Contacts::build(vec![
            ("ball", Interval::make(5.0, 10.0).unwrap()),
            ("food", Interval::make(30.0, 32.0).unwrap()),
        ])
        .unwrap();
        // bins 20..=40 and 120..=128
        let in_contact = |c: usize| (20..=40).contains(&c) || (120..=128).contains(&c);

        for pct in [0.0, 0.3, 0.5, 1.0] {
            let swapped = with_contact_swap(&matrix, &contacts, pct, &mut rng).unwrap();
            assert_same_parameters(&matrix, &swapped);

            let mut num_diff_columns = 0;
            for c in 0..NUM_COLUMNS {
                if in_contact(c) {
                    if matrix.column(c) != swapped.column(c) {
                        num_diff_columns += 1;
                    }
                } else {
                    assert_eq!(matrix.column(c), swapped.column(c));
                }
            }
            assert!(num_diff_columns <= 30);
            if pct == 0.0 {
                assert_eq!(num_diff_columns, 0);
            }
        }
    }

    #[test]
    fn test_spike_jitter() {
        let mut rng = StdRng::seed_from_u64(SEED);
        let spikes = SpikeTrains::build(vec![
            ("a", vec![0.01, 1.0, 2.0, 2.05, 7.5]),
            ("b", vec![3.0, 3.3]),
        ])
        .unwrap();

        let jittered = with_spike_jitter(&spikes, 0.1, &mut rng).unwrap();
        assert_eq!(jittered.neuron_names(), spikes.neuron_names());
        assert_eq!(jittered.num_spikes(), spikes.num_spikes());
        for name in spikes.neuron_names() {
            let old = spikes.spike_times_for(&name).unwrap();
            let new = jittered.spike_times_for(&name).unwrap();
            assert!(new.windows(2).all(|w| w[0] <= w[1]));
            assert!(new.iter().all(|&t| t >= 0.0));
            let old_sum: f64 = old.iter().sum();
            let new_sum: f64 = new.iter().sum();
            assert!((old_sum - new_sum).abs() <= 0.1 * old.len() as f64);
        }

        assert_eq!(with_spike_jitter(&spikes, 0.0, &mut rng).unwrap(), spikes);
        assert!(with_spike_jitter(&spikes, -1.0, &mut rng).is_err());
    }

    #[test]
    fn test_contact_shift() {
        let contacts = Contacts::build(vec![
            ("ball", Interval::make(12.0, 14.0).unwrap()),
            ("food", Interval::make(20.0, 21.0).unwrap()),
        ])
        .unwrap();

        for t0 in [0.0, 300.0, 5000.0] {
            let shifted = with_contact_shift(&contacts, t0).unwrap();
            let exposition = shifted.exposition_interval();
            assert_relative_eq!(exposition.start(), t0);
            assert_relative_eq!(
                exposition.duration(),
                contacts.exposition_interval().duration(),
                epsilon = 1e-8
            );
            assert_eq!(shifted.label_set(), contacts.label_set());
        }

        assert!(with_contact_shift(&Contacts::default(), 1.0).is_err());
    }

    #[test]
    fn test_transform_serde() {
        let transform: Transform =
            serde_json::from_str(r#"{"type": "col_swap_d", "pct": 0.5, "dist": 1.0}"#).unwrap();
        assert_eq!(transform, Transform::ColSwapD { pct: 0.5, dist: 1.0 });
        assert_eq!(transform.to_string(), "col_swap_d(0.5, 1)");

        let transform: Transform =
            serde_json::from_str(r#"{"type": "neuron_drop", "num_drop": 3}"#).unwrap();
        assert_eq!(transform, Transform::NeuronDrop { num_drop: 3 });
        assert!(!transform.is_source_transform());
        assert!(Transform::SpikeJitter { dist: 0.1 }.is_source_transform());

        assert!("poisson".parse::<SurrogateKind>().is_ok());
        assert!("mean_d".parse::<WindowSurrogateKind>().is_ok());
        assert!("gaussian".parse::<SurrogateKind>().is_err());
    }

    #[test]
    fn test_transform_apply() {
        let mut rng = StdRng::seed_from_u64(SEED);
        let matrix = random_matrix(&mut rng);
        let contacts = Contacts::build(vec![("ball", Interval::make(5.0, 10.0).unwrap())]).unwrap();

        let dropped = Transform::NeuronDrop { num_drop: 4 }
            .apply(&matrix, &contacts, &mut rng)
            .unwrap();
        assert_eq!(dropped.num_rows(), NUM_ROWS - 4);

        let same = Transform::ContactShift { t0: 0.0 }
            .apply(&matrix, &contacts, &mut rng)
            .unwrap();
        assert_eq!(same, matrix);

        let shifted = Transform::ContactShift { t0: 0.0 }.apply_to_contacts(&contacts).unwrap();
        assert_eq!(shifted.exposition_interval(), Interval::make(0.0, 5.0).unwrap());
    }
}
