//! Utility functions shared by the sampler and the transforms.
use rand::seq::index;
use rand::Rng;

use crate::error::NDAError;

/// Draw `amount` distinct indices uniformly at random in `0..length`, in draw order.
/// The function returns an error if `amount > length`.
pub fn random_n_sample<R: Rng + ?Sized>(
    length: usize,
    amount: usize,
    rng: &mut R,
) -> Result<Vec<usize>, NDAError> {
    if amount > length {
        return Err(NDAError::InvalidConfiguration(format!(
            "can't draw {} distinct indices out of {}",
            amount, length
        )));
    }
    Ok(index::sample(rng, length, amount).into_vec())
}

/// Returns the minimum, maximum and mean of a non-empty row of counts.
pub fn row_stats(row: &[i32]) -> Option<(i32, i32, f64)> {
    let min = *row.iter().min()?;
    let max = *row.iter().max()?;
    let mean = row.iter().map(|&count| count as f64).sum::<f64>() / row.len() as f64;
    Some((min, max, mean))
}

/// Check that `pct` is a fraction in `[0, 1]`.
pub fn check_pct(pct: f64) -> Result<(), NDAError> {
    if (0.0..=1.0).contains(&pct) {
        Ok(())
    } else {
        Err(NDAError::InvalidConfiguration(format!(
            "percentage must be in [0, 1], got {}",
            pct
        )))
    }
}

/// The number of operations corresponding to a fraction `pct` of `total`, rounded to the
/// nearest integer.
pub fn pct_count(pct: f64, total: usize) -> usize {
    (pct * total as f64).round() as usize
}
