//! Dataset generation: from spike trains, contacts and a setup to train and test pattern sets.
//!
//! Independent datasets are built in parallel. Base rate matrices are shared between datasets
//! with the same parameter choice through a [`MatrixCache`].
use std::fs;
use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::Arc;

use derivative::Derivative;
use lru::LruCache;
use parking_lot::Mutex;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use crate::core::pattern_set::PatternSet;
use crate::core::rate_matrix::RateMatrix;
use crate::core::source::{Contacts, SpikeSource, SpikeTrains};
use crate::error::{NDAError, Split};
use crate::sampler::PatternSampler;
use crate::setup::{Dataset, GeneratorSetup};
use crate::transform::Transform;

/// The train and test pattern sets of a round.
pub type RoundSets = (PatternSet, PatternSet);

/// A capacity-bounded cache of rate matrices, keyed by parameter choice id and area filter.
///
/// The cache can be shared between threads. A matrix is inserted once fully built, so a
/// reader never observes a partial matrix.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct MatrixCache {
    capacity: usize,
    #[derivative(Debug = "ignore")]
    matrices: Mutex<LruCache<(usize, String), Arc<RateMatrix>>>,
}

impl MatrixCache {
    /// Create an empty cache holding at most `capacity` matrices.
    pub fn new(capacity: usize) -> Result<Self, NDAError> {
        let size = NonZeroUsize::new(capacity).ok_or_else(|| {
            NDAError::InvalidConfiguration("cache capacity must be positive".to_string())
        })?;
        Ok(MatrixCache {
            capacity,
            matrices: Mutex::new(LruCache::new(size)),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.matrices.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.matrices.lock().is_empty()
    }

    pub fn get(&self, param_id: usize, areas: &str) -> Option<Arc<RateMatrix>> {
        self.matrices
            .lock()
            .get(&(param_id, areas.to_string()))
            .cloned()
    }

    pub fn put(&self, param_id: usize, areas: &str, matrix: Arc<RateMatrix>) {
        self.matrices.lock().put((param_id, areas.to_string()), matrix);
    }

    /// Returns the cached matrix of the key, or builds and caches it.
    /// The lock is not held while building.
    pub fn get_or_build<F>(&self, param_id: usize, areas: &str, build: F) -> Result<Arc<RateMatrix>, NDAError>
    where
        F: FnOnce() -> Result<RateMatrix, NDAError>,
    {
        if let Some(matrix) = self.get(param_id, areas) {
            log::debug!("Matrix cache hit: p{} ({})", param_id, areas);
            return Ok(matrix);
        }

        log::debug!("Matrix cache miss: p{} ({})", param_id, areas);
        let matrix = Arc::new(build()?);
        self.put(param_id, areas, matrix.clone());
        Ok(matrix)
    }
}

/// Builds the datasets of a setup.
#[derive(Debug)]
pub struct Generator {
    spikes: SpikeTrains,
    contacts: Contacts,
    setup: GeneratorSetup,
    cache: MatrixCache,
}

impl Generator {
    pub fn new(spikes: SpikeTrains, contacts: Contacts, setup: GeneratorSetup) -> Result<Self, NDAError> {
        let cache = MatrixCache::new(setup.cache_size)?;
        Ok(Generator {
            spikes,
            contacts,
            setup,
            cache,
        })
    }

    pub fn setup(&self) -> &GeneratorSetup {
        &self.setup
    }

    pub fn cache(&self) -> &MatrixCache {
        &self.cache
    }

    /// Expand the setup into datasets, counting neurons in the spike trains.
    pub fn datasets(&self) -> Result<Vec<Dataset>, NDAError> {
        self.setup
            .expand(|areas| self.spikes.with_filter(areas).num_neurons())
    }

    fn build_matrix(spikes: &SpikeTrains, dataset: &Dataset) -> Result<RateMatrix, NDAError> {
        let mut matrix = RateMatrix::from_spike_source(spikes, dataset.bin_size)?;
        matrix.set_window_width(dataset.window_width)?;
        Ok(matrix)
    }

    /// Build every round of a dataset.
    ///
    /// The base matrix is taken from the cache, except for jittered spike trains which give a
    /// new matrix every round. The dataset perturbation is applied anew for every round.
    pub fn build_dataset<R: Rng + ?Sized>(&self, dataset: &Dataset, rng: &mut R) -> Result<Vec<RoundSets>, NDAError> {
        let spikes = self.spikes.with_filter(&dataset.areas);
        let contacts = match &dataset.transform {
            Some(transform) => transform.apply_to_contacts(&self.contacts)?,
            None => self.contacts.clone(),
        };

        let mut rounds = Vec::with_capacity(dataset.rounds);
        for round in 1..=dataset.rounds {
            let mut matrix = match dataset.transform {
                Some(transform @ Transform::SpikeJitter { .. }) => {
                    let spikes = transform.apply_to_spikes(&spikes, rng)?;
                    Self::build_matrix(&spikes, dataset)?
                }
                transform => {
                    let base = self.cache.get_or_build(dataset.param_id, &dataset.areas, || {
                        Self::build_matrix(&spikes, dataset)
                    })?;
                    match transform {
                        Some(transform) => transform.apply(&base, &contacts, rng)?,
                        None => (*base).clone(),
                    }
                }
            };
            matrix.set_title(&dataset.full_name());

            let sampler = PatternSampler::new(&matrix, &contacts);
            rounds.push(sampler.sample_round(
                &dataset.file_stem(Split::Train, round),
                &dataset.file_stem(Split::Test, round),
                &dataset.classes,
                rng,
            )?);
        }

        Ok(rounds)
    }

    /// Build the datasets in parallel, one result per dataset.
    ///
    /// Dataset `i` draws from its own generator seeded with `seed + i`, so the results do not
    /// depend on the scheduling. A failing dataset does not stop the others.
    pub fn generate(&self, datasets: &[Dataset]) -> Vec<Result<Vec<RoundSets>, NDAError>> {
        log::info!(
            "Generating {} datasets for setup {}",
            datasets.len(),
            self.setup.name
        );

        datasets
            .par_iter()
            .enumerate()
            .map(|(i, dataset)| {
                let mut rng = ChaCha8Rng::seed_from_u64(self.setup.seed.wrapping_add(i as u64));
                let result = self.build_dataset(dataset, &mut rng);
                match &result {
                    Ok(_) => log::info!("Dataset {} built", dataset.full_name()),
                    Err(e) => log::warn!("Dataset {} failed: {}", dataset.full_name(), e),
                }
                result
            })
            .collect()
    }

    /// Expand the setup and build every dataset.
    pub fn run(&self) -> Result<Vec<(Dataset, Result<Vec<RoundSets>, NDAError>)>, NDAError> {
        let datasets = self.datasets()?;
        let results = self.generate(&datasets);
        Ok(datasets.into_iter().zip(results).collect())
    }
}

/// Save every pattern set of the rounds in `dir`, as `<name>.json`.
pub fn save_rounds<P: AsRef<Path>>(dir: P, rounds: &[RoundSets]) -> Result<(), NDAError> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir).map_err(|e| NDAError::IOError(e.to_string()))?;
    for (train, test) in rounds {
        train.save_to(dir.join(format!("{}.json", train.name())))?;
        test.save_to(dir.join(format!("{}.json", test.name())))?;
    }
    Ok(())
}
