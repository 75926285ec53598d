use rand::rngs::StdRng;
use rand::seq::index;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::catalog::FocusQuestionPool;
use super::domain::FocusQuestion;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamplerConfig {
    pub sample_size: usize,
    pub seed: u64,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            sample_size: 3,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SamplingError {
    #[error("requested {requested} focus questions but the pool only holds {available}")]
    InsufficientPool { requested: usize, available: usize },
}

/// Draws without replacement. The same `(pool, size, seed)` always yields the same
/// ordered sample.
pub fn sample<T: Clone>(pool: &[T], size: usize, seed: u64) -> Result<Vec<T>, SamplingError> {
    if size > pool.len() {
        return Err(SamplingError::InsufficientPool {
            requested: size,
            available: pool.len(),
        });
    }

    let mut rng = StdRng::seed_from_u64(seed);
    Ok(index::sample(&mut rng, pool.len(), size)
        .into_iter()
        .map(|position| pool[position].clone())
        .collect())
}

#[derive(Debug, Clone, Default)]
pub struct FocusQuestionSampler {
    config: SamplerConfig,
}

impl FocusQuestionSampler {
    pub fn new(config: SamplerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    pub fn draw(&self, pool: &FocusQuestionPool) -> Result<Vec<FocusQuestion>, SamplingError> {
        let drawn = sample(pool.questions(), self.config.sample_size, self.config.seed)?;
        debug!(
            pool = pool.len(),
            size = self.config.sample_size,
            seed = self.config.seed,
            "sampled focus questions"
        );
        Ok(drawn)
    }
}
