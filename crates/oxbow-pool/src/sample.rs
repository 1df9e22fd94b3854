//! Uniform random sampling of pool rows.
//!
//! The RNG is owned by the pool and seeded at construction, so sampling
//! sequences are reproducible across runs given the same seed and call
//! order. Sampling delegates to [`SessionPool::select`], so a sampled
//! batch is the same copy-on-select snapshot a selection produces.

use crate::batch::SessionBatch;
use crate::storage::SessionPool;
use oxbow_core::PoolError;
use rand::Rng;

impl SessionPool {
    /// Draw a uniformly random sub-batch of stored trajectories.
    ///
    /// With `replace`, draws exactly `max_n_samples` indices with
    /// repetition allowed. Without, draws `min(max_n_samples,
    /// pool_size)` distinct indices.
    pub fn sample(
        &mut self,
        max_n_samples: usize,
        replace: bool,
    ) -> Result<SessionBatch, PoolError> {
        let pool_size = self.pool_size();
        let indices: Vec<usize> = if pool_size == 0 {
            Vec::new()
        } else if replace {
            (0..max_n_samples)
                .map(|_| self.rng.random_range(0..pool_size))
                .collect()
        } else {
            rand::seq::index::sample(&mut self.rng, pool_size, max_n_samples.min(pool_size))
                .into_vec()
        };
        self.select(&indices)
    }
}
