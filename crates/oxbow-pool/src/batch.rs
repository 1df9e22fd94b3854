//! Row selection and the selected sub-batch.
//!
//! [`SessionPool::select`] gathers pool rows at caller-given indices
//! into a [`SessionBatch`]. The batch owns copies of the gathered rows
//! (copy-on-select), so later pool mutation cannot corrupt a batch
//! already handed to a training loop.

use crate::storage::SessionPool;
use oxbow_core::{PoolError, Tensor};

/// An immutable snapshot of selected pool rows.
///
/// Carries every stream restricted to the selected rows, in selection
/// order. Rows selected more than once appear more than once. The
/// batch also exposes the pool's replay-environment surface (padded
/// lookahead stepping and reward lookup), so a sampled sub-batch can
/// stand in for a live environment during training.
#[derive(Clone, Debug)]
pub struct SessionBatch {
    pub(crate) observations: Vec<Tensor>,
    pub(crate) actions: Vec<Tensor>,
    pub(crate) rewards: Tensor,
    pub(crate) liveness: Tensor,
    pub(crate) preceding_memories: Vec<Tensor>,
}

impl SessionBatch {
    /// Number of rows in the batch.
    pub fn len(&self) -> usize {
        self.rewards.shape()[0]
    }

    /// Whether the batch holds no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ticks per trajectory.
    pub fn sequence_length(&self) -> usize {
        self.rewards.shape()[1]
    }

    /// Gathered observation arrays, one per channel.
    pub fn observations(&self) -> &[Tensor] {
        &self.observations
    }

    /// Gathered action arrays, one per channel.
    pub fn actions(&self) -> &[Tensor] {
        &self.actions
    }

    /// Gathered reward rows.
    pub fn rewards(&self) -> &Tensor {
        &self.rewards
    }

    /// Gathered liveness rows.
    pub fn liveness(&self) -> &Tensor {
        &self.liveness
    }

    /// Gathered preceding memory rows, one array per channel.
    pub fn preceding_memories(&self) -> &[Tensor] {
        &self.preceding_memories
    }

    /// Zero-padded lookahead view of one observation channel, shaped
    /// `[len, sequence_length + 1, ..]`. `None` if the channel index
    /// is out of range.
    pub fn padded_observation(&self, channel: usize) -> Option<Tensor> {
        self.observations.get(channel).map(Tensor::pad_time)
    }
}

impl SessionPool {
    /// Gather the rows at `indices` into a [`SessionBatch`].
    ///
    /// Indices need not be unique or sorted; repeats duplicate rows.
    ///
    /// # Errors
    ///
    /// [`PoolError::IndexOutOfRange`] if any index is outside
    /// `[0, pool_size)`. The pool itself is never mutated by selection.
    pub fn select(&self, indices: &[usize]) -> Result<SessionBatch, PoolError> {
        for &index in indices {
            self.check_row(index)?;
        }
        Ok(SessionBatch {
            observations: self
                .observations
                .iter()
                .map(|s| s.tensor().gather_rows(indices))
                .collect(),
            actions: self
                .actions
                .iter()
                .map(|s| s.tensor().gather_rows(indices))
                .collect(),
            rewards: self.rewards.tensor().gather_rows(indices),
            liveness: self.liveness.tensor().gather_rows(indices),
            preceding_memories: self
                .memories
                .iter()
                .map(|s| s.tensor().gather_rows(indices))
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::TrajectoryBatch;
    use crate::storage::PoolConfig;
    use oxbow_core::Dtype;

    fn loaded_pool(n: usize) -> SessionPool {
        let mut pool = SessionPool::new(PoolConfig::default());
        let rewards: Vec<f32> = (0..n).flat_map(|r| std::iter::repeat(r as f32).take(5)).collect();
        pool.load(TrajectoryBatch::new(
            vec![Tensor::from_f32(
                &[n, 5, 2],
                (0..n * 10).map(|x| x as f32).collect(),
            )],
            vec![Tensor::from_i32(&[n, 5], (0..n as i32 * 5).collect())],
            Tensor::from_f32(&[n, 5], rewards),
        ))
        .unwrap();
        pool
    }

    #[test]
    fn select_preserves_order_and_repeats() {
        let pool = loaded_pool(4);
        let batch = pool.select(&[2, 2, 0]).unwrap();
        assert_eq!(batch.len(), 3);
        assert_eq!(batch.rewards().row(0), batch.rewards().row(1));
        assert_eq!(batch.rewards().row(0), pool.rewards().tensor().row(2));
        assert_eq!(batch.rewards().row(2), pool.rewards().tensor().row(0));
    }

    #[test]
    fn select_rejects_out_of_range_index() {
        let pool = loaded_pool(3);
        let err = pool.select(&[1, 3]).unwrap_err();
        assert_eq!(err, PoolError::IndexOutOfRange { index: 3, bound: 3 });
    }

    #[test]
    fn batch_is_a_snapshot() {
        let mut pool = loaded_pool(3);
        let batch = pool.select(&[1]).unwrap();
        let before = batch.rewards().clone();

        // Mutate the pool after selection.
        pool.load(TrajectoryBatch::new(
            vec![Tensor::zeros(&[2, 5, 2], Dtype::F32)],
            vec![Tensor::zeros(&[2, 5], Dtype::I32)],
            Tensor::zeros(&[2, 5], Dtype::F32),
        ))
        .unwrap();

        assert_eq!(batch.rewards(), &before);
    }

    #[test]
    fn empty_selection_is_legal() {
        let pool = loaded_pool(3);
        let batch = pool.select(&[]).unwrap();
        assert!(batch.is_empty());
        assert_eq!(batch.observations()[0].shape(), &[0, 5, 2]);
    }
}
