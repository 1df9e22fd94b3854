//! Update-set staging for transactional consumers.
//!
//! Some embeddings apply stream replacements through an external
//! transactional-assignment layer (a compute-graph update list) rather
//! than mutating the pool directly. [`SessionPool::session_updates`]
//! stages that hand-off: it maps each supplied stream to its pending
//! replacement value without touching storage. The mapping is
//! insertion-ordered (observations, actions, reward, liveness,
//! memories) so consumers apply updates deterministically.

use crate::ingest::TrajectoryBatch;
use crate::storage::SessionPool;
use indexmap::IndexMap;
use oxbow_core::{PoolError, StreamKey, Tensor};

impl SessionPool {
    /// Stage a replacement value for every stream `batch` supplies.
    ///
    /// With `cast_dtypes`, each value is cast to its stream's fixed
    /// dtype; otherwise values are passed through unchanged. Storage
    /// is not mutated.
    ///
    /// # Errors
    ///
    /// [`PoolError::ChannelCountMismatch`] under the same arity
    /// validation as [`load`](Self::load), for whichever channel
    /// groups are supplied.
    pub fn session_updates(
        &self,
        batch: &TrajectoryBatch,
        cast_dtypes: bool,
    ) -> Result<IndexMap<StreamKey, Tensor>, PoolError> {
        self.validate_channel_counts(batch)?;

        let stage = |tensor: &Tensor, dtype| {
            if cast_dtypes {
                tensor.cast(dtype)
            } else {
                tensor.clone()
            }
        };

        let mut updates = IndexMap::new();
        for (k, (stream, tensor)) in self.observations.iter().zip(&batch.observations).enumerate()
        {
            updates.insert(StreamKey::Observation(k), stage(tensor, stream.dtype()));
        }
        for (k, (stream, tensor)) in self.actions.iter().zip(&batch.actions).enumerate() {
            updates.insert(StreamKey::Action(k), stage(tensor, stream.dtype()));
        }
        updates.insert(StreamKey::Reward, stage(&batch.rewards, self.rewards.dtype()));
        if let Some(liveness) = &batch.liveness {
            updates.insert(StreamKey::Liveness, stage(liveness, self.liveness.dtype()));
        }
        if let Some(memories) = &batch.preceding_memories {
            for (k, (stream, tensor)) in self.memories.iter().zip(memories).enumerate() {
                updates.insert(StreamKey::PrecedingMemory(k), stage(tensor, stream.dtype()));
            }
        }
        Ok(updates)
    }
}
