//! Bulk load and capacity-bounded append.
//!
//! Both entry points follow a copy-then-swap discipline: every
//! supplied array is validated and cast into a fresh tensor before any
//! stream is touched, so a failed call leaves prior storage completely
//! unchanged and an embedding that wraps the pool in a lock observes
//! either the pre- or post-mutation storage, never a mix.
//!
//! [`SessionPool::append`] concatenates along the pool axis (oldest
//! rows first) and, when `max_pool_size` is given, truncates **every**
//! stream to the most recent rows before committing through the load
//! path. Truncation is uniform across observations, actions, rewards,
//! liveness, and memories; dropping it from any one stream would break
//! the parallel-array invariant.

use crate::storage::{SessionPool, Stream};
use oxbow_core::{ChannelGroup, PoolError, Tensor};

/// A batch of recorded trajectories handed to [`SessionPool::load`] or
/// [`SessionPool::append`].
///
/// Observation and action arrays are `[pool, time, *element_shape]`,
/// rewards and liveness are `[pool, time]`, preceding memories are
/// `[pool, *element_shape]`. Liveness and memories are optional; see
/// the load/append docs for omission semantics.
///
/// # Examples
///
/// ```
/// use oxbow_core::Tensor;
/// use oxbow_pool::TrajectoryBatch;
///
/// let batch = TrajectoryBatch::new(
///     vec![Tensor::zeros(&[3, 5, 2], oxbow_core::Dtype::F32)],
///     vec![Tensor::zeros(&[3, 5], oxbow_core::Dtype::I32)],
///     Tensor::zeros(&[3, 5], oxbow_core::Dtype::F32),
/// )
/// .with_liveness(Tensor::ones(&[3, 5], oxbow_core::Dtype::U8));
/// assert!(batch.liveness.is_some());
/// ```
#[derive(Clone, Debug)]
pub struct TrajectoryBatch {
    /// One array per observation channel.
    pub observations: Vec<Tensor>,
    /// One array per action channel.
    pub actions: Vec<Tensor>,
    /// Scalar reward per tick.
    pub rewards: Tensor,
    /// 0/1 flag per tick; omitted streams follow the pool's omission
    /// rules.
    pub liveness: Option<Tensor>,
    /// One array per memory channel (agent state before tick 0).
    pub preceding_memories: Option<Vec<Tensor>>,
}

impl TrajectoryBatch {
    /// A batch with the mandatory streams and no optional ones.
    pub fn new(observations: Vec<Tensor>, actions: Vec<Tensor>, rewards: Tensor) -> Self {
        Self {
            observations,
            actions,
            rewards,
            liveness: None,
            preceding_memories: None,
        }
    }

    /// Attach per-tick liveness flags.
    pub fn with_liveness(mut self, liveness: Tensor) -> Self {
        self.liveness = Some(liveness);
        self
    }

    /// Attach preceding agent memory snapshots.
    pub fn with_preceding_memories(mut self, memories: Vec<Tensor>) -> Self {
        self.preceding_memories = Some(memories);
        self
    }
}

impl SessionPool {
    /// Bulk-replace the pool contents with `batch`.
    ///
    /// Every supplied array is cast to its stream's fixed dtype. An
    /// omitted optional stream is left untouched if it was previously
    /// populated (its extents must still agree with the loaded
    /// extents), or regrown as a placeholder at the new extents if it
    /// never was.
    ///
    /// # Errors
    ///
    /// [`PoolError::ChannelCountMismatch`] if an array count disagrees
    /// with the channel counts fixed at construction;
    /// [`PoolError::ShapeMismatch`] if any array's extents disagree
    /// with the stream layout or with each other. On error the pool is
    /// unchanged.
    pub fn load(&mut self, batch: TrajectoryBatch) -> Result<(), PoolError> {
        self.validate_channel_counts(&batch)?;

        if batch.rewards.rank() != 2 {
            return Err(shape_err(
                &self.rewards,
                format!("expected [pool, time], got rank {}", batch.rewards.rank()),
            ));
        }
        let pool = batch.rewards.shape()[0];
        let time = batch.rewards.shape()[1];
        let lead = [pool, time];

        for (stream, tensor) in self.observations.iter().zip(&batch.observations) {
            validate_block(stream, tensor, &lead)?;
        }
        for (stream, tensor) in self.actions.iter().zip(&batch.actions) {
            validate_block(stream, tensor, &lead)?;
        }
        if let Some(liveness) = &batch.liveness {
            validate_block(&self.liveness, liveness, &lead)?;
        } else if self.liveness.is_populated() {
            validate_retained(&self.liveness, &lead)?;
        }
        if let Some(memories) = &batch.preceding_memories {
            for (stream, tensor) in self.memories.iter().zip(memories) {
                validate_block(stream, tensor, &lead[..1])?;
            }
        } else {
            for stream in &self.memories {
                if stream.is_populated() {
                    validate_retained(stream, &lead[..1])?;
                }
            }
        }

        // Validation complete; cast and swap.
        let new_obs: Vec<Tensor> = self
            .observations
            .iter()
            .zip(&batch.observations)
            .map(|(s, t)| t.cast(s.dtype()))
            .collect();
        let new_actions: Vec<Tensor> = self
            .actions
            .iter()
            .zip(&batch.actions)
            .map(|(s, t)| t.cast(s.dtype()))
            .collect();
        let new_rewards = batch.rewards.cast(self.rewards.dtype());
        let new_liveness = batch.liveness.map(|t| t.cast(self.liveness.dtype()));
        let new_memories: Option<Vec<Tensor>> = batch.preceding_memories.map(|ms| {
            self.memories
                .iter()
                .zip(ms)
                .map(|(s, t)| t.cast(s.dtype()))
                .collect()
        });

        for (stream, tensor) in self.observations.iter_mut().zip(new_obs) {
            stream.replace(tensor, true);
        }
        for (stream, tensor) in self.actions.iter_mut().zip(new_actions) {
            stream.replace(tensor, true);
        }
        self.rewards.replace(new_rewards, true);
        match new_liveness {
            Some(tensor) => self.liveness.replace(tensor, true),
            None if !self.liveness.is_populated() => {
                self.liveness.regrow_placeholder(&lead, true);
            }
            None => {}
        }
        match new_memories {
            Some(tensors) => {
                for (stream, tensor) in self.memories.iter_mut().zip(tensors) {
                    stream.replace(tensor, true);
                }
            }
            None => {
                for stream in &mut self.memories {
                    if !stream.is_populated() {
                        stream.regrow_placeholder(&lead[..1], false);
                    }
                }
            }
        }
        Ok(())
    }

    /// Concatenate `batch` onto the stored trajectories, oldest first.
    ///
    /// If `max_pool_size` is given and the grown pool exceeds it, all
    /// streams are uniformly truncated to the most recent
    /// `max_pool_size` rows before committing. The commit goes through
    /// [`load`](Self::load) and inherits its atomicity.
    ///
    /// # Errors
    ///
    /// [`PoolError::ChannelCountMismatch`] and
    /// [`PoolError::ShapeMismatch`] as for load;
    /// [`PoolError::MissingStream`] if liveness or memories were
    /// previously populated but omitted here — recorded rows cannot be
    /// concatenated against an omitted stream. On error the pool is
    /// unchanged.
    pub fn append(
        &mut self,
        batch: TrajectoryBatch,
        max_pool_size: Option<usize>,
    ) -> Result<(), PoolError> {
        self.validate_channel_counts(&batch)?;

        if batch.rewards.rank() != 2 {
            return Err(shape_err(
                &self.rewards,
                format!("expected [pool, time], got rank {}", batch.rewards.rank()),
            ));
        }
        let added = batch.rewards.shape()[0];
        let time = batch.rewards.shape()[1];
        if time != self.sequence_length() {
            return Err(shape_err(
                &self.rewards,
                format!(
                    "appended sequence length {time} differs from pool sequence length {}",
                    self.sequence_length()
                ),
            ));
        }
        let lead = [added, time];

        for (stream, tensor) in self.observations.iter().zip(&batch.observations) {
            validate_block(stream, tensor, &lead)?;
        }
        for (stream, tensor) in self.actions.iter().zip(&batch.actions) {
            validate_block(stream, tensor, &lead)?;
        }
        if let Some(liveness) = &batch.liveness {
            validate_block(&self.liveness, liveness, &lead)?;
        } else if self.liveness.is_populated() {
            return Err(PoolError::MissingStream {
                stream: self.liveness.name().to_string(),
            });
        }
        if let Some(memories) = &batch.preceding_memories {
            for (stream, tensor) in self.memories.iter().zip(memories) {
                validate_block(stream, tensor, &lead[..1])?;
            }
        } else if let Some(stream) = self.memories.iter().find(|s| s.is_populated()) {
            return Err(PoolError::MissingStream {
                stream: stream.name().to_string(),
            });
        }

        // Concatenate every supplied stream onto the current contents.
        let mut obs: Vec<Tensor> = self
            .observations
            .iter()
            .zip(&batch.observations)
            .map(|(s, t)| s.tensor().concat_rows(&t.cast(s.dtype())))
            .collect();
        let mut actions: Vec<Tensor> = self
            .actions
            .iter()
            .zip(&batch.actions)
            .map(|(s, t)| s.tensor().concat_rows(&t.cast(s.dtype())))
            .collect();
        let mut rewards = self
            .rewards
            .tensor()
            .concat_rows(&batch.rewards.cast(self.rewards.dtype()));
        let mut liveness = batch
            .liveness
            .map(|t| self.liveness.tensor().concat_rows(&t.cast(self.liveness.dtype())));
        let mut memories: Option<Vec<Tensor>> = batch.preceding_memories.map(|ms| {
            self.memories
                .iter()
                .zip(ms)
                .map(|(s, t)| s.tensor().concat_rows(&t.cast(s.dtype())))
                .collect()
        });

        // Oldest-first eviction, applied to all streams uniformly.
        if let Some(max) = max_pool_size {
            if rewards.shape()[0] > max {
                for t in obs.iter_mut().chain(actions.iter_mut()) {
                    *t = t.last_rows(max);
                }
                rewards = rewards.last_rows(max);
                if let Some(t) = liveness.as_mut() {
                    *t = t.last_rows(max);
                }
                if let Some(ms) = memories.as_mut() {
                    for t in ms.iter_mut() {
                        *t = t.last_rows(max);
                    }
                }
            }
        }

        self.load(TrajectoryBatch {
            observations: obs,
            actions,
            rewards,
            liveness,
            preceding_memories: memories,
        })
    }

    pub(crate) fn validate_channel_counts(&self, batch: &TrajectoryBatch) -> Result<(), PoolError> {
        if batch.observations.len() != self.observations.len() {
            return Err(PoolError::ChannelCountMismatch {
                group: ChannelGroup::Observations,
                expected: self.observations.len(),
                got: batch.observations.len(),
            });
        }
        if batch.actions.len() != self.actions.len() {
            return Err(PoolError::ChannelCountMismatch {
                group: ChannelGroup::Actions,
                expected: self.actions.len(),
                got: batch.actions.len(),
            });
        }
        if let Some(memories) = &batch.preceding_memories {
            if memories.len() != self.memories.len() {
                return Err(PoolError::ChannelCountMismatch {
                    group: ChannelGroup::Memories,
                    expected: self.memories.len(),
                    got: memories.len(),
                });
            }
        }
        Ok(())
    }
}

fn shape_err(stream: &Stream, detail: String) -> PoolError {
    PoolError::ShapeMismatch {
        stream: stream.name().to_string(),
        detail,
    }
}

/// Check one supplied array against a stream's fixed layout and the
/// shared leading extents.
fn validate_block(stream: &Stream, tensor: &Tensor, lead: &[usize]) -> Result<(), PoolError> {
    let expected_rank = lead.len() + stream.elem_shape().len();
    if tensor.rank() != expected_rank {
        return Err(shape_err(
            stream,
            format!("expected rank {expected_rank}, got rank {}", tensor.rank()),
        ));
    }
    if &tensor.shape()[..lead.len()] != lead {
        return Err(shape_err(
            stream,
            format!(
                "leading extents {:?} do not match {:?}",
                &tensor.shape()[..lead.len()],
                lead
            ),
        ));
    }
    if &tensor.shape()[lead.len()..] != stream.elem_shape() {
        return Err(shape_err(
            stream,
            format!(
                "element shape {:?} does not match fixed shape {:?}",
                &tensor.shape()[lead.len()..],
                stream.elem_shape()
            ),
        ));
    }
    Ok(())
}

/// Check that a retained (omitted but populated) stream agrees with
/// the newly loaded leading extents.
fn validate_retained(stream: &Stream, lead: &[usize]) -> Result<(), PoolError> {
    if &stream.tensor().shape()[..lead.len()] != lead {
        return Err(shape_err(
            stream,
            format!(
                "retained stream extents {:?} disagree with loaded extents {:?}",
                &stream.tensor().shape()[..lead.len()],
                lead
            ),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{PoolConfig, SessionPool};
    use oxbow_core::{ChannelSpec, ChannelTemplate, Dtype};

    /// A batch of `n` sessions with the default 1-obs/1-action layout:
    /// observation `[n, 5, 2]`, action `[n, 5]`, reward rows all equal
    /// to the row index.
    fn sessions(n: usize) -> TrajectoryBatch {
        let obs: Vec<f32> = (0..n * 5 * 2).map(|x| x as f32).collect();
        let actions: Vec<i32> = (0..n * 5).map(|x| x as i32).collect();
        let rewards: Vec<f32> = (0..n).flat_map(|r| std::iter::repeat(r as f32).take(5)).collect();
        TrajectoryBatch::new(
            vec![Tensor::from_f32(&[n, 5, 2], obs)],
            vec![Tensor::from_i32(&[n, 5], actions)],
            Tensor::from_f32(&[n, 5], rewards),
        )
    }

    #[test]
    fn load_round_trips_all_streams() {
        let mut pool = SessionPool::new(PoolConfig::default());
        let batch = sessions(3)
            .with_liveness(Tensor::ones(&[3, 5], Dtype::U8))
            .with_preceding_memories(vec![Tensor::zeros(&[3, 5], Dtype::F32)]);
        let expected_obs = batch.observations[0].clone();
        let expected_rewards = batch.rewards.clone();

        pool.load(batch).unwrap();

        assert_eq!(pool.pool_size(), 3);
        assert_eq!(pool.observations()[0].tensor(), &expected_obs);
        assert_eq!(pool.rewards().tensor(), &expected_rewards);
        assert!(pool.liveness().is_populated());
    }

    #[test]
    fn load_casts_to_stream_dtypes() {
        let mut pool = SessionPool::new(PoolConfig::default());
        let mut batch = sessions(2);
        // Actions supplied as f32; the stream dtype is i32.
        batch.actions = vec![Tensor::from_f32(&[2, 5], vec![1.7; 10])];
        pool.load(batch).unwrap();
        assert_eq!(pool.actions()[0].tensor().dtype(), Dtype::I32);
        assert_eq!(pool.actions()[0].tensor().as_i32().unwrap()[0], 1);
    }

    #[test]
    fn load_rejects_wrong_observation_count() {
        let mut pool = SessionPool::new(PoolConfig::default());
        let mut batch = sessions(3);
        batch.observations.push(Tensor::zeros(&[3, 5, 2], Dtype::F32));
        let err = pool.load(batch).unwrap_err();
        assert_eq!(
            err,
            PoolError::ChannelCountMismatch {
                group: ChannelGroup::Observations,
                expected: 1,
                got: 2,
            }
        );
        // Storage unchanged: still the construction placeholder.
        assert_eq!(pool.pool_size(), 10);
        assert!(!pool.rewards().is_populated());
    }

    #[test]
    fn failed_load_leaves_storage_unchanged() {
        let mut pool = SessionPool::new(PoolConfig::default());
        pool.load(sessions(3)).unwrap();
        let before = pool.observations()[0].tensor().clone();

        // Wrong element width: [4, 5, 3] against fixed shape [2].
        let mut batch = sessions(4);
        batch.observations = vec![Tensor::zeros(&[4, 5, 3], Dtype::F32)];
        let err = pool.load(batch).unwrap_err();
        assert!(matches!(err, PoolError::ShapeMismatch { .. }));

        assert_eq!(pool.pool_size(), 3);
        assert_eq!(pool.observations()[0].tensor(), &before);
    }

    #[test]
    fn load_regrows_unpopulated_optionals() {
        let mut pool = SessionPool::new(PoolConfig::default());
        pool.load(sessions(3)).unwrap();
        // Never-populated liveness follows the new extents as ones.
        assert_eq!(pool.liveness().tensor().shape(), &[3, 5]);
        assert!(pool.liveness().tensor().as_u8().unwrap().iter().all(|&b| b == 1));
        assert!(!pool.liveness().is_populated());
        assert_eq!(pool.preceding_memories()[0].tensor().shape(), &[3, 5]);
    }

    #[test]
    fn load_retains_populated_optionals() {
        let mut pool = SessionPool::new(PoolConfig::default());
        let flags = Tensor::from_u8(&[3, 5], vec![1, 1, 0, 0, 0].repeat(3));
        pool.load(sessions(3).with_liveness(flags.clone())).unwrap();

        // Reload the mandatory streams only; liveness is retained.
        pool.load(sessions(3)).unwrap();
        assert_eq!(pool.liveness().tensor(), &flags);
    }

    #[test]
    fn load_rejects_retained_extent_conflict() {
        let mut pool = SessionPool::new(PoolConfig::default());
        pool.load(sessions(3).with_liveness(Tensor::ones(&[3, 5], Dtype::U8)))
            .unwrap();
        // Growing the pool without re-supplying populated liveness
        // would desync the parallel arrays.
        let err = pool.load(sessions(4)).unwrap_err();
        assert!(matches!(err, PoolError::ShapeMismatch { .. }));
        assert_eq!(pool.pool_size(), 3);
    }

    #[test]
    fn append_concatenates_oldest_first() {
        let mut pool = SessionPool::new(PoolConfig::default());
        pool.load(sessions(3)).unwrap();
        pool.append(sessions(2), None).unwrap();

        assert_eq!(pool.pool_size(), 5);
        let rewards = pool.rewards().tensor().as_f32().unwrap();
        // Rows: 0,1,2 from the load, then 0,1 from the append.
        assert_eq!(rewards[2 * 5], 2.0);
        assert_eq!(rewards[3 * 5], 0.0);
        assert_eq!(rewards[4 * 5], 1.0);
    }

    #[test]
    fn append_crops_to_most_recent_rows() {
        let mut pool = SessionPool::new(PoolConfig::default());
        pool.load(sessions(3)).unwrap();
        pool.append(sessions(2), Some(3)).unwrap();

        assert_eq!(pool.pool_size(), 3);
        let rewards = pool.rewards().tensor().as_f32().unwrap();
        // Most recent 3 of [0,1,2]++[0,1]: rows 2, 0, 1.
        assert_eq!(rewards[0], 2.0);
        assert_eq!(rewards[5], 0.0);
        assert_eq!(rewards[10], 1.0);
        // Truncation applied uniformly.
        assert_eq!(pool.observations()[0].tensor().shape(), &[3, 5, 2]);
        assert_eq!(pool.liveness().tensor().shape(), &[3, 5]);
        assert_eq!(pool.preceding_memories()[0].tensor().shape(), &[3, 5]);
    }

    #[test]
    fn append_rejects_omitted_populated_liveness() {
        let mut pool = SessionPool::new(PoolConfig::default());
        pool.load(sessions(3).with_liveness(Tensor::ones(&[3, 5], Dtype::U8)))
            .unwrap();
        let err = pool.append(sessions(1), None).unwrap_err();
        assert_eq!(
            err,
            PoolError::MissingStream {
                stream: "liveness".to_string()
            }
        );
        assert_eq!(pool.pool_size(), 3);
    }

    #[test]
    fn append_rejects_sequence_length_change() {
        let mut pool = SessionPool::new(PoolConfig::default());
        pool.load(sessions(3)).unwrap();
        let batch = TrajectoryBatch::new(
            vec![Tensor::zeros(&[2, 7, 2], Dtype::F32)],
            vec![Tensor::zeros(&[2, 7], Dtype::I32)],
            Tensor::zeros(&[2, 7], Dtype::F32),
        );
        let err = pool.append(batch, None).unwrap_err();
        assert!(matches!(err, PoolError::ShapeMismatch { .. }));
        assert_eq!(pool.pool_size(), 3);
    }

    #[test]
    fn append_onto_template_pool() {
        let mut pool = SessionPool::new(PoolConfig {
            observations: ChannelSpec::Templates(vec![ChannelTemplate::new(&[4])]),
            ..PoolConfig::default()
        });
        let batch = TrajectoryBatch::new(
            vec![Tensor::zeros(&[2, 5, 4], Dtype::F32)],
            vec![Tensor::zeros(&[2, 5], Dtype::I32)],
            Tensor::zeros(&[2, 5], Dtype::F32),
        );
        pool.load(batch.clone()).unwrap();
        pool.append(batch, None).unwrap();
        assert_eq!(pool.observations()[0].tensor().shape(), &[4, 5, 4]);
    }
}
