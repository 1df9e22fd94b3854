//! Zero-padded lookahead and the replay environment surface.
//!
//! The padded view of an observation stream appends one all-zero tick
//! after the last, so that "the observation after acting at the final
//! tick" reads zeros instead of faulting. On top of it sit the
//! [`Environment`] and [`RewardSource`] implementations that let a
//! [`SessionPool`] or a selected [`SessionBatch`] stand in for a live
//! environment: stepping just advances each row's tick and re-reads
//! the recorded observations, ignoring actions entirely.

use crate::batch::SessionBatch;
use crate::storage::SessionPool;
use oxbow_core::{Environment, PoolError, RewardSource, Tensor};

impl SessionPool {
    /// Zero-padded lookahead view of one observation channel, shaped
    /// `[pool, sequence_length + 1, ..]`. `None` if the channel index
    /// is out of range.
    pub fn padded_observation(&self, channel: usize) -> Option<Tensor> {
        self.observations.get(channel).map(|s| s.tensor().pad_time())
    }
}

/// Shared stepping logic for pools and batches.
///
/// Tick states address rows `0..last_ticks.len()` and must lie in
/// `[0, time)`; the padded read at `tick + 1` is then always in range.
fn step_replay(
    observations: &[&Tensor],
    rows: usize,
    time: usize,
    last_ticks: &[usize],
) -> Result<(Vec<usize>, Vec<Tensor>), PoolError> {
    if last_ticks.len() > rows {
        return Err(PoolError::IndexOutOfRange {
            index: last_ticks.len() - 1,
            bound: rows,
        });
    }
    for &tick in last_ticks {
        if tick >= time {
            return Err(PoolError::IndexOutOfRange {
                index: tick,
                bound: time,
            });
        }
    }
    let next: Vec<usize> = last_ticks.iter().map(|&t| t + 1).collect();
    let next_obs = observations
        .iter()
        .map(|obs| obs.pad_time().gather_ticks(&next))
        .collect();
    Ok((next, next_obs))
}

impl Environment for SessionPool {
    fn action_result(
        &self,
        last_ticks: &[usize],
        _actions: &[Tensor],
    ) -> Result<(Vec<usize>, Vec<Tensor>), PoolError> {
        let observations: Vec<&Tensor> = self.observations.iter().map(|s| s.tensor()).collect();
        step_replay(
            &observations,
            self.pool_size(),
            self.sequence_length(),
            last_ticks,
        )
    }
}

impl RewardSource for SessionPool {
    fn reward(
        &self,
        _states: &Tensor,
        _actions: &Tensor,
        row: usize,
    ) -> Result<Tensor, PoolError> {
        self.check_row(row)?;
        Ok(self.rewards.tensor().row(row))
    }
}

impl Environment for SessionBatch {
    fn action_result(
        &self,
        last_ticks: &[usize],
        _actions: &[Tensor],
    ) -> Result<(Vec<usize>, Vec<Tensor>), PoolError> {
        let observations: Vec<&Tensor> = self.observations.iter().collect();
        step_replay(
            &observations,
            self.len(),
            self.sequence_length(),
            last_ticks,
        )
    }
}

impl RewardSource for SessionBatch {
    fn reward(
        &self,
        _states: &Tensor,
        _actions: &Tensor,
        row: usize,
    ) -> Result<Tensor, PoolError> {
        let bound = self.len();
        if row >= bound {
            return Err(PoolError::IndexOutOfRange { index: row, bound });
        }
        Ok(self.rewards.row(row))
    }
}
