//! Capability traits the replay pool implements.
//!
//! These match the generic environment interface the surrounding
//! training loop consumes, so a replay pool (or a selected sub-batch)
//! can stand in for a live environment during replay-based training.

use crate::error::PoolError;
use crate::tensor::Tensor;

/// State-transition capability: `state -> (new_state, observations)`.
///
/// For replay sources the per-row state is the scalar time tick, and
/// stepping simply advances it: actions are ignored because the
/// trajectories are pre-recorded, not simulated.
pub trait Environment {
    /// Advance each row's tick state after the agent acts.
    ///
    /// `last_ticks` holds one tick state per row, addressing rows
    /// `0..last_ticks.len()`. Returns the advanced tick states and,
    /// for every observation channel, the observations visible after
    /// acting, shaped `[last_ticks.len(), *element_shape]`.
    ///
    /// Reading after the final tick yields all-zero observations
    /// rather than faulting.
    fn action_result(
        &self,
        last_ticks: &[usize],
        actions: &[Tensor],
    ) -> Result<(Vec<usize>, Vec<Tensor>), PoolError>;
}

/// Reward-query capability: `(state, action, row) -> reward`.
pub trait RewardSource {
    /// The recorded reward sequence for one row.
    ///
    /// Replay sources already store every reward, so `states` and
    /// `actions` are ignored; this entry point exists for interface
    /// compatibility, and bulk access to the reward stream is the
    /// faster path.
    fn reward(&self, states: &Tensor, actions: &Tensor, row: usize)
        -> Result<Tensor, PoolError>;
}
