//! Pool storage: the parallel streams and their fixed layout.
//!
//! A [`SessionPool`] owns one stream per channel plus the reward and
//! liveness streams. All timed streams share the leading
//! `[pool, time]` extents at all times; memory streams share the pool
//! extent only. Channel counts, element shapes, and dtypes are fixed
//! at construction and never change. Mutation happens exclusively
//! through the load/append paths in [`crate::ingest`].

use oxbow_core::{ChannelSpec, Dtype, PoolError, Shape, Tensor};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Pool-axis extent of the zero-filled placeholder streams.
pub const DEFAULT_POOL_SIZE: usize = 10;

/// Time-axis extent of the zero-filled placeholder streams.
pub const DEFAULT_SEQUENCE_LENGTH: usize = 5;

/// Element width of count-form observation channels.
const DEFAULT_OBS_WIDTH: usize = 2;

/// Element width of count-form memory channels.
const DEFAULT_MEMORY_WIDTH: usize = 5;

/// RNG seed used when none is configured.
const DEFAULT_SEED: u64 = 1337;

/// Configuration for a [`SessionPool`].
///
/// Channel groups are given either as bare counts or as explicit
/// shape/dtype templates; see [`ChannelSpec`]. The seed fixes the
/// pool-owned sampling RNG, making sampling sequences reproducible
/// across runs given the same call order.
#[derive(Clone, Debug)]
pub struct PoolConfig {
    /// Observation channels. Count-form channels are `f32` with a
    /// flat default element shape.
    pub observations: ChannelSpec,
    /// Action channels. Count-form channels are scalar per tick, with
    /// dtype [`default_action_dtype`](Self::default_action_dtype).
    pub actions: ChannelSpec,
    /// Preceding agent memory channels (`f32`, no time axis).
    pub memories: ChannelSpec,
    /// Dtype of count-form action channels.
    pub default_action_dtype: Dtype,
    /// Seed for the pool-owned sampling RNG.
    pub seed: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            observations: ChannelSpec::Count(1),
            actions: ChannelSpec::Count(1),
            memories: ChannelSpec::Count(1),
            default_action_dtype: Dtype::I32,
            seed: DEFAULT_SEED,
        }
    }
}

/// One parallel stream: a named tensor with a fixed dtype and element
/// shape.
///
/// `lead_axes` is 2 for timed streams (`[pool, time, ..]`) and 1 for
/// memory streams (`[pool, ..]`). The `populated` flag records whether
/// a caller ever explicitly supplied this stream; until then the
/// contents are a resizable synthetic placeholder.
#[derive(Clone, Debug)]
pub struct Stream {
    name: String,
    dtype: Dtype,
    elem_shape: Shape,
    lead_axes: usize,
    tensor: Tensor,
    populated: bool,
}

impl Stream {
    fn placeholder(name: String, dtype: Dtype, elem_shape: Shape, lead: &[usize]) -> Self {
        let tensor = Tensor::zeros(&full_shape(lead, &elem_shape), dtype);
        Self {
            name,
            dtype,
            elem_shape,
            lead_axes: lead.len(),
            tensor,
            populated: false,
        }
    }

    /// Stream name, e.g. `"observation.0"` or `"liveness"`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fixed element dtype; every write casts to it.
    pub fn dtype(&self) -> Dtype {
        self.dtype
    }

    /// Fixed element shape (trailing extents after the lead axes).
    pub fn elem_shape(&self) -> &[usize] {
        &self.elem_shape
    }

    /// Number of leading shared axes (2 timed, 1 memory).
    pub fn lead_axes(&self) -> usize {
        self.lead_axes
    }

    /// The stream's current contents.
    pub fn tensor(&self) -> &Tensor {
        &self.tensor
    }

    /// Whether a caller ever explicitly supplied this stream.
    pub fn is_populated(&self) -> bool {
        self.populated
    }

    /// Replace contents wholesale. Callers have already validated and
    /// cast; this is the commit half of copy-then-swap.
    pub(crate) fn replace(&mut self, tensor: Tensor, populated: bool) {
        self.tensor = tensor;
        self.populated = self.populated || populated;
    }

    /// Regrow the synthetic placeholder at new lead extents.
    pub(crate) fn regrow_placeholder(&mut self, lead: &[usize], fill_ones: bool) {
        debug_assert!(!self.populated);
        let shape = full_shape(lead, &self.elem_shape);
        self.tensor = if fill_ones {
            Tensor::ones(&shape, self.dtype)
        } else {
            Tensor::zeros(&shape, self.dtype)
        };
    }
}

fn full_shape(lead: &[usize], elem: &[usize]) -> Shape {
    let mut shape = Shape::from_slice(lead);
    shape.extend_from_slice(elem);
    shape
}

/// An experience replay pool of recorded agent–environment sessions.
///
/// Holds parallel observation, action, reward, liveness, and preceding
/// memory streams, bulk-replaced by [`load`](Self::load), grown by
/// [`append`](Self::append), and read out through
/// [`select`](Self::select) and [`sample`](Self::sample).
///
/// Construction fills every stream with a zero (liveness: one)
/// placeholder of a small default extent; the first load replaces it.
pub struct SessionPool {
    pub(crate) observations: Vec<Stream>,
    pub(crate) actions: Vec<Stream>,
    pub(crate) rewards: Stream,
    pub(crate) liveness: Stream,
    pub(crate) memories: Vec<Stream>,
    pub(crate) rng: ChaCha8Rng,
}

// All-owned data; the pool moves freely across threads.
const _: fn() = || {
    fn assert<T: Send>() {}
    assert::<SessionPool>();
};

impl SessionPool {
    /// Create a pool with the given channel layout and RNG seed.
    pub fn new(config: PoolConfig) -> Self {
        let lead = [DEFAULT_POOL_SIZE, DEFAULT_SEQUENCE_LENGTH];

        let observations = config
            .observations
            .resolve(&[DEFAULT_OBS_WIDTH], Dtype::F32)
            .into_iter()
            .enumerate()
            .map(|(i, ch)| Stream::placeholder(format!("observation.{i}"), ch.dtype, ch.shape, &lead))
            .collect();

        let actions = config
            .actions
            .resolve(&[], config.default_action_dtype)
            .into_iter()
            .enumerate()
            .map(|(i, ch)| Stream::placeholder(format!("action.{i}"), ch.dtype, ch.shape, &lead))
            .collect();

        let memories = config
            .memories
            .resolve(&[DEFAULT_MEMORY_WIDTH], Dtype::F32)
            .into_iter()
            .enumerate()
            .map(|(i, ch)| {
                Stream::placeholder(format!("memory.{i}"), ch.dtype, ch.shape, &lead[..1])
            })
            .collect();

        let rewards = Stream::placeholder("reward".into(), Dtype::F32, Shape::new(), &lead);
        let mut liveness = Stream::placeholder("liveness".into(), Dtype::U8, Shape::new(), &lead);
        // Placeholder trajectories count as alive for their whole extent.
        liveness.regrow_placeholder(&lead, true);

        Self {
            observations,
            actions,
            rewards,
            liveness,
            memories,
            rng: ChaCha8Rng::seed_from_u64(config.seed),
        }
    }

    /// Number of trajectories currently stored.
    pub fn pool_size(&self) -> usize {
        self.rewards.tensor().shape()[0]
    }

    /// Ticks per trajectory.
    pub fn sequence_length(&self) -> usize {
        self.rewards.tensor().shape()[1]
    }

    /// The observation streams, in channel order.
    pub fn observations(&self) -> &[Stream] {
        &self.observations
    }

    /// The action streams, in channel order.
    pub fn actions(&self) -> &[Stream] {
        &self.actions
    }

    /// The scalar per-tick reward stream.
    pub fn rewards(&self) -> &Stream {
        &self.rewards
    }

    /// The per-tick liveness stream (1 while the trajectory is active).
    pub fn liveness(&self) -> &Stream {
        &self.liveness
    }

    /// The preceding agent memory streams, in channel order.
    pub fn preceding_memories(&self) -> &[Stream] {
        &self.memories
    }

    /// Per-channel observation element shapes.
    pub fn observation_shapes(&self) -> Vec<&[usize]> {
        self.observations.iter().map(|s| s.elem_shape()).collect()
    }

    /// Per-channel action element shapes.
    pub fn action_shapes(&self) -> Vec<&[usize]> {
        self.actions.iter().map(|s| s.elem_shape()).collect()
    }

    /// Validate a pool-row index against the current pool size.
    pub(crate) fn check_row(&self, index: usize) -> Result<(), PoolError> {
        let bound = self.pool_size();
        if index >= bound {
            return Err(PoolError::IndexOutOfRange { index, bound });
        }
        Ok(())
    }

    /// All streams in staging order: observations, actions, reward,
    /// liveness, memories.
    pub fn streams(&self) -> impl Iterator<Item = &Stream> {
        self.observations
            .iter()
            .chain(self.actions.iter())
            .chain(std::iter::once(&self.rewards))
            .chain(std::iter::once(&self.liveness))
            .chain(self.memories.iter())
    }
}
