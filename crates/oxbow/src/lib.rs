//! Oxbow: an experience replay pool for reinforcement learning.
//!
//! This is the top-level facade crate that re-exports the public API
//! from the oxbow sub-crates. For most users, adding `oxbow` as a
//! single dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use oxbow::prelude::*;
//!
//! // One observation channel, one action channel, default layout.
//! let mut pool = SessionPool::new(PoolConfig::default());
//! assert_eq!(pool.pool_size(), 10); // zero-filled placeholder
//!
//! // Bulk-load three recorded 5-tick trajectories.
//! let rewards: Vec<f32> = (0..15).map(|x| x as f32).collect();
//! pool.load(TrajectoryBatch::new(
//!     vec![Tensor::zeros(&[3, 5, 2], Dtype::F32)],
//!     vec![Tensor::zeros(&[3, 5], Dtype::I32)],
//!     Tensor::from_f32(&[3, 5], rewards),
//! ))
//! .unwrap();
//! assert_eq!(pool.pool_size(), 3);
//!
//! // Draw a reproducible training sub-batch.
//! let batch = pool.sample(2, false).unwrap();
//! assert_eq!(batch.len(), 2);
//!
//! // Step the batch as if it were a live environment.
//! let (ticks, observations) = batch.action_result(&[0, 0], &[]).unwrap();
//! assert_eq!(ticks, vec![1, 1]);
//! assert_eq!(observations[0].shape(), &[2, 2]);
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `oxbow-core` | Tensors, dtypes, channel specs, errors, traits |
//! | [`pool`] | `oxbow-pool` | The replay pool, batches, sampling |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub use oxbow_core as types;
pub use oxbow_pool as pool;

/// The commonly used subset of the oxbow API.
pub mod prelude {
    pub use oxbow_core::{
        ChannelSpec, ChannelTemplate, Dtype, Environment, PoolError, RewardSource, StreamKey,
        Tensor,
    };
    pub use oxbow_pool::{PoolConfig, SessionBatch, SessionPool, TrajectoryBatch};
}
