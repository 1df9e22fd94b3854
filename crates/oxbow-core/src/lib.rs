//! Core types and traits for the oxbow replay pool.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the dense [`Tensor`] carrier, channel specification and resolution,
//! the [`PoolError`] taxonomy, and the environment capability traits
//! the pool implements.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod channel;
pub mod error;
pub mod tensor;
pub mod traits;

pub use channel::{ChannelSpec, ChannelTemplate, ResolvedChannel, StreamKey};
pub use error::{ChannelGroup, PoolError};
pub use tensor::{Dtype, Shape, Tensor, TensorData};
pub use traits::{Environment, RewardSource};
