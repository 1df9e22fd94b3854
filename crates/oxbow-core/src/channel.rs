//! Channel specification and resolution.
//!
//! A replay pool owns a fixed set of observation, action, and memory
//! channels. Each group is specified either as a bare count (channels
//! take a synthetic default shape and dtype) or as explicit templates
//! declaring the per-element shape and dtype. Specifications are
//! resolved once, at pool construction, into concrete
//! `(shape, dtype)` pairs that never change afterwards.

use crate::tensor::{Dtype, Shape};
use std::fmt;

/// Declared layout of one channel: the element shape (the trailing
/// extents after the pool/time axes) and an optional element dtype.
///
/// # Examples
///
/// ```
/// use oxbow_core::{ChannelTemplate, Dtype};
///
/// let plain = ChannelTemplate::new(&[4]);
/// assert_eq!(plain.dtype, None); // resolves to f32
///
/// let typed = ChannelTemplate::new(&[2, 2]).with_dtype(Dtype::I32);
/// assert_eq!(typed.dtype, Some(Dtype::I32));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelTemplate {
    /// Per-element shape, excluding the leading pool/time axes.
    pub shape: Shape,
    /// Element dtype. `None` resolves to [`Dtype::F32`].
    pub dtype: Option<Dtype>,
}

impl ChannelTemplate {
    /// A template with the given element shape and no declared dtype.
    pub fn new(shape: &[usize]) -> Self {
        Self {
            shape: Shape::from_slice(shape),
            dtype: None,
        }
    }

    /// Declare the element dtype.
    pub fn with_dtype(mut self, dtype: Dtype) -> Self {
        self.dtype = Some(dtype);
        self
    }
}

/// How a channel group is specified at pool construction.
///
/// The original duck-typed count-or-template-list argument becomes a
/// tagged variant, so a malformed channel-count argument is
/// unrepresentable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChannelSpec {
    /// `n` channels of the group's synthetic default shape and dtype.
    Count(usize),
    /// One explicit template per channel.
    Templates(Vec<ChannelTemplate>),
}

impl ChannelSpec {
    /// Number of channels this spec describes.
    pub fn channel_count(&self) -> usize {
        match self {
            Self::Count(n) => *n,
            Self::Templates(t) => t.len(),
        }
    }

    /// Resolve into concrete per-channel layouts.
    ///
    /// `default_shape` and `default_dtype` apply to [`Count`]-form
    /// channels. Template channels use their declared shape, and their
    /// declared dtype or `f32` when absent.
    ///
    /// [`Count`]: ChannelSpec::Count
    pub fn resolve(&self, default_shape: &[usize], default_dtype: Dtype) -> Vec<ResolvedChannel> {
        match self {
            Self::Count(n) => (0..*n)
                .map(|_| ResolvedChannel {
                    shape: Shape::from_slice(default_shape),
                    dtype: default_dtype,
                })
                .collect(),
            Self::Templates(templates) => templates
                .iter()
                .map(|t| ResolvedChannel {
                    shape: t.shape.clone(),
                    dtype: t.dtype.unwrap_or(Dtype::F32),
                })
                .collect(),
        }
    }
}

impl From<usize> for ChannelSpec {
    fn from(n: usize) -> Self {
        Self::Count(n)
    }
}

impl From<Vec<ChannelTemplate>> for ChannelSpec {
    fn from(templates: Vec<ChannelTemplate>) -> Self {
        Self::Templates(templates)
    }
}

/// A channel layout fixed at pool construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedChannel {
    /// Per-element shape, excluding the leading pool/time axes.
    pub shape: Shape,
    /// Element dtype; all writes to the channel cast to it.
    pub dtype: Dtype,
}

/// Identity of a single stream within the pool.
///
/// Used as the key of the update-set mapping, in the order streams are
/// staged: observations, actions, reward, liveness, memories.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StreamKey {
    /// The `k`-th observation channel.
    Observation(usize),
    /// The `k`-th action channel.
    Action(usize),
    /// The per-tick reward stream.
    Reward,
    /// The per-tick liveness stream.
    Liveness,
    /// The `k`-th preceding agent memory channel.
    PrecedingMemory(usize),
}

impl fmt::Display for StreamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Observation(k) => write!(f, "observation.{k}"),
            Self::Action(k) => write!(f, "action.{k}"),
            Self::Reward => write!(f, "reward"),
            Self::Liveness => write!(f, "liveness"),
            Self::PrecedingMemory(k) => write!(f, "memory.{k}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_resolves_to_defaults() {
        let spec = ChannelSpec::Count(3);
        let channels = spec.resolve(&[2], Dtype::I32);
        assert_eq!(channels.len(), 3);
        for ch in &channels {
            assert_eq!(ch.shape.as_slice(), &[2]);
            assert_eq!(ch.dtype, Dtype::I32);
        }
    }

    #[test]
    fn templates_keep_declared_layout() {
        let spec = ChannelSpec::Templates(vec![
            ChannelTemplate::new(&[4]),
            ChannelTemplate::new(&[2, 2]).with_dtype(Dtype::U8),
        ]);
        let channels = spec.resolve(&[9], Dtype::I32);
        assert_eq!(channels[0].shape.as_slice(), &[4]);
        assert_eq!(channels[0].dtype, Dtype::F32); // undeclared -> float
        assert_eq!(channels[1].shape.as_slice(), &[2, 2]);
        assert_eq!(channels[1].dtype, Dtype::U8);
    }

    #[test]
    fn count_zero_is_legal() {
        assert!(ChannelSpec::Count(0).resolve(&[], Dtype::F32).is_empty());
    }
}
