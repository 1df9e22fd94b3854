//! Error types for replay pool operations.
//!
//! All pool operations validate their inputs before touching storage,
//! so every error here is raised with prior storage completely
//! unchanged. None of these conditions are transient; nothing is
//! retried internally.

use std::error::Error;
use std::fmt;

/// Which group of parallel channels an operation referred to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelGroup {
    /// Observation streams.
    Observations,
    /// Action streams.
    Actions,
    /// Preceding agent memory streams.
    Memories,
}

impl fmt::Display for ChannelGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Observations => write!(f, "observation"),
            Self::Actions => write!(f, "action"),
            Self::Memories => write!(f, "memory"),
        }
    }
}

/// Errors from replay pool loading, appending, selection, and sampling.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PoolError {
    /// The number of supplied arrays for a channel group disagrees with
    /// the channel count fixed at pool construction.
    ChannelCountMismatch {
        /// The channel group with the wrong arity.
        group: ChannelGroup,
        /// Channel count fixed at construction.
        expected: usize,
        /// Number of arrays actually supplied.
        got: usize,
    },
    /// A supplied array's dimensions disagree with the stream's fixed
    /// layout, or retained streams would disagree with loaded extents.
    ShapeMismatch {
        /// Name of the offending stream.
        stream: String,
        /// Human-readable description of the disagreement.
        detail: String,
    },
    /// A selection, sampling, or tick index falls outside its bound.
    IndexOutOfRange {
        /// The offending index.
        index: usize,
        /// Exclusive upper bound (pool size for row indices, sequence
        /// length for tick states).
        bound: usize,
    },
    /// An append referenced an optional stream (liveness or preceding
    /// memories) that holds previously recorded rows but was omitted
    /// from the call, so there is nothing to concatenate against it.
    MissingStream {
        /// Name of the omitted stream.
        stream: String,
    },
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ChannelCountMismatch {
                group,
                expected,
                got,
            } => {
                write!(
                    f,
                    "{group} channel count mismatch: pool has {expected} channels, got {got} arrays"
                )
            }
            Self::ShapeMismatch { stream, detail } => {
                write!(f, "shape mismatch on stream '{stream}': {detail}")
            }
            Self::IndexOutOfRange { index, bound } => {
                write!(f, "index {index} out of range [0, {bound})")
            }
            Self::MissingStream { stream } => {
                write!(
                    f,
                    "optional stream '{stream}' holds recorded rows but was omitted; \
                     it cannot be concatenated against"
                )
            }
        }
    }
}

impl Error for PoolError {}
