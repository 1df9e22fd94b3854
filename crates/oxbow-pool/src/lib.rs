//! Experience replay pool for recorded agent–environment sessions.
//!
//! A [`SessionPool`] stores parallel, shape-correlated streams of
//! observations, actions, rewards, liveness flags, and preceding agent
//! memories, and feeds a downstream learning loop with random or
//! explicit sub-batches.
//!
//! # Architecture
//!
//! - [`storage`] — the parallel streams and their fixed layout
//! - [`ingest`] — bulk [`load`](SessionPool::load) and
//!   capacity-bounded [`append`](SessionPool::append) with uniform
//!   oldest-first eviction
//! - [`batch`] — [`select`](SessionPool::select) into a copy-on-select
//!   [`SessionBatch`]
//! - [`sample`] — seeded uniform [`sample`](SessionPool::sample), with
//!   or without replacement
//! - [`padded`] — zero-padded lookahead and the replay environment
//!   surface
//! - [`updates`] — pure
//!   [`session_updates`](SessionPool::session_updates) staging for
//!   transactional consumers
//!
//! All operations are synchronous and validate before mutating, so a
//! failed call leaves the pool unchanged.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod batch;
pub mod ingest;
pub mod padded;
pub mod sample;
pub mod storage;
pub mod updates;

pub use batch::SessionBatch;
pub use ingest::TrajectoryBatch;
pub use storage::{PoolConfig, SessionPool, Stream, DEFAULT_POOL_SIZE, DEFAULT_SEQUENCE_LENGTH};
