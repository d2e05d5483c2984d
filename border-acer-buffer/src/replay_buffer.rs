//! Replay buffer of rollouts with frame stacking on sampling.
//!
//! # Key Components
//!
//! - [`AcerReplayBuffer`]: ring buffer of rollouts
//! - [`AcerReplayBufferConfig`]: its configuration, loadable from YAML
//! - [`AcerRollout`]: a rollout pushed into the buffer
//! - [`AcerBatch`]: a batch sampled from the buffer
//! - [`SharedAcerReplayBuffer`]: a thread-safe handle of the buffer
mod base;
mod batch;
mod config;
mod shared;
mod storage;
pub use base::AcerReplayBuffer;
pub use batch::{AcerBatch, AcerRollout};
pub use config::AcerReplayBufferConfig;
pub use shared::SharedAcerReplayBuffer;
