#![warn(missing_docs)]
//! Replay buffer for off-policy actor-critic agents with stacked image observations.
//!
//! Rollouts of vectorized environments are stored in a ring of slots. To avoid
//! keeping `n_stack` copies of every frame, observations are stored as raw
//! frames and stacked when a batch is sampled. Stacking never reaches across
//! an episode boundary: frames from before the end of an episode are replaced
//! with zeros.
//!
//! ```
//! use border_acer_buffer::{
//!     AcerReplayBuffer, AcerReplayBufferConfig, AcerRollout, ReplayBufferBase,
//! };
//! use ndarray::{Array2, Array3, Array5};
//!
//! let config = AcerReplayBufferConfig::default()
//!     .n_envs(4)
//!     .n_steps(5)
//!     .n_stack(3)
//!     .size(100)
//!     .obs_shape([8, 8, 1]);
//! let mut buffer = AcerReplayBuffer::build(&config).unwrap();
//!
//! let rollout = AcerRollout::new(
//!     Array5::zeros((4, config.n_frames(), 8, 8, 1)),
//!     Array2::zeros((4, 5)),
//!     Array2::zeros((4, 5)),
//!     Array3::from_elem((4, 5, 2), 0.5),
//!     Array2::from_elem((4, 5), false),
//!     Array2::from_elem((4, 5), true),
//! );
//! buffer.put(&rollout).unwrap();
//! assert!(buffer.has_at_least(5));
//!
//! let (obs, actions, rewards, mus, dones, masks) = buffer.get().unwrap().unpack();
//! assert_eq!(obs.shape(), &[4, 6, 8, 8, 3]);
//! assert_eq!(actions.shape(), &[4, 5]);
//! # let _ = (rewards, mus, dones, masks);
//! ```
mod base;
mod decode;
pub mod error;
mod gather;
pub mod replay_buffer;

pub use base::{ExperienceBufferBase, ReplayBufferBase};
pub use decode::decode;
pub use error::AcerBufferError;
pub use gather::take;
pub use replay_buffer::{
    AcerBatch, AcerReplayBuffer, AcerReplayBufferConfig, AcerRollout, SharedAcerReplayBuffer,
};
