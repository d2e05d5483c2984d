//! Slot storage of [`AcerReplayBuffer`](super::AcerReplayBuffer).
use super::AcerRollout;
use ndarray::{Array3, Array4, Array6, Axis};
use std::mem::size_of;

/// Arrays of all slots, with the slot index on the first axis.
#[derive(Debug)]
pub(super) struct Slots {
    pub enc_obs: Array6<u8>,
    pub actions: Array3<i32>,
    pub rewards: Array3<f32>,
    pub mus: Array4<f32>,
    pub dones: Array3<bool>,
    pub masks: Array3<bool>,
}

impl Slots {
    /// Allocates `capacity` slots shaped like `rollout`.
    fn allocate(capacity: usize, rollout: &AcerRollout) -> Self {
        let (n_envs, n_frames, height, width, n_channels) = rollout.enc_obs.dim();
        let (_, n_steps, n_actions) = rollout.mus.dim();

        Self {
            enc_obs: Array6::zeros((capacity, n_envs, n_frames, height, width, n_channels)),
            actions: Array3::zeros((capacity, n_envs, n_steps)),
            rewards: Array3::zeros((capacity, n_envs, n_steps)),
            mus: Array4::zeros((capacity, n_envs, n_steps, n_actions)),
            dones: Array3::from_elem((capacity, n_envs, n_steps), false),
            masks: Array3::from_elem((capacity, n_envs, n_steps), false),
        }
    }

    /// Overwrites slot `i`.
    fn write(&mut self, i: usize, rollout: &AcerRollout) {
        self.enc_obs.index_axis_mut(Axis(0), i).assign(&rollout.enc_obs);
        self.actions.index_axis_mut(Axis(0), i).assign(&rollout.actions);
        self.rewards.index_axis_mut(Axis(0), i).assign(&rollout.rewards);
        self.mus.index_axis_mut(Axis(0), i).assign(&rollout.mus);
        self.dones.index_axis_mut(Axis(0), i).assign(&rollout.dones);
        self.masks.index_axis_mut(Axis(0), i).assign(&rollout.masks);
    }

    pub fn n_actions(&self) -> usize {
        self.mus.shape()[3]
    }

    /// Memory held by the arrays in bytes.
    pub fn n_bytes(&self) -> usize {
        self.enc_obs.len() * size_of::<u8>()
            + self.actions.len() * size_of::<i32>()
            + (self.rewards.len() + self.mus.len()) * size_of::<f32>()
            + (self.dones.len() + self.masks.len()) * size_of::<bool>()
    }
}

/// Lifecycle of the slot storage.
///
/// The number of actions is only known from the first rollout, so arrays are
/// allocated when it arrives. Afterwards the shapes are fixed.
#[derive(Debug)]
pub(super) enum Storage {
    Empty,
    Allocated(Box<Slots>),
}

impl Storage {
    pub fn slots(&self) -> Option<&Slots> {
        match self {
            Self::Empty => None,
            Self::Allocated(slots) => Some(&**slots),
        }
    }

    /// Writes `rollout` into slot `i`, allocating `capacity` slots on the first call.
    ///
    /// Returns `true` if the arrays were allocated by this call.
    pub fn write(&mut self, capacity: usize, i: usize, rollout: &AcerRollout) -> bool {
        let allocated = matches!(self, Self::Empty);
        if allocated {
            *self = Self::Allocated(Box::new(Slots::allocate(capacity, rollout)));
        }

        if let Self::Allocated(slots) = self {
            slots.write(i, rollout);
        }
        allocated
    }
}
