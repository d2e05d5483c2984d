//! Ring buffer of rollouts with frame-stacked sampling.
use super::{
    storage::{Slots, Storage},
    AcerBatch, AcerReplayBufferConfig, AcerRollout,
};
use crate::{decode, error::AcerBufferError, take, ExperienceBufferBase, ReplayBufferBase};
use anyhow::Result;
use log::{debug, info, trace};
use ndarray::{Array5, ArrayBase, Data, Ix2, Ix5};
use rand::{rngs::StdRng, Rng, SeedableRng};

/// A replay buffer of rollouts for off-policy actor-critic agents.
///
/// Each slot holds one [`AcerRollout`] of all environments. Observations are
/// stored as raw frames and stacked only when sampled, so a frame is stored
/// once regardless of `n_stack`. When all slots are filled, the oldest one is
/// overwritten.
///
/// # Examples
///
/// ```
/// use border_acer_buffer::{AcerReplayBuffer, AcerReplayBufferConfig, AcerRollout, ReplayBufferBase};
/// use ndarray::{Array2, Array3, Array5};
///
/// let config = AcerReplayBufferConfig::default()
///     .n_envs(2)
///     .n_steps(3)
///     .n_stack(2)
///     .size(30)
///     .obs_shape([4, 4, 1]);
/// let mut buffer = AcerReplayBuffer::build(&config).unwrap();
/// assert!(!buffer.can_sample());
///
/// buffer
///     .put(&AcerRollout::new(
///         Array5::zeros((2, 5, 4, 4, 1)),
///         Array2::zeros((2, 3)),
///         Array2::zeros((2, 3)),
///         Array3::from_elem((2, 3, 6), 1.0 / 6.0),
///         Array2::from_elem((2, 3), false),
///         Array2::from_elem((2, 3), true),
///     ))
///     .unwrap();
///
/// let batch = buffer.get().unwrap();
/// assert_eq!(batch.obs.shape(), &[2, 4, 4, 4, 2]);
/// assert_eq!(batch.mus.shape(), &[2, 3, 6]);
/// ```
#[derive(Debug)]
pub struct AcerReplayBuffer {
    config: AcerReplayBufferConfig,

    /// Number of slots.
    capacity: usize,

    /// Slot written by the next call of [`AcerReplayBuffer::put`].
    next_idx: usize,

    /// Number of filled slots.
    num_in_buffer: usize,

    storage: Storage,

    rng: StdRng,
}

impl AcerReplayBuffer {
    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of filled slots.
    pub fn len(&self) -> usize {
        self.num_in_buffer
    }

    /// Returns `true` if no rollout has been admitted.
    pub fn is_empty(&self) -> bool {
        self.num_in_buffer == 0
    }

    /// Returns `true` once the arrays have been allocated by the first rollout.
    pub fn is_allocated(&self) -> bool {
        self.storage.slots().is_some()
    }

    /// Index of the slot written by the next rollout.
    pub fn next_idx(&self) -> usize {
        self.next_idx
    }

    /// Configuration of the buffer.
    pub fn config(&self) -> &AcerReplayBufferConfig {
        &self.config
    }

    /// Number of actions, known after the first rollout.
    pub fn n_actions(&self) -> Option<usize> {
        self.storage.slots().map(Slots::n_actions)
    }

    /// Checks if the buffer holds at least `frames` steps per environment.
    ///
    /// Only complete rollouts count, so this compares the number of filled
    /// slots with `frames / n_steps`.
    pub fn has_at_least(&self, frames: usize) -> bool {
        self.num_in_buffer >= frames / self.config.n_steps
    }

    /// Checks if a batch can be sampled.
    pub fn can_sample(&self) -> bool {
        self.num_in_buffer > 0
    }

    /// Adds a rollout, overwriting the oldest one if the buffer is full.
    ///
    /// Fails with [`AcerBufferError::InvalidShape`] if the rollout does not
    /// match the configuration or the number of actions of previous rollouts,
    /// and with [`AcerBufferError::InvalidConfig`] if the first rollout needs
    /// more memory than can be allocated. The buffer is left unchanged in
    /// both cases.
    pub fn put(&mut self, rollout: &AcerRollout) -> Result<()> {
        rollout.check_shapes(&self.config, self.n_actions())?;
        if !self.is_allocated() {
            self.config.check_storage_size(Some(rollout.n_actions()))?;
        }

        let allocated = self.storage.write(self.capacity, self.next_idx, rollout);
        if let Some(slots) = self.storage.slots().filter(|_| allocated) {
            info!(
                "Allocated replay buffer: capacity = {}, n_envs = {}, n_frames = {}, obs_shape = {:?}, n_actions = {}, {} bytes",
                self.capacity,
                self.config.n_envs,
                self.config.n_frames(),
                self.config.obs_shape,
                slots.n_actions(),
                slots.n_bytes()
            );
        }
        trace!("Put rollout into slot {}", self.next_idx);

        let was_full = self.num_in_buffer == self.capacity;
        self.next_idx = (self.next_idx + 1) % self.capacity;
        self.num_in_buffer = self.capacity.min(self.num_in_buffer + 1);
        if !was_full && self.num_in_buffer == self.capacity {
            debug!("Replay buffer filled all {} slots, wrapping around", self.capacity);
        }

        Ok(())
    }

    /// Samples one slot per environment, uniformly and independently.
    ///
    /// Environments are sampled at different slots rather than at a common
    /// one, which lowers the correlation within the batch.
    pub fn get(&mut self) -> Result<AcerBatch> {
        if !self.can_sample() {
            return Err(AcerBufferError::EmptyBuffer.into());
        }

        let num_in_buffer = self.num_in_buffer;
        let rng = &mut self.rng;
        let idx = (0..self.config.n_envs)
            .map(|_| rng.gen_range(0..num_in_buffer))
            .collect::<Vec<_>>();

        self.get_with_indices(&idx)
    }

    /// Builds a batch from the given slot of each environment.
    ///
    /// `idx[e]` is the slot of environment `e` and must be smaller than [`AcerReplayBuffer::len`].
    pub fn get_with_indices(&self, idx: &[usize]) -> Result<AcerBatch> {
        let slots = self.storage.slots().ok_or(AcerBufferError::EmptyBuffer)?;

        let n_envs = self.config.n_envs;
        if idx.len() != n_envs {
            return Err(AcerBufferError::InvalidShape {
                field: "idx",
                expected: vec![n_envs],
                actual: vec![idx.len()],
            }
            .into());
        }
        if let Some(&index) = idx.iter().find(|&&i| i >= self.num_in_buffer) {
            return Err(AcerBufferError::IndexOutOfBounds {
                field: "idx",
                index,
                bound: self.num_in_buffer,
            }
            .into());
        }
        trace!("Sample slots {:?}", idx);

        let envx = (0..n_envs).collect::<Vec<_>>();
        let dones = take(&slots.dones, idx, &envx)?;
        let enc_obs = take(&slots.enc_obs, idx, &envx)?;
        let obs = self.decode(&enc_obs, &dones)?;

        Ok(AcerBatch {
            obs,
            actions: take(&slots.actions, idx, &envx)?,
            rewards: take(&slots.rewards, idx, &envx)?,
            mus: take(&slots.mus, idx, &envx)?,
            dones,
            masks: take(&slots.masks, idx, &envx)?,
            ix_sample: idx.to_vec(),
        })
    }

    /// Stacks raw frames with the `n_stack` of this buffer, see [`decode`](crate::decode).
    pub fn decode<S, T>(
        &self,
        enc_obs: &ArrayBase<S, Ix5>,
        dones: &ArrayBase<T, Ix2>,
    ) -> Result<Array5<u8>>
    where
        S: Data<Elem = u8>,
        T: Data<Elem = bool>,
    {
        decode(enc_obs, dones, self.config.n_stack)
    }
}

impl ExperienceBufferBase for AcerReplayBuffer {
    type Item = AcerRollout;

    fn push(&mut self, item: Self::Item) -> Result<()> {
        self.put(&item)
    }

    fn len(&self) -> usize {
        self.num_in_buffer
    }
}

impl ReplayBufferBase for AcerReplayBuffer {
    type Config = AcerReplayBufferConfig;
    type Batch = AcerBatch;

    fn build(config: &Self::Config) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            config: config.clone(),
            capacity: config.capacity(),
            next_idx: 0,
            num_in_buffer: 0,
            storage: Storage::Empty,
            rng: StdRng::seed_from_u64(config.seed),
        })
    }

    fn batch(&mut self) -> Result<Self::Batch> {
        self.get()
    }
}
