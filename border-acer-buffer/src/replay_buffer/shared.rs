//! Replay buffer shared between threads.
use super::{AcerBatch, AcerReplayBuffer, AcerReplayBufferConfig, AcerRollout};
use crate::{error::AcerBufferError, ExperienceBufferBase, ReplayBufferBase};
use anyhow::Result;
use std::sync::{Arc, Mutex, MutexGuard};

/// A handle of [`AcerReplayBuffer`] that can be cloned and sent to other threads.
///
/// `put` writes slots in place while `get` reads them, so every call holds
/// the lock of the buffer until it returns.
#[derive(Clone, Debug)]
pub struct SharedAcerReplayBuffer {
    buffer: Arc<Mutex<AcerReplayBuffer>>,
}

impl SharedAcerReplayBuffer {
    /// Wraps a replay buffer.
    pub fn new(buffer: AcerReplayBuffer) -> Self {
        Self {
            buffer: Arc::new(Mutex::new(buffer)),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, AcerReplayBuffer>> {
        self.buffer
            .lock()
            .map_err(|_| AcerBufferError::LockPoisoned.into())
    }

    /// See [`AcerReplayBuffer::put`].
    pub fn put(&self, rollout: &AcerRollout) -> Result<()> {
        self.lock()?.put(rollout)
    }

    /// See [`AcerReplayBuffer::get`].
    pub fn get(&self) -> Result<AcerBatch> {
        self.lock()?.get()
    }

    /// See [`AcerReplayBuffer::get_with_indices`].
    pub fn get_with_indices(&self, idx: &[usize]) -> Result<AcerBatch> {
        self.lock()?.get_with_indices(idx)
    }

    /// See [`AcerReplayBuffer::has_at_least`].
    pub fn has_at_least(&self, frames: usize) -> Result<bool> {
        Ok(self.lock()?.has_at_least(frames))
    }

    /// See [`AcerReplayBuffer::can_sample`].
    pub fn can_sample(&self) -> Result<bool> {
        Ok(self.lock()?.can_sample())
    }

    /// Number of filled slots.
    pub fn len(&self) -> Result<usize> {
        Ok(self.lock()?.len())
    }
}

impl ExperienceBufferBase for SharedAcerReplayBuffer {
    type Item = AcerRollout;

    fn push(&mut self, item: Self::Item) -> Result<()> {
        self.put(&item)
    }

    /// Reads the count even if the lock is poisoned.
    fn len(&self) -> usize {
        self.buffer
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }
}

impl ReplayBufferBase for SharedAcerReplayBuffer {
    type Config = AcerReplayBufferConfig;
    type Batch = AcerBatch;

    fn build(config: &Self::Config) -> Result<Self> {
        Ok(Self::new(AcerReplayBuffer::build(config)?))
    }

    fn batch(&mut self) -> Result<Self::Batch> {
        self.get()
    }
}
