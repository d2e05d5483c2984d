//! Interfaces of replay buffers.
//!
//! Admission and sampling are separate traits, so a writer only needs
//! [`ExperienceBufferBase`] while a learner uses [`ReplayBufferBase`].
use anyhow::Result;

/// Interface for buffers that store experiences from environments.
pub trait ExperienceBufferBase {
    /// Items pushed into the buffer.
    type Item;

    /// Pushes an item into the buffer.
    fn push(&mut self, item: Self::Item) -> Result<()>;

    /// The number of items in the buffer.
    fn len(&self) -> usize;

    /// Returns `true` if the buffer holds no items.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Interface for replay buffers that generate batches for training.
pub trait ReplayBufferBase {
    /// Configuration of the replay buffer.
    type Config: Clone;

    /// Batch generated from the buffer.
    type Batch;

    /// Builds a replay buffer from the configuration.
    fn build(config: &Self::Config) -> Result<Self>
    where
        Self: Sized;

    /// Samples a batch for training.
    fn batch(&mut self) -> Result<Self::Batch>;
}
