//! Configuration of [`AcerReplayBuffer`](super::AcerReplayBuffer).
use crate::error::AcerBufferError;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    default::Default,
    fs::File,
    io::{BufReader, Write},
    mem::size_of,
    path::Path,
};

/// Configuration of [`AcerReplayBuffer`](super::AcerReplayBuffer).
///
/// The buffer holds `size / n_steps` slots. Each slot stores one rollout of
/// `n_steps` steps for all `n_envs` environments, together with the
/// `n_stack` raw frames needed to rebuild stacked observations.
///
/// # Examples
///
/// ```
/// use border_acer_buffer::AcerReplayBufferConfig;
///
/// let config = AcerReplayBufferConfig::default()
///     .n_envs(16)
///     .n_steps(20)
///     .n_stack(4)
///     .size(50_000)
///     .obs_shape([84, 84, 1]);
///
/// assert_eq!(config.capacity(), 2_500);
/// assert_eq!(config.n_frames(), 24);
/// ```
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct AcerReplayBufferConfig {
    /// Number of parallel environments.
    pub n_envs: usize,

    /// Number of steps per environment in a single rollout.
    pub n_steps: usize,

    /// Number of stacked frames in an observation.
    pub n_stack: usize,

    /// Buffer size in steps per environment.
    pub size: usize,

    /// Shape of a raw frame, `[height, width, n_channels]`.
    pub obs_shape: [usize; 3],

    /// Random seed used for sampling slots.
    pub seed: u64,
}

impl Default for AcerReplayBufferConfig {
    fn default() -> Self {
        Self {
            n_envs: 1,
            n_steps: 20,
            n_stack: 4,
            size: 50_000,
            obs_shape: [84, 84, 1],
            seed: 42,
        }
    }
}

impl AcerReplayBufferConfig {
    /// Sets the number of parallel environments.
    pub fn n_envs(mut self, n_envs: usize) -> Self {
        self.n_envs = n_envs;
        self
    }

    /// Sets the number of steps in a rollout.
    pub fn n_steps(mut self, n_steps: usize) -> Self {
        self.n_steps = n_steps;
        self
    }

    /// Sets the number of stacked frames.
    pub fn n_stack(mut self, n_stack: usize) -> Self {
        self.n_stack = n_stack;
        self
    }

    /// Sets the buffer size in steps.
    pub fn size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    /// Sets the shape of a raw frame.
    pub fn obs_shape(mut self, obs_shape: [usize; 3]) -> Self {
        self.obs_shape = obs_shape;
        self
    }

    /// Sets the shape of a raw frame from the observation space of an environment.
    ///
    /// Only image-like observations, `[height, width, n_channels]`, are supported.
    pub fn try_obs_shape(mut self, shape: &[usize]) -> Result<Self> {
        match *shape {
            [height, width, n_channels] => {
                self.obs_shape = [height, width, n_channels];
                Ok(self)
            }
            _ => Err(AcerBufferError::InvalidConfig(format!(
                "observation shape must be [height, width, n_channels], got {:?}",
                shape
            ))
            .into()),
        }
    }

    /// Sets the random seed.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Number of slots in the ring, `size / n_steps`.
    pub fn capacity(&self) -> usize {
        self.size.checked_div(self.n_steps).unwrap_or(0)
    }

    /// Number of raw frames per environment in an encoded observation block.
    pub fn n_frames(&self) -> usize {
        self.n_steps + self.n_stack
    }

    /// Checks that the buffer can be built from this configuration.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| -> Result<()> { Err(AcerBufferError::InvalidConfig(msg).into()) };

        if self.n_envs == 0 {
            return invalid("n_envs must be positive".to_string());
        }
        if self.n_steps == 0 {
            return invalid("n_steps must be positive".to_string());
        }
        if self.n_stack == 0 {
            return invalid("n_stack must be positive".to_string());
        }
        if self.obs_shape.iter().any(|&d| d == 0) {
            return invalid(format!("obs_shape has a zero dimension: {:?}", self.obs_shape));
        }
        if self.capacity() == 0 {
            return invalid(format!(
                "size ({}) must be at least n_steps ({})",
                self.size, self.n_steps
            ));
        }
        self.check_storage_size(None)
    }

    /// Checks that the arrays of all slots can be allocated.
    ///
    /// The width of `mus` is only known from the first rollout, so it is
    /// checked when `n_actions` is given.
    pub(crate) fn check_storage_size(&self, n_actions: Option<usize>) -> Result<()> {
        let [height, width, n_channels] = self.obs_shape;
        let (capacity, n_envs, n_steps) = (self.capacity(), self.n_envs, self.n_steps);
        let n_frames = n_steps.checked_add(self.n_stack).ok_or_else(|| {
            AcerBufferError::InvalidConfig(format!(
                "n_steps + n_stack overflows: {} + {}",
                n_steps, self.n_stack
            ))
        })?;

        check_array_size(
            "enc_obs",
            &[capacity, n_envs, n_frames, height, width, n_channels],
            size_of::<u8>(),
        )?;
        check_array_size("rewards", &[capacity, n_envs, n_steps], size_of::<f32>())?;
        if let Some(n_actions) = n_actions {
            check_array_size(
                "mus",
                &[capacity, n_envs, n_steps, n_actions],
                size_of::<f32>(),
            )?;
        }
        Ok(())
    }

    /// Constructs [`AcerReplayBufferConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`AcerReplayBufferConfig`] as YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

fn check_array_size(field: &str, shape: &[usize], elem_size: usize) -> Result<()> {
    match shape
        .iter()
        .try_fold(elem_size, |n_bytes, &d| n_bytes.checked_mul(d))
    {
        Some(n_bytes) if n_bytes <= isize::MAX as usize => Ok(()),
        _ => Err(AcerBufferError::InvalidConfig(format!(
            "{} of shape {:?} is too large to allocate",
            field, shape
        ))
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn test_serde_acer_replay_buffer_config() -> Result<()> {
        let config = AcerReplayBufferConfig::default()
            .n_envs(4)
            .n_steps(5)
            .n_stack(3)
            .size(100)
            .obs_shape([8, 6, 2])
            .seed(7);

        let dir = TempDir::new("acer_replay_buffer_config")?;
        let path = dir.path().join("acer_replay_buffer_config.yaml");

        config.save(&path)?;
        let config_ = AcerReplayBufferConfig::load(&path)?;
        assert_eq!(config, config_);
        Ok(())
    }

    #[test]
    fn test_capacity() {
        let config = AcerReplayBufferConfig::default().n_steps(20).size(50_000);
        assert_eq!(config.capacity(), 2_500);

        // Leftover steps do not make up a slot
        let config = config.size(59);
        assert_eq!(config.capacity(), 2);

        let config = config.n_steps(0);
        assert_eq!(config.capacity(), 0);
    }

    #[test]
    fn test_validate() {
        assert!(AcerReplayBufferConfig::default().validate().is_ok());

        let bad = [
            AcerReplayBufferConfig::default().n_envs(0),
            AcerReplayBufferConfig::default().n_steps(0),
            AcerReplayBufferConfig::default().n_stack(0),
            AcerReplayBufferConfig::default().obs_shape([84, 0, 1]),
            AcerReplayBufferConfig::default().n_steps(20).size(19),
        ];
        for config in bad.iter() {
            let err = config.validate().unwrap_err();
            assert!(matches!(
                err.downcast_ref::<AcerBufferError>(),
                Some(AcerBufferError::InvalidConfig(_))
            ));
        }
    }

    #[test]
    fn test_validate_rejects_unallocatable_storage() {
        // Capacity is usize::MAX slots
        let config = AcerReplayBufferConfig::default()
            .n_envs(2)
            .n_steps(1)
            .n_stack(1)
            .size(usize::MAX)
            .obs_shape([1, 1, 1]);
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AcerBufferError>(),
            Some(AcerBufferError::InvalidConfig(_))
        ));

        let config = AcerReplayBufferConfig::default()
            .n_steps(usize::MAX)
            .n_stack(1)
            .size(usize::MAX);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_check_storage_size_with_actions() -> Result<()> {
        // enc_obs needs 2 bytes per slot and rewards 4, mus 4 per action
        let config = AcerReplayBufferConfig::default()
            .n_envs(1)
            .n_steps(1)
            .n_stack(1)
            .size(isize::MAX as usize / 4)
            .obs_shape([1, 1, 1]);
        config.validate()?;
        config.check_storage_size(Some(1))?;

        let err = config.check_storage_size(Some(2)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AcerBufferError>(),
            Some(AcerBufferError::InvalidConfig(_))
        ));
        Ok(())
    }

    #[test]
    fn test_try_obs_shape() -> Result<()> {
        let config = AcerReplayBufferConfig::default().try_obs_shape(&[64, 48, 3])?;
        assert_eq!(config.obs_shape, [64, 48, 3]);

        assert!(AcerReplayBufferConfig::default()
            .try_obs_shape(&[4])
            .is_err());
        assert!(AcerReplayBufferConfig::default()
            .try_obs_shape(&[1, 84, 84, 1])
            .is_err());
        Ok(())
    }
}
