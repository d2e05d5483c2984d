//! Rollouts pushed into and batches sampled from
//! [`AcerReplayBuffer`](super::AcerReplayBuffer).
use super::AcerReplayBufferConfig;
use crate::error::AcerBufferError;
use anyhow::Result;
use ndarray::{Array2, Array3, Array5};

/// A rollout of `n_steps` steps in all of the `n_envs` environments.
///
/// `enc_obs` holds raw, unstacked frames. Per environment it has
/// `n_steps + n_stack` rows: `n_stack - 1` frames preceding the rollout,
/// the observations at which each of the `n_steps` actions were taken,
/// and the observation after the last step.
#[derive(Clone, Debug, PartialEq)]
pub struct AcerRollout {
    /// Raw frames, `[n_envs, n_steps + n_stack, height, width, n_channels]`.
    pub enc_obs: Array5<u8>,

    /// Actions, `[n_envs, n_steps]`.
    pub actions: Array2<i32>,

    /// Rewards, `[n_envs, n_steps]`.
    pub rewards: Array2<f32>,

    /// Action probabilities of the behavior policy, `[n_envs, n_steps, n_actions]`.
    pub mus: Array3<f32>,

    /// Episode termination flags, `[n_envs, n_steps]`.
    pub dones: Array2<bool>,

    /// Masks, `[n_envs, n_steps]`.
    pub masks: Array2<bool>,
}

impl AcerRollout {
    /// Constructs a rollout.
    pub fn new(
        enc_obs: Array5<u8>,
        actions: Array2<i32>,
        rewards: Array2<f32>,
        mus: Array3<f32>,
        dones: Array2<bool>,
        masks: Array2<bool>,
    ) -> Self {
        Self {
            enc_obs,
            actions,
            rewards,
            mus,
            dones,
            masks,
        }
    }

    /// Number of actions, taken from the last axis of `mus`.
    pub fn n_actions(&self) -> usize {
        self.mus.shape()[2]
    }

    /// Checks the shapes of all arrays.
    ///
    /// `n_actions` is `None` until the buffer has been allocated, in which
    /// case any number of actions is accepted.
    pub(crate) fn check_shapes(
        &self,
        config: &AcerReplayBufferConfig,
        n_actions: Option<usize>,
    ) -> Result<()> {
        let (n_envs, n_steps) = (config.n_envs, config.n_steps);
        let [height, width, n_channels] = config.obs_shape;
        let n_actions = n_actions.unwrap_or_else(|| self.n_actions());

        check_shape(
            "enc_obs",
            &[n_envs, config.n_frames(), height, width, n_channels],
            self.enc_obs.shape(),
        )?;
        check_shape("actions", &[n_envs, n_steps], self.actions.shape())?;
        check_shape("rewards", &[n_envs, n_steps], self.rewards.shape())?;
        check_shape("mus", &[n_envs, n_steps, n_actions], self.mus.shape())?;
        check_shape("dones", &[n_envs, n_steps], self.dones.shape())?;
        check_shape("masks", &[n_envs, n_steps], self.masks.shape())?;
        Ok(())
    }
}

fn check_shape(field: &'static str, expected: &[usize], actual: &[usize]) -> Result<()> {
    if expected != actual {
        return Err(AcerBufferError::InvalidShape {
            field,
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        }
        .into());
    }
    Ok(())
}

/// A batch sampled from [`AcerReplayBuffer`](super::AcerReplayBuffer).
///
/// Row `e` of every array comes from environment `e`.
#[derive(Clone, Debug, PartialEq)]
pub struct AcerBatch {
    /// Stacked observations, `[n_envs, n_steps + 1, height, width, n_stack * n_channels]`.
    pub obs: Array5<u8>,

    /// Actions, `[n_envs, n_steps]`.
    pub actions: Array2<i32>,

    /// Rewards, `[n_envs, n_steps]`.
    pub rewards: Array2<f32>,

    /// Action probabilities of the behavior policy, `[n_envs, n_steps, n_actions]`.
    pub mus: Array3<f32>,

    /// Episode termination flags, `[n_envs, n_steps]`.
    pub dones: Array2<bool>,

    /// Masks, `[n_envs, n_steps]`.
    pub masks: Array2<bool>,

    /// Slot sampled for each environment.
    pub ix_sample: Vec<usize>,
}

impl AcerBatch {
    /// Decomposes the batch into `(obs, actions, rewards, mus, dones, masks)`.
    #[allow(clippy::type_complexity)]
    pub fn unpack(
        self,
    ) -> (
        Array5<u8>,
        Array2<i32>,
        Array2<f32>,
        Array3<f32>,
        Array2<bool>,
        Array2<bool>,
    ) {
        (
            self.obs,
            self.actions,
            self.rewards,
            self.mus,
            self.dones,
            self.masks,
        )
    }

    /// Number of environments in the batch.
    pub fn len(&self) -> usize {
        self.actions.shape()[0]
    }

    /// Returns `true` if the batch has no environments.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rollout(n_envs: usize, n_steps: usize, n_frames: usize, n_actions: usize) -> AcerRollout {
        AcerRollout::new(
            Array5::zeros((n_envs, n_frames, 2, 2, 1)),
            Array2::zeros((n_envs, n_steps)),
            Array2::zeros((n_envs, n_steps)),
            Array3::zeros((n_envs, n_steps, n_actions)),
            Array2::from_elem((n_envs, n_steps), false),
            Array2::from_elem((n_envs, n_steps), false),
        )
    }

    fn config() -> AcerReplayBufferConfig {
        AcerReplayBufferConfig::default()
            .n_envs(3)
            .n_steps(5)
            .n_stack(2)
            .size(50)
            .obs_shape([2, 2, 1])
    }

    #[test]
    fn test_check_shapes() {
        let config = config();

        assert!(rollout(3, 5, 7, 4).check_shapes(&config, None).is_ok());
        assert!(rollout(3, 5, 7, 4).check_shapes(&config, Some(4)).is_ok());

        let err = rollout(3, 5, 7, 4)
            .check_shapes(&config, Some(6))
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<AcerBufferError>(),
            Some(&AcerBufferError::InvalidShape {
                field: "mus",
                expected: vec![3, 5, 6],
                actual: vec![3, 5, 4],
            })
        );

        // One frame short of n_steps + n_stack
        let err = rollout(3, 5, 6, 4).check_shapes(&config, None).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AcerBufferError>(),
            Some(AcerBufferError::InvalidShape { field: "enc_obs", .. })
        ));

        let err = rollout(2, 5, 7, 4).check_shapes(&config, None).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AcerBufferError>(),
            Some(AcerBufferError::InvalidShape { .. })
        ));
    }

    #[test]
    fn test_check_shapes_single_field() {
        let config = config();
        let mut r = rollout(3, 5, 7, 4);
        r.masks = Array2::from_elem((3, 4), true);

        let err = r.check_shapes(&config, Some(4)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AcerBufferError>(),
            Some(AcerBufferError::InvalidShape { field: "masks", .. })
        ));
    }
}
