//! Reconstruction of stacked observations from raw frames.
use crate::error::AcerBufferError;
use anyhow::Result;
use ndarray::{s, Array2, Array5, ArrayBase, Data, Ix2, Ix5, Zip};
use num_traits::Zero;

/// Stacks the raw frames of a rollout into observations.
///
/// * `enc_obs` - Raw frames, `[n_envs, n_steps + n_stack, height, width, n_channels]`.
///   The first `n_stack - 1` rows of each environment only provide history.
/// * `dones` - Episode termination flags, `[n_envs, n_steps]`.
///
/// Returns observations of shape `[n_envs, n_steps + 1, height, width, n_stack * n_channels]`.
/// Along the channel axis, frames are ordered from the oldest to the most recent.
///
/// A frame never crosses an episode boundary: if `dones[e, j]` is set, the
/// observations after step `j` see zeros in place of the frame of step `j` and
/// every frame before it.
///
/// # Examples
///
/// ```
/// use border_acer_buffer::decode;
/// use ndarray::{Array, Array2};
///
/// // One environment, 3 steps, 2 stacked 1x1 frames
/// let enc_obs = Array::from_shape_vec((1, 5, 1, 1, 1), vec![1u8, 2, 3, 4, 5]).unwrap();
/// let dones = Array2::from_shape_vec((1, 3), vec![false, true, false]).unwrap();
///
/// let obs = decode(&enc_obs, &dones, 2).unwrap();
/// let obs = obs.into_shape((4, 2)).unwrap();
/// assert_eq!(obs.row(0).to_vec(), vec![1, 2]);
/// assert_eq!(obs.row(1).to_vec(), vec![2, 3]);
/// assert_eq!(obs.row(2).to_vec(), vec![0, 4]);
/// assert_eq!(obs.row(3).to_vec(), vec![4, 5]);
/// ```
pub fn decode<A, S, T>(
    enc_obs: &ArrayBase<S, Ix5>,
    dones: &ArrayBase<T, Ix2>,
    n_stack: usize,
) -> Result<Array5<A>>
where
    A: Clone + Zero,
    S: Data<Elem = A>,
    T: Data<Elem = bool>,
{
    if n_stack == 0 {
        return Err(AcerBufferError::InvalidConfig("n_stack must be positive".to_string()).into());
    }

    let (n_envs, n_frames, height, width, n_channels) = enc_obs.dim();
    let (n_envs_dones, n_steps) = dones.dim();
    if n_envs_dones != n_envs || n_frames != n_steps + n_stack {
        return Err(AcerBufferError::InvalidShape {
            field: "enc_obs",
            expected: vec![n_envs_dones, n_steps + n_stack, height, width, n_channels],
            actual: enc_obs.shape().to_vec(),
        }
        .into());
    }

    let n_warmup = n_stack - 1;
    let n_out = n_steps + 1;

    // keep[e, m] is false iff the episode ended right after raw frame m
    let keep = Array2::from_shape_fn((n_envs, n_warmup + n_steps), |(e, m)| {
        m < n_warmup || !dones[[e, m - n_warmup]]
    });

    // Output step t sits on raw frame t + n_warmup. Stack depth k reaches back
    // to raw frame t + n_warmup - k and survives only if no frame in between
    // ended an episode. Once cleared, alive stays false for deeper stack positions.
    let mut alive = Array2::from_elem((n_envs, n_out), true);
    let mut obs = Array5::<A>::zeros((n_envs, n_out, height, width, n_stack * n_channels));

    for k in 0..n_stack {
        if k > 0 {
            Zip::indexed(&mut alive).for_each(|(e, t), a| *a = *a && keep[[e, t + n_warmup - k]]);
        }

        let block = n_stack - 1 - k;
        let channels = block * n_channels..(block + 1) * n_channels;
        let offset = n_warmup - k;

        for e in 0..n_envs {
            for t in 0..n_out {
                if alive[[e, t]] {
                    obs.slice_mut(s![e, t, .., .., channels.clone()])
                        .assign(&enc_obs.slice(s![e, offset + t, .., .., ..]));
                }
            }
        }
    }

    Ok(obs)
}
