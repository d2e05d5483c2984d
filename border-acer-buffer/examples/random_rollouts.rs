//! Fills a replay buffer with rollouts of a random policy on a toy image
//! environment and samples stacked observations from it.
use anyhow::Result;
use border_acer_buffer::{AcerReplayBuffer, AcerReplayBufferConfig, AcerRollout, ReplayBufferBase};
use log::info;
use ndarray::{s, Array2, Array3, Array5};

const N_ACTIONS: usize = 4;

/// A dot moving on a grid; the episode ends when it leaves the grid.
struct DotEnv {
    size: usize,
    pos: (usize, usize),
}

impl DotEnv {
    fn new(size: usize) -> Self {
        let mut env = Self { size, pos: (0, 0) };
        env.reset();
        env
    }

    fn reset(&mut self) {
        self.pos = (fastrand::usize(..self.size), fastrand::usize(..self.size));
    }

    fn frame(&self) -> Array3<u8> {
        let mut frame = Array3::zeros((self.size, self.size, 1));
        frame[[self.pos.0, self.pos.1, 0]] = 255;
        frame
    }

    /// Returns reward and done flag. The episode is reset on done.
    fn step(&mut self, act: usize) -> (f32, bool) {
        let (r, c) = (self.pos.0 as isize, self.pos.1 as isize);
        let (r, c) = match act {
            0 => (r - 1, c),
            1 => (r + 1, c),
            2 => (r, c - 1),
            _ => (r, c + 1),
        };
        let size = self.size as isize;
        if r < 0 || c < 0 || r >= size || c >= size {
            self.reset();
            (-1.0, true)
        } else {
            self.pos = (r as usize, c as usize);
            (0.1, false)
        }
    }
}

/// Runs `n_steps` steps in every environment.
///
/// `frames` holds the last `n_stack` frames of each environment and is
/// updated in place, so consecutive rollouts share their boundary frames.
fn run_rollout(
    envs: &mut [DotEnv],
    frames: &mut Array5<u8>,
    config: &AcerReplayBufferConfig,
) -> AcerRollout {
    let (n_envs, n_steps, n_stack) = (config.n_envs, config.n_steps, config.n_stack);
    let [h, w, c] = config.obs_shape;

    let mut enc_obs = Array5::zeros((n_envs, config.n_frames(), h, w, c));
    enc_obs.slice_mut(s![.., ..n_stack, .., .., ..]).assign(&*frames);
    let mut actions = Array2::zeros((n_envs, n_steps));
    let mut rewards = Array2::zeros((n_envs, n_steps));
    let mus = Array3::from_elem((n_envs, n_steps, N_ACTIONS), 1.0 / N_ACTIONS as f32);
    let mut dones = Array2::from_elem((n_envs, n_steps), false);

    for t in 0..n_steps {
        for (e, env) in envs.iter_mut().enumerate() {
            let act = fastrand::usize(..N_ACTIONS);
            let (reward, done) = env.step(act);
            actions[[e, t]] = act as i32;
            rewards[[e, t]] = reward;
            dones[[e, t]] = done;
            enc_obs
                .slice_mut(s![e, n_stack + t, .., .., ..])
                .assign(&env.frame());
        }
    }

    frames.assign(&enc_obs.slice(s![.., n_steps.., .., .., ..]));
    let masks = dones.clone();

    AcerRollout::new(enc_obs, actions, rewards, mus, dones, masks)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    fastrand::seed(42);

    let config = AcerReplayBufferConfig::default()
        .n_envs(4)
        .n_steps(8)
        .n_stack(3)
        .size(8 * 16)
        .obs_shape([6, 6, 1]);
    let mut buffer = AcerReplayBuffer::build(&config)?;

    let mut envs = (0..config.n_envs).map(|_| DotEnv::new(6)).collect::<Vec<_>>();
    let mut frames = Array5::zeros((config.n_envs, config.n_stack, 6, 6, 1));
    // History before the first step repeats the initial frame
    for (e, env) in envs.iter().enumerate() {
        frames.slice_mut(s![e, .., .., .., ..]).assign(&env.frame());
    }

    let mut n_rollouts = 0;
    while !buffer.has_at_least(config.n_steps * 10) {
        let rollout = run_rollout(&mut envs, &mut frames, &config);
        buffer.put(&rollout)?;
        n_rollouts += 1;
    }
    info!(
        "Put {} rollouts, {} slots are filled (capacity = {})",
        n_rollouts,
        buffer.len(),
        buffer.capacity()
    );

    let n_channels = config.obs_shape[2];
    for i in 0..3 {
        let batch = buffer.get()?;
        let n_dones = batch.dones.iter().filter(|&&d| d).count();

        // Frames of the dot environment are never blank, so blank ones were cleared by stacking
        let mut n_zero_frames = 0;
        for e in 0..config.n_envs {
            for t in 0..=config.n_steps {
                for k in 0..config.n_stack {
                    let frame = batch
                        .obs
                        .slice(s![e, t, .., .., k * n_channels..(k + 1) * n_channels]);
                    if frame.iter().all(|&v| v == 0) {
                        n_zero_frames += 1;
                    }
                }
            }
        }
        info!(
            "Batch {}: slots = {:?}, obs shape = {:?}, dones = {}, zeroed frames = {}",
            i,
            batch.ix_sample,
            batch.obs.shape(),
            n_dones,
            n_zero_frames
        );
    }

    Ok(())
}
