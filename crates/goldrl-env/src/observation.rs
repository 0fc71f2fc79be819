//! Policy observations: a grayscale screen plus the normalised state vector

use ndarray::{s, Array1, Array3, Axis};
use rand::Rng;
use serde::{Deserialize, Serialize};

use goldrl_core::{Observation, ObservationSpace, RLError, Result, Screen, SCREEN_HEIGHT, SCREEN_WIDTH};
use goldrl_state::GameSnapshot;

/// Length of [`GameSnapshot::state_vector`]
pub const STATE_DIM: usize = 5;

/// Screen frames (channel-first) and the state vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameObservation {
    /// `frames x 144 x 160` grayscale pixels
    pub image: Array3<u8>,
    /// `[x, y, map_bank, map_id, badges]`
    pub state: Array1<f32>,
}

impl GameObservation {
    /// Build a single-frame observation from a raw screen capture
    pub fn from_screen(screen: &Screen, snapshot: &GameSnapshot) -> Result<Self> {
        Ok(Self { image: grayscale(screen)?, state: Array1::from(snapshot.state_vector().to_vec()) })
    }

    /// Number of stacked frames
    #[must_use]
    pub fn frames(&self) -> usize {
        self.image.dim().0
    }
}

impl Observation for GameObservation {
    fn to_vec(&self) -> Vec<f64> {
        self.image
            .iter()
            .map(|&p| f64::from(p))
            .chain(self.state.iter().map(|&v| f64::from(v)))
            .collect()
    }

    fn shape(&self) -> Vec<usize> {
        self.image.shape().to_vec()
    }
}

/// Convert an `H x W x C` capture into a `1 x H x W` grayscale frame.
///
/// Colour captures are averaged over their first three channels; an alpha
/// channel is ignored. Single-channel captures are passed through.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn grayscale(screen: &Screen) -> Result<Array3<u8>> {
    let (height, width, channels) = screen.dim();
    if (height, width) != (SCREEN_HEIGHT, SCREEN_WIDTH) {
        return Err(RLError::DimensionMismatch {
            expected: SCREEN_HEIGHT * SCREEN_WIDTH,
            actual: height * width,
        });
    }
    if channels == 0 {
        return Err(RLError::DimensionMismatch { expected: 3, actual: 0 });
    }

    let colour = screen.slice(s![.., .., ..channels.min(3)]).mapv(f32::from);
    let mean = colour
        .mean_axis(Axis(2))
        .ok_or_else(|| RLError::Computation("empty channel axis".to_string()))?;
    Ok(mean.mapv(|v| v as u8).insert_axis(Axis(0)))
}

/// Observation space of a `frames`-deep stack
#[derive(Debug, Clone, Copy)]
pub struct GameObservationSpace {
    frames: usize,
}

impl GameObservationSpace {
    /// Space of observations with `frames` stacked grayscale frames
    #[must_use]
    pub fn new(frames: usize) -> Self {
        Self { frames: frames.max(1) }
    }
}

impl Default for GameObservationSpace {
    fn default() -> Self {
        Self::new(1)
    }
}

impl ObservationSpace for GameObservationSpace {
    type Observation = GameObservation;

    fn sample(&self) -> Self::Observation {
        let mut rng = rand::thread_rng();
        let image = Array3::from_shape_fn((self.frames, SCREEN_HEIGHT, SCREEN_WIDTH), |_| rng.gen::<u8>());
        let mut state: Array1<f32> = Array1::from_shape_fn(STATE_DIM, |_| rng.gen_range(-1.0..=1.0));
        state[STATE_DIM - 1] = rng.gen_range(0.0..=1.0);
        GameObservation { image, state }
    }

    fn contains(&self, obs: &Self::Observation) -> bool {
        let state_ok = obs.state.len() == STATE_DIM
            && obs.state.iter().take(STATE_DIM - 1).all(|v| (-1.0..=1.0).contains(v))
            && (0.0..=1.0).contains(&obs.state[STATE_DIM - 1]);
        obs.image.dim() == (self.frames, SCREEN_HEIGHT, SCREEN_WIDTH) && state_ok
    }

    fn shape(&self) -> Vec<usize> {
        vec![self.frames, SCREEN_HEIGHT, SCREEN_WIDTH]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn screen(channels: usize, fill: impl Fn(usize) -> u8) -> Screen {
        Array3::from_shape_fn((SCREEN_HEIGHT, SCREEN_WIDTH, channels), |(_, _, c)| fill(c))
    }

    #[test]
    fn test_rgb_capture_is_averaged() {
        let rgb = screen(3, |c| [30, 60, 90][c]);
        let gray = grayscale(&rgb).unwrap();
        assert_eq!(gray.dim(), (1, SCREEN_HEIGHT, SCREEN_WIDTH));
        assert!(gray.iter().all(|&p| p == 60));
    }

    #[test]
    fn test_alpha_channel_is_ignored() {
        let rgba = screen(4, |c| [10, 20, 30, 255][c]);
        let gray = grayscale(&rgba).unwrap();
        assert!(gray.iter().all(|&p| p == 20));
    }

    #[test]
    fn test_wrong_resolution_is_rejected() {
        let small = Array3::<u8>::zeros((10, 10, 3));
        assert!(matches!(grayscale(&small), Err(RLError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_observation_carries_state_vector() {
        let mut snap = GameSnapshot::default();
        snap.location.map_bank = 24;
        snap.player_info.johto_badges_count = 2;
        let obs = GameObservation::from_screen(&screen(3, |_| 0), &snap).unwrap();
        assert_eq!(obs.state.len(), STATE_DIM);
        assert!((obs.state[4] - 0.25).abs() < 1e-6);
        assert_eq!(obs.to_vec().len(), SCREEN_HEIGHT * SCREEN_WIDTH + STATE_DIM);

        let space = GameObservationSpace::default();
        assert!(space.contains(&obs));
        assert!(space.contains(&space.sample()));
        assert!(!GameObservationSpace::new(4).contains(&obs));
    }
}
