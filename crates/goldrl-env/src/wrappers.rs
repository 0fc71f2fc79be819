//! Environment wrappers

use std::collections::VecDeque;

use async_trait::async_trait;
use ndarray::{concatenate, Array3, ArrayView3, Axis};

use goldrl_core::{ActionSpace, Environment, Episode, ObservationSpace, RLError, Step, StepInfo, StateSpace};

use crate::config::GoldConfig;
use crate::observation::{GameObservation, GameObservationSpace};

/// Default number of stacked frames
pub const DEFAULT_STACK: usize = 4;

/// Stacks the last `n` grayscale frames on the channel axis
pub struct FrameStack<E> {
    /// Inner environment
    pub env: E,
    frames: VecDeque<Array3<u8>>,
    n: usize,
}

impl<E> FrameStack<E> {
    /// Wrap `env`, keeping `n` frames (at least one)
    pub fn new(env: E, n: usize) -> Self {
        let n = n.max(1);
        Self { env, frames: VecDeque::with_capacity(n), n }
    }

    /// Wrap `env` with the configured `frame_stack` depth
    pub fn from_config(env: E, config: &GoldConfig) -> Self {
        Self::new(env, config.frame_stack)
    }

    /// Stack depth
    pub fn depth(&self) -> usize {
        self.n
    }

    fn push(&mut self, frame: Array3<u8>) {
        if self.frames.len() == self.n {
            self.frames.pop_front();
        }
        self.frames.push_back(frame);
    }

    fn stacked(&self, latest: GameObservation) -> goldrl_core::Result<GameObservation> {
        let views: Vec<ArrayView3<'_, u8>> = self.frames.iter().map(|f| f.view()).collect();
        let image = concatenate(Axis(0), &views)
            .map_err(|e| RLError::Computation(format!("frame stack: {e}")))?;
        Ok(GameObservation { image, state: latest.state })
    }
}

#[async_trait]
impl<E> Environment for FrameStack<E>
where
    E: Environment<Observation = GameObservation>,
{
    type Observation = GameObservation;
    type Action = E::Action;
    type State = E::State;

    fn observation_space(&self) -> Box<dyn ObservationSpace<Observation = Self::Observation>> {
        Box::new(GameObservationSpace::new(self.n))
    }

    fn action_space(&self) -> Box<dyn ActionSpace<Action = Self::Action>> {
        self.env.action_space()
    }

    fn state_space(&self) -> Option<Box<dyn StateSpace<State = Self::State>>> {
        self.env.state_space()
    }

    async fn reset(&mut self) -> goldrl_core::Result<(Self::Observation, StepInfo)> {
        let (obs, info) = self.env.reset().await?;
        self.frames.clear();
        for _ in 0..self.n {
            self.frames.push_back(obs.image.clone());
        }
        Ok((self.stacked(obs)?, info))
    }

    async fn step(&mut self, action: Self::Action) -> goldrl_core::Result<Step<Self::Observation, Self::State>> {
        let step = self.env.step(action).await?;
        self.push(step.observation.image.clone());
        let observation = self.stacked(step.observation)?;
        Ok(Step {
            observation,
            reward: step.reward,
            done: step.done,
            truncated: step.truncated,
            info: step.info,
            state: step.state,
        })
    }

    async fn render(&self) -> goldrl_core::Result<()> {
        self.env.render().await
    }

    async fn close(&mut self) -> goldrl_core::Result<()> {
        self.env.close().await
    }

    fn episode_info(&self) -> Option<Episode> {
        self.env.episode_info()
    }
}
