//! Environment traits and types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{Action, ActionSpace, Observation, ObservationSpace, Reward, State, StateSpace};

/// Result of a single environment step
#[derive(Debug, Clone)]
pub struct Step<O, S> {
    /// Observation from the environment
    pub observation: O,
    /// Reward signal
    pub reward: Reward,
    /// Whether the episode is done
    pub done: bool,
    /// Whether the episode was truncated (e.g., time limit)
    pub truncated: bool,
    /// Additional info from the environment
    pub info: StepInfo,
    /// Internal state (if available)
    pub state: Option<S>,
}

/// Additional information from a step
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepInfo {
    /// Custom fields
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl StepInfo {
    /// Build info from any serializable value that encodes as a JSON object.
    /// Non-object values land under a `"value"` key.
    pub fn from_serializable<T: Serialize>(value: &T) -> crate::Result<Self> {
        let fields = match serde_json::to_value(value)? {
            serde_json::Value::Object(map) => map,
            other => {
                let mut map = serde_json::Map::new();
                map.insert("value".to_string(), other);
                map
            }
        };
        Ok(Self { fields })
    }

    /// Insert a custom field
    pub fn insert(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.fields.insert(key.into(), value);
    }

    /// Look up a custom field
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.fields.get(key)
    }
}

/// Episode information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Episode {
    /// Episode ID
    pub id: String,
    /// Total reward
    pub total_reward: f64,
    /// Number of steps
    pub steps: usize,
    /// Whether episode was truncated
    pub truncated: bool,
    /// Start time
    pub start_time: chrono::DateTime<chrono::Utc>,
    /// End time
    pub end_time: Option<chrono::DateTime<chrono::Utc>>,
}

impl Episode {
    /// Start a fresh episode now
    #[must_use]
    pub fn begin() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            total_reward: 0.0,
            steps: 0,
            truncated: false,
            start_time: chrono::Utc::now(),
            end_time: None,
        }
    }

    /// Whether the episode has ended
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.end_time.is_some()
    }
}

/// Core environment trait
#[async_trait]
pub trait Environment: Send + Sync {
    /// Observation type
    type Observation: Observation;
    /// Action type
    type Action: Action;
    /// State type
    type State: State;

    /// Get the observation space
    fn observation_space(&self) -> Box<dyn ObservationSpace<Observation = Self::Observation>>;

    /// Get the action space
    fn action_space(&self) -> Box<dyn ActionSpace<Action = Self::Action>>;

    /// Get the state space (if available)
    fn state_space(&self) -> Option<Box<dyn StateSpace<State = Self::State>>> {
        None
    }

    /// Reset the environment
    async fn reset(&mut self) -> crate::Result<(Self::Observation, StepInfo)>;

    /// Take a step in the environment
    async fn step(&mut self, action: Self::Action) -> crate::Result<Step<Self::Observation, Self::State>>;

    /// Render the environment (optional)
    async fn render(&self) -> crate::Result<()> {
        Ok(())
    }

    /// Close the environment
    async fn close(&mut self) -> crate::Result<()> {
        Ok(())
    }

    /// Get current episode info
    fn episode_info(&self) -> Option<Episode> {
        None
    }
}

/// Episode bookkeeping for environments that keep none of their own.
///
/// When the inner environment reports [`Environment::episode_info`] itself,
/// that record wins and the wrapper's own copy is only a fallback.
pub struct TrackedEnvironment<E> {
    /// Inner environment
    pub env: E,
    /// Current episode
    pub episode: Option<Episode>,
    /// Step counter
    pub step_count: usize,
}

impl<E> TrackedEnvironment<E> {
    /// Create a new tracked environment
    pub fn new(env: E) -> Self {
        Self {
            env,
            episode: None,
            step_count: 0,
        }
    }
}

#[async_trait]
impl<E> Environment for TrackedEnvironment<E>
where
    E: Environment,
{
    type Observation = E::Observation;
    type Action = E::Action;
    type State = E::State;

    fn observation_space(&self) -> Box<dyn ObservationSpace<Observation = Self::Observation>> {
        self.env.observation_space()
    }

    fn action_space(&self) -> Box<dyn ActionSpace<Action = Self::Action>> {
        self.env.action_space()
    }

    fn state_space(&self) -> Option<Box<dyn StateSpace<State = Self::State>>> {
        self.env.state_space()
    }

    async fn reset(&mut self) -> crate::Result<(Self::Observation, StepInfo)> {
        if let Some(ref mut episode) = self.episode {
            if episode.end_time.is_none() {
                episode.end_time = Some(chrono::Utc::now());
            }
        }

        self.episode = Some(Episode::begin());
        self.step_count = 0;

        self.env.reset().await
    }

    async fn step(&mut self, action: Self::Action) -> crate::Result<Step<Self::Observation, Self::State>> {
        let step = self.env.step(action).await?;

        self.step_count += 1;
        if let Some(ref mut episode) = self.episode {
            episode.total_reward += step.reward.0;
            episode.steps = self.step_count;

            if step.done || step.truncated {
                episode.truncated = step.truncated;
                episode.end_time = Some(chrono::Utc::now());
            }
        }

        Ok(step)
    }

    async fn render(&self) -> crate::Result<()> {
        self.env.render().await
    }

    async fn close(&mut self) -> crate::Result<()> {
        self.env.close().await
    }

    fn episode_info(&self) -> Option<Episode> {
        self.env.episode_info().or_else(|| self.episode.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DiscreteAction, DiscreteSpace};

    #[derive(Debug, Clone)]
    struct Counter(f64);

    impl Observation for Counter {
        fn to_vec(&self) -> Vec<f64> {
            vec![self.0]
        }

        fn shape(&self) -> Vec<usize> {
            vec![1]
        }
    }

    impl State for Counter {
        fn features(&self) -> Vec<f64> {
            vec![self.0]
        }
    }

    struct CounterSpace;

    impl ObservationSpace for CounterSpace {
        type Observation = Counter;

        fn sample(&self) -> Counter {
            Counter(0.0)
        }

        fn contains(&self, _obs: &Counter) -> bool {
            true
        }

        fn shape(&self) -> Vec<usize> {
            vec![1]
        }
    }

    /// Pays 1.0 per step and ends after three steps.
    struct ThreeSteps {
        t: usize,
    }

    #[async_trait]
    impl Environment for ThreeSteps {
        type Observation = Counter;
        type Action = DiscreteAction;
        type State = Counter;

        fn observation_space(&self) -> Box<dyn ObservationSpace<Observation = Counter>> {
            Box::new(CounterSpace)
        }

        fn action_space(&self) -> Box<dyn ActionSpace<Action = DiscreteAction>> {
            Box::new(DiscreteSpace::new(2))
        }

        async fn reset(&mut self) -> crate::Result<(Counter, StepInfo)> {
            self.t = 0;
            Ok((Counter(0.0), StepInfo::default()))
        }

        async fn step(&mut self, _action: DiscreteAction) -> crate::Result<Step<Counter, Counter>> {
            self.t += 1;
            #[allow(clippy::cast_precision_loss)]
            let obs = Counter(self.t as f64);
            Ok(Step {
                observation: obs.clone(),
                reward: Reward(1.0),
                done: false,
                truncated: self.t >= 3,
                info: StepInfo::default(),
                state: Some(obs),
            })
        }
    }

    #[tokio::test]
    async fn test_tracked_environment_accumulates_episode() {
        let mut env = TrackedEnvironment::new(ThreeSteps { t: 0 });
        env.reset().await.unwrap();
        for _ in 0..3 {
            env.step(DiscreteAction(0)).await.unwrap();
        }

        let episode = env.episode_info().unwrap();
        assert_eq!(episode.steps, 3);
        assert!((episode.total_reward - 3.0).abs() < 1e-12);
        assert!(episode.truncated);
        assert!(episode.is_finished());
    }

    #[test]
    fn test_reset_starts_a_new_episode() {
        let mut env = TrackedEnvironment::new(ThreeSteps { t: 0 });
        tokio_test::block_on(async {
            env.reset().await.unwrap();
            env.step(DiscreteAction(1)).await.unwrap();
            let first = env.episode_info().unwrap();

            env.reset().await.unwrap();
            let second = env.episode_info().unwrap();
            assert_ne!(first.id, second.id);
            assert_eq!(second.steps, 0);
            assert!(!second.is_finished());
        });
    }

    /// Keeps its own episode record, scaled so it differs from the wrapper's
    struct SelfTracking {
        inner: ThreeSteps,
        episode: Option<Episode>,
    }

    #[async_trait]
    impl Environment for SelfTracking {
        type Observation = Counter;
        type Action = DiscreteAction;
        type State = Counter;

        fn observation_space(&self) -> Box<dyn ObservationSpace<Observation = Counter>> {
            self.inner.observation_space()
        }

        fn action_space(&self) -> Box<dyn ActionSpace<Action = DiscreteAction>> {
            self.inner.action_space()
        }

        async fn reset(&mut self) -> crate::Result<(Counter, StepInfo)> {
            self.episode = Some(Episode::begin());
            self.inner.reset().await
        }

        async fn step(&mut self, action: DiscreteAction) -> crate::Result<Step<Counter, Counter>> {
            let step = self.inner.step(action).await?;
            if let Some(episode) = self.episode.as_mut() {
                episode.total_reward += 10.0 * step.reward.0;
                episode.steps += 1;
            }
            Ok(step)
        }

        fn episode_info(&self) -> Option<Episode> {
            self.episode.clone()
        }
    }

    #[tokio::test]
    async fn test_inner_episode_record_wins() {
        let mut env = TrackedEnvironment::new(SelfTracking { inner: ThreeSteps { t: 0 }, episode: None });
        env.reset().await.unwrap();
        env.step(DiscreteAction(0)).await.unwrap();

        let episode = env.episode_info().unwrap();
        assert!((episode.total_reward - 10.0).abs() < 1e-12);
        assert_eq!(episode.id, env.env.episode.as_ref().unwrap().id);
        // the wrapper still kept its own count
        assert_eq!(env.step_count, 1);
    }

    #[test]
    fn test_step_info_from_struct() {
        #[derive(Serialize)]
        struct Sample {
            money: u32,
        }

        let mut info = StepInfo::from_serializable(&Sample { money: 3000 }).unwrap();
        info.insert("extra", serde_json::json!(true));
        assert_eq!(info.get("money"), Some(&serde_json::json!(3000)));
        assert_eq!(info.get("extra"), Some(&serde_json::json!(true)));
    }
}
