//! The Gold environment: emulator in, observations and shaped rewards out

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, info};

use goldrl_core::{
    ActionSpace, DiscreteAction, DiscreteSpace, Emulator, Environment, Episode, JoypadAction, ObservationSpace,
    RLError, Result, Reward, Step, StepInfo,
};
use goldrl_state::{GameSnapshot, StateExtractor};

use crate::config::GoldConfig;
use crate::observation::{GameObservation, GameObservationSpace};
use crate::reward::{CategoryLedger, RewardComposer, RewardConfig};
use crate::skills::{Skill, SkillAssignment};

/// Frames run with no input after loading the initial state
pub const SETTLE_FRAMES: u32 = 5;

/// Per-environment settings
#[derive(Debug, Clone)]
pub struct EnvOptions {
    /// Steps before an episode is truncated
    pub max_episode_steps: usize,
    /// Emulator frames per action
    pub frame_skip: u32,
    /// Save state loaded on reset; `None` boots the cartridge
    pub initial_state_path: Option<PathBuf>,
    /// Reward weights
    pub reward: RewardConfig,
}

impl Default for EnvOptions {
    fn default() -> Self {
        Self::from(&GoldConfig::default())
    }
}

impl From<&GoldConfig> for EnvOptions {
    fn from(config: &GoldConfig) -> Self {
        Self {
            max_episode_steps: config.max_episode_steps,
            frame_skip: config.frame_skip,
            initial_state_path: config.initial_state_path.clone(),
            reward: config.reward.clone(),
        }
    }
}

/// One emulator wrapped as an [`Environment`]
pub struct GoldEnv<E> {
    emulator: E,
    extractor: StateExtractor,
    options: EnvOptions,
    composer: RewardComposer,
    ledger: CategoryLedger,
    skill: SkillAssignment,
    main_task: String,
    current: GameSnapshot,
    step_count: usize,
    episode: Option<Episode>,
}

impl<E: Emulator> GoldEnv<E> {
    /// Wrap `emulator`. Call [`Environment::reset`] before stepping.
    pub fn new(emulator: E, extractor: StateExtractor, options: EnvOptions) -> Self {
        let composer = RewardComposer::new(options.reward.clone());
        let ledger = CategoryLedger::seeded(options.reward.categories.clone(), &GameSnapshot::default());
        Self {
            emulator,
            extractor,
            options,
            composer,
            ledger,
            skill: SkillAssignment::default(),
            main_task: String::new(),
            current: GameSnapshot::default(),
            step_count: 0,
            episode: None,
        }
    }

    /// Environment configured by `config`, reading map connections from its ROM if one is set
    pub fn from_config(emulator: E, config: &GoldConfig) -> Self {
        Self::new(emulator, StateExtractor::with_rom_path(config.rom_path.as_deref()), EnvOptions::from(config))
    }

    /// Replace the active skill; its completion bonus becomes payable again
    pub fn set_skill(&mut self, skill: Skill) {
        debug!(skill = %skill, "assigning skill");
        self.skill = SkillAssignment::new(skill);
    }

    /// Active skill and whether its bonus was paid
    pub fn skill(&self) -> &SkillAssignment {
        &self.skill
    }

    /// Task description reported in step info
    pub fn set_main_task(&mut self, task: impl Into<String>) {
        self.main_task = task.into();
    }

    /// Task description last set by the controller
    pub fn main_task(&self) -> &str {
        &self.main_task
    }

    /// State loaded by subsequent resets; `None` boots the cartridge instead
    pub fn set_initial_state_path(&mut self, path: Option<PathBuf>) {
        self.options.initial_state_path = path;
    }

    /// State file subsequent resets load
    pub fn initial_state_path(&self) -> Option<&Path> {
        self.options.initial_state_path.as_deref()
    }

    /// Snapshot after the latest reset or step
    pub fn current_state(&self) -> &GameSnapshot {
        &self.current
    }

    /// Decoder turning emulator memory into snapshots
    pub fn extractor(&self) -> &StateExtractor {
        &self.extractor
    }

    /// Steps taken in the current episode
    pub fn steps(&self) -> usize {
        self.step_count
    }

    /// Wrapped emulator
    pub fn emulator(&self) -> &E {
        &self.emulator
    }

    /// Write the emulator state to `path`
    pub fn save_state(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut writer = BufWriter::new(File::create(path)?);
        self.emulator.save_state(&mut writer)?;
        writer.flush()?;
        debug!(path = %path.display(), "saved emulator state");
        Ok(())
    }

    /// Restore the emulator state from `path` and refresh the snapshot
    pub fn load_state(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut reader = BufReader::new(File::open(path)?);
        self.emulator.load_state(&mut reader)?;
        self.current = self.extractor.get_state_dict(&self.emulator);
        Ok(())
    }

    fn observe(&self) -> Result<GameObservation> {
        let screen = self.emulator.capture_screen()?;
        GameObservation::from_screen(&screen, &self.current)
    }

    fn boot(&mut self) -> Result<()> {
        match self.options.initial_state_path.clone() {
            Some(path) => {
                let file = File::open(&path).map_err(|e| {
                    RLError::Environment(format!("cannot open initial state {}: {e}", path.display()))
                })?;
                self.emulator.load_state(&mut BufReader::new(file))?;
                self.emulator.step(JoypadAction::Noop, SETTLE_FRAMES)
            }
            None => self.emulator.reset(),
        }
    }
}

/// One environment per `num_envs`, each around the emulator `make_emulator` builds for that index
pub fn build_envs<E: Emulator>(config: &GoldConfig, mut make_emulator: impl FnMut(usize) -> E) -> Vec<GoldEnv<E>> {
    (0..config.num_envs).map(|i| GoldEnv::from_config(make_emulator(i), config)).collect()
}

#[async_trait]
impl<E: Emulator> Environment for GoldEnv<E> {
    type Observation = GameObservation;
    type Action = DiscreteAction;
    type State = GameSnapshot;

    fn observation_space(&self) -> Box<dyn ObservationSpace<Observation = Self::Observation>> {
        Box::new(GameObservationSpace::new(1))
    }

    fn action_space(&self) -> Box<dyn ActionSpace<Action = Self::Action>> {
        Box::new(DiscreteSpace::joypad())
    }

    async fn reset(&mut self) -> Result<(Self::Observation, StepInfo)> {
        self.boot()?;
        self.composer.reset();
        self.current = self.extractor.get_state_dict(&self.emulator);
        self.ledger = CategoryLedger::seeded(self.options.reward.categories.clone(), &self.current);
        self.step_count = 0;
        self.episode = Some(Episode::begin());

        let (bank, map) = self.current.location.map_key();
        info!(map_bank = bank, map_id = map, events = self.current.events_completed(), "environment reset");

        let mut info = StepInfo::from_serializable(&self.current)?;
        info.insert("main_task", json!(self.main_task));
        Ok((self.observe()?, info))
    }

    async fn step(&mut self, action: Self::Action) -> Result<Step<Self::Observation, Self::State>> {
        let button = JoypadAction::try_from(action)?;
        self.emulator.step(button, self.options.frame_skip)?;

        let next = self.extractor.get_state_dict(&self.emulator);
        let prev = std::mem::replace(&mut self.current, next);
        let reward = self.composer.compose(&prev, &self.current, &mut self.skill);
        let categories = self.ledger.record(&prev, &self.current);

        self.step_count += 1;
        let truncated = self.step_count >= self.options.max_episode_steps;

        let mut info = StepInfo::from_serializable(&self.current)?;
        info.insert("reward", serde_json::to_value(reward)?);
        info.insert("reward_categories", serde_json::to_value(categories.non_zero())?);
        info.insert("skill", json!(self.skill.skill().description()));
        info.insert("main_task", json!(self.main_task));

        if let Some(episode) = self.episode.as_mut() {
            episode.total_reward += reward.total;
            episode.steps = self.step_count;
            if truncated {
                episode.truncated = true;
                episode.end_time = Some(chrono::Utc::now());
                info.insert("episode", json!({ "r": episode.total_reward, "l": episode.steps }));
                info!(
                    episode = %episode.id,
                    reward = episode.total_reward,
                    steps = episode.steps,
                    events = self.current.events_completed(),
                    "episode finished"
                );
            }
        }

        Ok(Step {
            observation: self.observe()?,
            reward: Reward(reward.total),
            done: truncated,
            truncated,
            info,
            state: Some(self.current.clone()),
        })
    }

    fn episode_info(&self) -> Option<Episode> {
        self.episode.clone()
    }
}
