//! TOML configuration for the environment and the training loop around it

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::reward::RewardConfig;

/// Environment variable overriding [`GoldConfig::rom_path`]
pub const ROM_ENV: &str = "GOLDRL_ROM";
/// Environment variable overriding [`GoldConfig::initial_state_path`]
pub const STATE_ENV: &str = "GOLDRL_STATE";
/// Environment variable overriding [`GoldConfig::plan_path`]
pub const PLAN_ENV: &str = "GOLDRL_PLAN";

/// Full configuration, every field optional in the file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GoldConfig {
    /// Cartridge image used for map connections
    pub rom_path: Option<PathBuf>,
    /// Save state loaded on every reset
    pub initial_state_path: Option<PathBuf>,
    /// Task plan JSON
    pub plan_path: PathBuf,
    /// Where the best episode's end state is written
    pub best_state_path: PathBuf,
    /// Per-episode CSV log
    pub episode_log_path: PathBuf,
    /// Steps before an episode is truncated
    pub max_episode_steps: usize,
    /// Emulator frames per action
    pub frame_skip: u32,
    /// Parallel environments
    pub num_envs: usize,
    /// Planner segments between best-state reloads
    pub sync_interval: usize,
    /// Grayscale frames stacked per observation
    pub frame_stack: usize,
    /// Reward weights
    pub reward: RewardConfig,
}

impl Default for GoldConfig {
    fn default() -> Self {
        Self {
            rom_path: None,
            initial_state_path: None,
            plan_path: PathBuf::from("plan.json"),
            best_state_path: PathBuf::from("best.state"),
            episode_log_path: PathBuf::from("episodes.csv"),
            max_episode_steps: 131_072,
            frame_skip: 4,
            num_envs: 8,
            sync_interval: 10,
            frame_stack: 4,
            reward: RewardConfig::default(),
        }
    }
}

impl GoldConfig {
    /// Where the best episode's end state is saved and restarted from
    #[must_use]
    pub fn best_state_path(&self) -> &Path {
        &self.best_state_path
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load, validate, then apply environment overrides
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        Ok(Self::from_toml_str(&text)?.with_env_overrides())
    }

    /// Render as TOML
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Write as TOML
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let text = self.to_toml_string()?;
        std::fs::write(path, text).map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })
    }

    /// Apply `GOLDRL_ROM`, `GOLDRL_STATE` and `GOLDRL_PLAN`
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var_os(key).map(PathBuf::from))
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<PathBuf>) -> Self {
        if let Some(rom) = lookup(ROM_ENV) {
            self.rom_path = Some(rom);
        }
        if let Some(state) = lookup(STATE_ENV) {
            self.initial_state_path = Some(state);
        }
        if let Some(plan) = lookup(PLAN_ENV) {
            self.plan_path = plan;
        }
        self
    }

    /// Reject values the environment cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("max_episode_steps", self.max_episode_steps),
            ("num_envs", self.num_envs),
            ("sync_interval", self.sync_interval),
            ("frame_stack", self.frame_stack),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(ConfigError::Invalid { field, reason: "must be at least 1".to_string() });
            }
        }
        if self.frame_skip == 0 {
            return Err(ConfigError::Invalid { field: "frame_skip", reason: "must be at least 1".to_string() });
        }
        Ok(())
    }
}
