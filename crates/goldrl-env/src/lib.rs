//! Pokémon Gold reinforcement learning environment
//!
//! Builds on the decoded [`goldrl_state::GameSnapshot`]:
//!
//! - [`skills`]: the closed catalogue of sub-goals and their shaping rewards
//! - [`tasks`]: the high-level plan and its progression
//! - [`reward`]: per-step reward composition and the category ledger
//! - [`env`]: [`GoldEnv`], an [`goldrl_core::Environment`] over any emulator
//! - [`planner`] and [`controller`]: language-model sub-goal selection

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod controller;
pub mod env;
pub mod episode_log;
pub mod error;
pub mod observation;
pub mod planner;
pub mod reward;
pub mod skills;
pub mod tasks;
pub mod wrappers;

pub use config::GoldConfig;
pub use controller::{restart_from_best, restart_from_state, ControlMode, HierarchicalController, SegmentPlan};
pub use env::{build_envs, EnvOptions, GoldEnv};
pub use episode_log::{BestRecord, EpisodeLog, EpisodeRecord, EpisodeScore};
pub use error::{ConfigError, PlanError};
pub use observation::{GameObservation, GameObservationSpace};
pub use planner::{ChatMessage, Planner, PlanningRequest, PlanningSlot, Role};
pub use reward::{CategoryLedger, CategoryRewards, CategoryWeights, RewardComposer, RewardConfig, StepReward};
pub use skills::{HealLocation, Skill, SkillAssignment, AVAILABLE_SKILLS, HOME_CENTER, POKEMON_CENTERS};
pub use tasks::{Plan, Task, TaskCondition, TaskProgression};
pub use wrappers::FrameStack;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        GameObservation, GoldConfig, GoldEnv, HierarchicalController, Plan, Planner, RewardComposer, Skill,
        SkillAssignment, TaskProgression,
    };
    pub use goldrl_core::prelude::*;
    pub use goldrl_state::{GameSnapshot, StateExtractor};
}
