//! Core reinforcement learning traits and types for goldrl
//!
//! This crate provides the foundational abstractions shared by the state
//! decoder and the Pokémon Gold environment: the environment contract, the
//! joypad action space, reward signals and the emulator boundary.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod action;
pub mod emulator;
pub mod environment;
pub mod error;
pub mod observation;
pub mod reward;
pub mod state;

// Re-export core traits and types
pub use action::{Action, ActionSpace, DiscreteAction, DiscreteSpace, JoypadAction};
pub use emulator::{Emulator, MemorySource, Screen, SCREEN_HEIGHT, SCREEN_WIDTH};
pub use environment::{Environment, Episode, Step, StepInfo, TrackedEnvironment};
pub use error::{RLError, Result};
pub use observation::{Observation, ObservationSpace};
pub use reward::Reward;
pub use state::{State, StateSpace};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        Action, ActionSpace, DiscreteAction, Emulator, Environment, JoypadAction, MemorySource,
        Observation, ObservationSpace, Result, Reward, State, StateSpace, Step, StepInfo,
    };
}
