//! Action representations and the joypad action space

use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::{RLError, Result};

/// Trait for actions in an RL environment
pub trait Action: Clone + Debug + Send + Sync {
    /// Convert action to a vector representation
    fn to_vec(&self) -> Vec<f64>;
}

/// Trait for defining action spaces
pub trait ActionSpace: Send + Sync {
    /// The type of actions in this space
    type Action: Action;

    /// Sample a random action from the space
    fn sample(&self) -> Self::Action;

    /// Check if an action is valid within this space
    fn contains(&self, action: &Self::Action) -> bool;

    /// Get the dimensionality of the action space
    fn dim(&self) -> Option<usize>;
}

/// Discrete action, as emitted by the policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DiscreteAction(pub usize);

impl Action for DiscreteAction {
    #[allow(clippy::cast_precision_loss)]
    fn to_vec(&self) -> Vec<f64> {
        vec![self.0 as f64]
    }
}

/// Discrete action space
#[derive(Debug, Clone)]
pub struct DiscreteSpace {
    /// Number of discrete actions
    pub n: usize,
}

impl DiscreteSpace {
    /// Create a new discrete action space
    #[must_use]
    pub fn new(n: usize) -> Self {
        Self { n }
    }

    /// The eight-button joypad space
    #[must_use]
    pub fn joypad() -> Self {
        Self::new(JoypadAction::ALL.len())
    }
}

impl ActionSpace for DiscreteSpace {
    type Action = DiscreteAction;

    fn sample(&self) -> Self::Action {
        use rand::Rng;
        let mut rng = rand::thread_rng();
        DiscreteAction(rng.gen_range(0..self.n))
    }

    fn contains(&self, action: &Self::Action) -> bool {
        action.0 < self.n
    }

    fn dim(&self) -> Option<usize> {
        Some(1)
    }
}

/// A single joypad input held for one environment step.
///
/// Index order matches the policy's discrete outputs: 0 presses nothing,
/// 1..=3 are the A, B and START buttons, 4..=7 are the arrows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JoypadAction {
    /// No button
    Noop,
    /// A button
    A,
    /// B button
    B,
    /// START button
    Start,
    /// Arrow up
    Up,
    /// Arrow down
    Down,
    /// Arrow left
    Left,
    /// Arrow right
    Right,
}

impl JoypadAction {
    /// All actions in index order
    pub const ALL: [JoypadAction; 8] = [
        JoypadAction::Noop,
        JoypadAction::A,
        JoypadAction::B,
        JoypadAction::Start,
        JoypadAction::Up,
        JoypadAction::Down,
        JoypadAction::Left,
        JoypadAction::Right,
    ];

    /// Index of this action in the discrete space
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Whether pressing this action sends any input at all
    #[must_use]
    pub fn is_press(self) -> bool {
        self != JoypadAction::Noop
    }
}

impl TryFrom<DiscreteAction> for JoypadAction {
    type Error = RLError;

    fn try_from(action: DiscreteAction) -> Result<Self> {
        JoypadAction::ALL
            .get(action.0)
            .copied()
            .ok_or_else(|| RLError::InvalidAction(format!("joypad index {} out of range 0..8", action.0)))
    }
}

impl From<JoypadAction> for DiscreteAction {
    fn from(action: JoypadAction) -> Self {
        DiscreteAction(action.index())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_joypad_indices_round_trip() {
        for (i, action) in JoypadAction::ALL.iter().enumerate() {
            assert_eq!(action.index(), i);
            assert_eq!(JoypadAction::try_from(DiscreteAction(i)).unwrap(), *action);
        }
    }

    #[test]
    fn test_out_of_range_action_is_rejected() {
        let err = JoypadAction::try_from(DiscreteAction(8)).unwrap_err();
        assert!(matches!(err, RLError::InvalidAction(_)));
    }

    #[test]
    fn test_joypad_space_samples_valid_actions() {
        let space = DiscreteSpace::joypad();
        for _ in 0..32 {
            let action = space.sample();
            assert!(space.contains(&action));
        }
        assert!(!space.contains(&DiscreteAction(8)));
    }
}
