//! State representations and state spaces

use std::fmt::Debug;

/// Trait for states in an RL environment
pub trait State: Clone + Debug + Send + Sync {
    /// Get a feature representation of the state
    fn features(&self) -> Vec<f64>;

    /// Check if this is a terminal state
    fn is_terminal(&self) -> bool {
        false
    }
}

/// Trait for defining state spaces
pub trait StateSpace: Send + Sync {
    /// The type of states in this space
    type State: State;

    /// Sample a random state from the space
    fn sample(&self) -> Self::State;

    /// Check if a state is valid within this space
    fn contains(&self, state: &Self::State) -> bool;

    /// Get the dimensionality of the state space
    fn dim(&self) -> Option<usize>;
}
