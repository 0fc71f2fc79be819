//! Error types for plan and configuration loading

use std::path::PathBuf;

use thiserror::Error;

use goldrl_core::RLError;

/// A plan file could not be loaded
#[derive(Error, Debug)]
pub enum PlanError {
    /// Reading or writing the plan file failed
    #[error("failed to access plan {path}: {source}")]
    Io {
        /// Plan file path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The plan is not valid JSON of the expected shape
    #[error("malformed plan: {0}")]
    Parse(#[from] serde_json::Error),

    /// A task condition names a flag missing from the registry
    #[error("task {task:?} refers to unknown event flag {flag:?}")]
    UnknownFlag {
        /// Task description
        task: String,
        /// Offending flag name
        flag: String,
    },
}

/// A configuration file could not be loaded
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Reading or writing the configuration file failed
    #[error("failed to access config {path}: {source}")]
    Io {
        /// Config file path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML for [`crate::GoldConfig`]
    #[error("malformed config: {0}")]
    Parse(#[from] toml::de::Error),

    /// The configuration could not be rendered as TOML
    #[error("failed to render config: {0}")]
    Render(#[from] toml::ser::Error),

    /// A value is out of its allowed range
    #[error("invalid config value for {field}: {reason}")]
    Invalid {
        /// Field name
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },
}

impl From<PlanError> for RLError {
    fn from(err: PlanError) -> Self {
        RLError::Plan(err.to_string())
    }
}

impl From<ConfigError> for RLError {
    fn from(err: ConfigError) -> Self {
        RLError::Environment(err.to_string())
    }
}
