use std::sync::PoisonError;
use thiserror::Error;

/// Problems with the run configuration. Always raised before any virtual user starts.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("No stages configured")]
    NoStages,

    #[error("Stage {index} has a negative duration ({value})")]
    NegativeDuration { index: usize, value: String },

    #[error("Stage {index} has an invalid duration {value:?}: {reason}")]
    InvalidDuration {
        index: usize,
        value: String,
        reason: String,
    },

    #[error("Stage {index} has a negative target ({target})")]
    NegativeTarget { index: usize, target: i64 },

    #[error("Stage {index} target {target} exceeds the maximum of {max} virtual users")]
    TargetTooLarge { index: usize, target: i64, max: usize },

    #[error("Stage {index} pushes the total ramp duration past the representable maximum")]
    DurationOverflow { index: usize },

    #[error("No base URL configured")]
    MissingBaseUrl,

    #[error("Invalid base URL {value:?}: {reason}")]
    InvalidBaseUrl { value: String, reason: String },

    #[error("Tick interval must be greater than zero")]
    ZeroTick,
}

/// Internal scheduling failures. These abort the run.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("No Tokio runtime available to spawn virtual users on")]
    NoRuntime,

    #[error("Virtual user {id} panicked outside of its workload")]
    WorkerPanicked { id: u64 },

    #[error("Mutex is poisoned.")]
    PoisonData,
}

impl<T> From<PoisonError<T>> for EngineError {
    fn from(_err: PoisonError<T>) -> Self {
        Self::PoisonData
    }
}

/// Anything that stops a run from producing a [`crate::Summary`].
///
/// Request failures are never represented here; they are data in the summary.
#[derive(Debug, Error)]
pub enum RampError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Engine fault: {0}")]
    Engine(#[from] EngineError),
}

impl RampError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            RampError::Config(_) => 2,
            RampError::Engine(_) => 1,
        }
    }
}
