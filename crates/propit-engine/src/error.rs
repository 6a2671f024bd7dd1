//! Error types for the generation engine.

use serde_json::Value;
use thiserror::Error;

/// Errors raised while building arbitraries or loading configuration.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A string pattern could not be compiled into a generator.
    #[error("invalid pattern {pattern:?}: {message}")]
    InvalidPattern {
        /// The rejected pattern.
        pattern: String,
        /// Why it was rejected.
        message: String,
    },

    /// `one_of` was given nothing to choose from.
    #[error("one_of requires at least one arbitrary")]
    EmptyChoice,

    /// Unknown configuration profile name.
    #[error("unknown profile: {0}")]
    UnknownProfile(String),

    /// An environment variable held an unusable value.
    #[error("invalid value for {var}: {message}")]
    InvalidEnv {
        /// Variable name.
        var: String,
        /// What was wrong with it.
        message: String,
    },

    /// I/O error while reading a configuration file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed YAML configuration.
    #[error("invalid configuration file: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Terminal failure of a property run.
#[derive(Debug, Error)]
pub enum PropertyFailure {
    /// The predicate was falsified; carries the shrunk input.
    #[error(
        "Property failed after {num_runs} tests\n{{ seed: {seed}, path: \"{path}\" }}\nCounterexample: {counterexample}\nShrunk {num_shrinks} time(s)\nGot error: {message}"
    )]
    Counterexample {
        /// Minimal failing input, as seen by the predicate.
        counterexample: Value,
        /// Seed of the run.
        seed: u64,
        /// Path to the counterexample in the execution summary.
        path: String,
        /// Number of samples evaluated before the failure.
        num_runs: u32,
        /// Number of successful shrink steps.
        num_shrinks: u32,
        /// Message of the last failure.
        message: String,
    },

    /// The run hit its time limit and interruptions count as failures.
    #[error("Property interrupted after {num_runs} tests\n{{ seed: {seed} }}")]
    Interrupted {
        /// Samples evaluated before the interruption.
        num_runs: u32,
        /// Seed of the run.
        seed: u64,
    },

    /// Malformed run parameters, such as an example of the wrong arity.
    #[error("invalid run configuration: {0}")]
    Configuration(String),

    /// A generator failed to produce a value.
    #[error("unable to generate a value: {0}")]
    Generation(String),

    /// A caller supplied reporter rejected the run.
    #[error("{0}")]
    Reporter(String),
}

impl PropertyFailure {
    /// The shrunk counterexample, when the failure has one.
    pub fn counterexample(&self) -> Option<&Value> {
        match self {
            Self::Counterexample { counterexample, .. } => Some(counterexample),
            _ => None,
        }
    }
}

/// Result type alias for engine construction.
pub type EngineResult<T> = std::result::Result<T, EngineError>;
