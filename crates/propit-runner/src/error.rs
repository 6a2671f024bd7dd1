//! Error types for the test runner.

use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

/// Why a single test did not pass.
#[derive(Debug, Clone, Error)]
pub enum TestFailure {
    /// The body reported a failed assertion.
    #[error("{message}")]
    Assertion {
        /// Human readable failure.
        message: String,
        /// Structured data attached to the failure, such as a counterexample.
        detail: Option<Value>,
    },

    /// The body panicked.
    #[error("test panicked: {0}")]
    Panic(String),

    /// The body did not finish within its time budget.
    #[error("test timed out after {0:?}")]
    Timeout(Duration),

    /// A test registered as failing passed.
    #[error("test is marked as failing but passed")]
    UnexpectedPass,
}

impl TestFailure {
    /// A failed assertion without structured detail.
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::Assertion {
            message: message.into(),
            detail: None,
        }
    }

    /// A failed assertion carrying structured detail.
    pub fn with_detail(message: impl Into<String>, detail: Value) -> Self {
        Self::Assertion {
            message: message.into(),
            detail: Some(detail),
        }
    }

    /// Structured detail, if any.
    pub fn detail(&self) -> Option<&Value> {
        match self {
            Self::Assertion { detail, .. } => detail.as_ref(),
            _ => None,
        }
    }
}

/// Errors raised by the runner itself.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// The async runtime could not be started.
    #[error("failed to start runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

/// Result type alias for runner operations.
pub type Result<T> = std::result::Result<T, RunnerError>;
