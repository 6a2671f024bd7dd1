//! Error types for enriched declarators.

use serde_json::Value;
use thiserror::Error;

/// Errors raised while navigating an enriched declarator or registering a
/// property test.
#[derive(Debug, Error)]
pub enum PropError {
    /// The declarator has no capability of the requested kind under this name.
    #[error("no {kind} named {name:?}")]
    MissingCapability {
        /// Requested name.
        name: String,
        /// Requested kind (`test`, `conditional`, `table` or `prop`).
        kind: &'static str,
    },

    /// A record-mode example is not an object.
    #[error("record example must be an object, got {0}")]
    MalformedExample(Value),
}

impl PropError {
    pub(crate) fn missing(name: &str, kind: &'static str) -> Self {
        Self::MissingCapability {
            name: name.to_string(),
            kind,
        }
    }
}

/// Result type alias for enriched declarators.
pub type Result<T> = std::result::Result<T, PropError>;
