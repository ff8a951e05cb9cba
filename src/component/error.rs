//! Component error types
//!
//! Errors raised while registering, loading or cleaning up components.

use thiserror::Error;

/// Component lifecycle error type
#[derive(Debug, Error)]
pub enum ComponentError {
    /// No registration exists for the name
    #[error("Component not registered: {0}")]
    NotRegistered(String),

    /// A registration already exists for the name
    #[error("Component already registered: {0}")]
    AlreadyRegistered(String),

    /// The loader returned an error
    #[error("Failed to load component {name}: {reason}")]
    LoadFailed { name: String, reason: String },

    /// The loader did not finish within the configured timeout
    #[error("Loading component {name} timed out after {secs} seconds")]
    Timeout { name: String, secs: u64 },

    /// The loaded instance is not of the requested concrete type
    #[error("Component {name} is not a {expected}")]
    TypeMismatch { name: String, expected: &'static str },

    /// Cleanup of an instance failed
    #[error("Cleanup failed: {0}")]
    CleanupFailed(String),

    /// Operation on a component that has already been cleaned up
    #[error("Component {0} has been closed")]
    Closed(String),

    /// Invalid component configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ComponentError {
    /// Wrap any displayable loader failure
    pub fn load_failed(name: &str, reason: impl std::fmt::Display) -> Self {
        ComponentError::LoadFailed {
            name: name.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Whether the error came out of a loader (as opposed to a lookup)
    pub fn is_load_failure(&self) -> bool {
        matches!(
            self,
            ComponentError::LoadFailed { .. } | ComponentError::Timeout { .. }
        )
    }
}

/// Result type alias for component operations
pub type Result<T> = std::result::Result<T, ComponentError>;
