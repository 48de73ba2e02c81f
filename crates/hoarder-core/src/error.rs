//! Error types for hoarder-core

use thiserror::Error;

use crate::codec::FormatError;

/// Errors that can occur when loading or resolving configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to deserialize configuration.
    #[error("invalid configuration: {0}")]
    Deserialize(#[from] Box<figment::Error>),

    /// A required setting has no value after all fallbacks.
    #[error("missing {key}: {hint}")]
    Missing {
        /// Configuration key.
        key: &'static str,
        /// Where a value could come from.
        hint: &'static str,
    },

    /// A setting has a value that cannot be used.
    #[error("invalid value {value:?} for {key}")]
    Invalid {
        /// Configuration key.
        key: &'static str,
        /// The rejected value.
        value: String,
    },

    /// The history format is not one we can read and write.
    #[error(transparent)]
    Format(#[from] FormatError),
}

/// Result type alias using [`ConfigError`].
pub type ConfigResult<T> = Result<T, ConfigError>;
