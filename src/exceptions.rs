//! Error types for emote

use std::collections::TryReserveError;
use std::fmt;

/// Main error type for emote operations
#[derive(Debug)]
pub enum EmoteError {
    /// Missing handle, empty name, missing required field
    InvalidArgument(String),

    /// Handle, buffer or table entry could not be allocated
    Allocation(String),

    /// Name absent from the container or from a store
    AssetNotFound(String),

    /// Corrupt or empty asset container
    ContainerIntegrity(String),

    /// Malformed manifest or message payload
    Parse(String),

    /// Rendering engine refused initialization or an operation
    Engine(String),

    /// Event name outside the known vocabulary
    UnknownEvent(String),

    /// Session used after teardown
    NotInitialized,

    /// IO error
    IoError(std::io::Error),

    /// JSON parsing error
    JsonError(serde_json::Error),

    /// Generic error with message
    Generic(String),
}

impl fmt::Display for EmoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmoteError::InvalidArgument(msg) => write!(f, "Invalid argument: {msg}"),
            EmoteError::Allocation(msg) => write!(f, "Allocation failed: {msg}"),
            EmoteError::AssetNotFound(msg) => write!(f, "Asset not found: {msg}"),
            EmoteError::ContainerIntegrity(msg) => {
                write!(f, "Container integrity check failed: {msg}")
            }
            EmoteError::Parse(msg) => write!(f, "Parse error: {msg}"),
            EmoteError::Engine(msg) => write!(f, "Engine error: {msg}"),
            EmoteError::UnknownEvent(name) => write!(f, "Unknown event: {name}"),
            EmoteError::NotInitialized => write!(f, "Emote session is not initialized"),
            EmoteError::IoError(err) => write!(f, "IO error: {err}"),
            EmoteError::JsonError(err) => write!(f, "JSON error: {err}"),
            EmoteError::Generic(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for EmoteError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EmoteError::IoError(err) => Some(err),
            EmoteError::JsonError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for EmoteError {
    fn from(err: std::io::Error) -> Self {
        EmoteError::IoError(err)
    }
}

impl From<serde_json::Error> for EmoteError {
    fn from(err: serde_json::Error) -> Self {
        EmoteError::JsonError(err)
    }
}

impl From<TryReserveError> for EmoteError {
    fn from(err: TryReserveError) -> Self {
        EmoteError::Allocation(err.to_string())
    }
}

impl From<anyhow::Error> for EmoteError {
    fn from(err: anyhow::Error) -> Self {
        EmoteError::Generic(err.to_string())
    }
}

/// Result type for emote operations
pub type Result<T> = std::result::Result<T, EmoteError>;
