//! Core error types for bookend-core.
//!
//! This module defines the error hierarchy using thiserror. The taxonomy
//! follows the session model: configuration errors are fatal at session
//! start, store errors cover persistence, validation errors cover bad
//! sequence input. Transient persist failures during a run are *not*
//! errors at this level -- they surface on the event channel instead.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for bookend-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Persistence-related errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Persistence-specific errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to open the database
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// A stored record could not be decoded
    #[error("Corrupt record for {user_id}/{local_date}: {message}")]
    CorruptRecord {
        user_id: String,
        local_date: String,
        message: String,
    },

    /// Database is locked
    #[error("Database is locked")]
    Locked,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Validation errors raised by sequence steps.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Rating outside the 1-5 scale
    #[error("Rating '{field}' must be between 1 and 5, got {value}")]
    RatingOutOfRange { field: String, value: u8 },

    /// Habit acted on from a sequence that does not match its affinity
    #[error("Habit '{habit_id}' ({affinity}) is not eligible in the {slot} slot")]
    SlotMismatch {
        habit_id: String,
        affinity: String,
        slot: String,
    },

    /// Confirmation step advanced with unresolved habits
    #[error("{remaining} deferred habit(s) still unconfirmed")]
    UnresolvedConfirmations { remaining: usize },

    /// Store used before `load` resolved
    #[error("Daily record store has not been loaded")]
    StoreNotLoaded,

    /// Step payload does not match the current step
    #[error("Fragment {fragment} does not belong to step {step}")]
    FragmentMismatch { step: String, fragment: String },
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(err, _msg) => {
                if err.code == rusqlite::ErrorCode::DatabaseLocked {
                    StoreError::Locked
                } else {
                    StoreError::QueryFailed(err.to_string())
                }
            }
            _ => StoreError::QueryFailed(err.to_string()),
        }
    }
}

impl From<Box<dyn std::error::Error + Send + Sync>> for CoreError {
    fn from(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        CoreError::Custom(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
