//! Error types for mirror operations

use crate::{StoreKey, StoreKind};
use thiserror::Error;

/// Errors reported by a single backing store.
///
/// The existence variants (`NotFound`, `AlreadyExists`, `NotStored`,
/// `VersionConflict`) describe per-key state and are absorbed into an
/// [`crate::Outcome`] by the mirror where the operation allows it.
/// `Unavailable` and `Rejected` always reach the caller.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Key not found: {key}")]
    NotFound { key: StoreKey },

    #[error("Key already exists: {key}")]
    AlreadyExists { key: StoreKey },

    #[error("Value not stored for {key}")]
    NotStored { key: StoreKey },

    #[error("Version conflict on {key}")]
    VersionConflict { key: StoreKey },

    #[error("Operation rejected for {key}: {reason}")]
    Rejected { key: StoreKey, reason: String },

    #[error("{store} store unavailable: {reason}")]
    Unavailable { store: StoreKind, reason: String },
}

impl StoreError {
    pub fn not_found(key: &StoreKey) -> Self {
        StoreError::NotFound { key: key.clone() }
    }

    pub fn unavailable(store: StoreKind, reason: impl Into<String>) -> Self {
        StoreError::Unavailable {
            store,
            reason: reason.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::Unavailable { .. })
    }

    /// The key the error refers to, if it is a per-key error.
    pub fn key(&self) -> Option<&StoreKey> {
        match self {
            StoreError::NotFound { key }
            | StoreError::AlreadyExists { key }
            | StoreError::NotStored { key }
            | StoreError::VersionConflict { key }
            | StoreError::Rejected { key, .. } => Some(key),
            StoreError::Unavailable { .. } => None,
        }
    }
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for mirror operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MirrorError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Codec error: {reason}")]
    Codec { reason: String },
}

impl From<serde_json::Error> for MirrorError {
    fn from(err: serde_json::Error) -> Self {
        MirrorError::Codec {
            reason: err.to_string(),
        }
    }
}

/// Result type alias for a single store call.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type alias for mirror operations.
pub type MirrorResult<T> = Result<T, MirrorError>;

// =============================================================================
// TESTS
// =============================================================================
