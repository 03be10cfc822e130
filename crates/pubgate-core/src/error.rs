//! Unified application error types for PubGate.
//!
//! All crates map their internal errors into [`AppError`] for consistent
//! propagation through the ? operator.

use std::fmt;
use thiserror::Error;

/// Top-level error kind categorization used across the entire application.
///
/// The intake and workflow failure modes are first-class kinds so that
/// callers can match on the kind instead of parsing message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// The requested resource was not found.
    NotFound,
    /// Input validation failed.
    Validation,
    /// A conflict occurred (duplicate entry, concurrent modification, etc.).
    Conflict,
    /// A re-upload was attempted for a file whose bytes are already committed.
    FileAlreadyExists,
    /// A file already physically exists at the canonical storage path.
    PathConflict,
    /// The computed content digest does not match the declared digest.
    IntegrityMismatch,
    /// An illegal publish-request state transition was attempted.
    InvalidStateTransition,
    /// A linked report's file is not a member of the target snapshot.
    ReportSnapshotMismatch,
    /// The files given for a snapshot span more than one workspace.
    AmbiguousWorkspace,
    /// More than one existing snapshot matches the same file set.
    DuplicateSnapshot,
    /// A storage I/O error occurred.
    Storage,
    /// A database error occurred.
    Database,
    /// A configuration error occurred.
    Configuration,
    /// A serialization/deserialization error occurred.
    Serialization,
    /// An internal invariant was violated.
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::Validation => write!(f, "VALIDATION"),
            Self::Conflict => write!(f, "CONFLICT"),
            Self::FileAlreadyExists => write!(f, "FILE_ALREADY_EXISTS"),
            Self::PathConflict => write!(f, "PATH_CONFLICT"),
            Self::IntegrityMismatch => write!(f, "INTEGRITY_MISMATCH"),
            Self::InvalidStateTransition => write!(f, "INVALID_STATE_TRANSITION"),
            Self::ReportSnapshotMismatch => write!(f, "REPORT_SNAPSHOT_MISMATCH"),
            Self::AmbiguousWorkspace => write!(f, "AMBIGUOUS_WORKSPACE"),
            Self::DuplicateSnapshot => write!(f, "DUPLICATE_SNAPSHOT"),
            Self::Storage => write!(f, "STORAGE"),
            Self::Database => write!(f, "DATABASE"),
            Self::Configuration => write!(f, "CONFIGURATION"),
            Self::Serialization => write!(f, "SERIALIZATION"),
            Self::Internal => write!(f, "INTERNAL"),
        }
    }
}

/// The unified application error used throughout PubGate.
///
/// All crate-specific errors are mapped into `AppError` using `From` impls
/// or explicit `.map_err()` calls. This provides a single error type for
/// the entire application boundary.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    /// The category of error.
    pub kind: ErrorKind,
    /// A human-readable error message.
    pub message: String,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new application error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Create a new application error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Create a conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    /// Create a file-already-exists error.
    pub fn file_already_exists(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::FileAlreadyExists, message)
    }

    /// Create a path-conflict error.
    pub fn path_conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PathConflict, message)
    }

    /// Create an integrity-mismatch error.
    pub fn integrity_mismatch(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::IntegrityMismatch, message)
    }

    /// Create an invalid-state-transition error.
    pub fn invalid_state_transition(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidStateTransition, message)
    }

    /// Create a report/snapshot-mismatch error.
    pub fn report_snapshot_mismatch(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ReportSnapshotMismatch, message)
    }

    /// Create an ambiguous-workspace error.
    pub fn ambiguous_workspace(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AmbiguousWorkspace, message)
    }

    /// Create a duplicate-snapshot error.
    pub fn duplicate_snapshot(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DuplicateSnapshot, message)
    }

    /// Create a storage error.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Storage, message)
    }

    /// Create a database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Database, message)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            source: None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Serialization,
            format!("JSON serialization error: {err}"),
            err,
        )
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(ErrorKind::Storage, format!("I/O error: {err}"), err)
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}
