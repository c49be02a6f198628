//! Unified error types for `KeyTrack`.
//!
//! Read paths never surface these to callers - they degrade to fallback data.
//! Write paths always do, so callers know when persistence did not happen.

use thiserror::Error;

use crate::entities::key::KeyStatus;

/// Crate-wide error type.
#[derive(Debug, Error)]
pub enum Error {
    /// No remote store is configured; writes are rejected rather than
    /// silently accepted into memory.
    #[error("remote store is not configured; refusing to accept a write that would not persist")]
    NotConfigured,

    /// A remote operation failed for a reason other than a constraint breach.
    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// A uniqueness constraint was breached.
    #[error("{0}")]
    Constraint(ConstraintViolation),

    /// The acting user lacks the role required for this operation.
    #[error("not permitted to {action}")]
    Unauthorized {
        /// Short description of the attempted operation
        action: &'static str,
    },

    /// A logged-in user attempted to remove their own account.
    #[error("users cannot remove their own account")]
    SelfRemoval,

    /// A custody operation referenced a key that does not exist.
    #[error("key {id} not found")]
    KeyNotFound {
        /// Id the caller supplied
        id: String,
    },

    /// Checkout was attempted on a key that is not available.
    #[error("key is {status:?} and cannot be checked out")]
    KeyNotAvailable {
        /// Status the key was found in
        status: KeyStatus,
    },

    /// Return was attempted on a key that is not checked out.
    #[error("key is {status:?} and cannot be returned")]
    KeyNotCheckedOut {
        /// Status the key was found in
        status: KeyStatus,
    },

    /// A stored credential hash could not be parsed or verified.
    #[error("credential verification error: {message}")]
    Crypto {
        /// Underlying hashing-library error
        message: String,
    },

    /// The session file could not be serialized or parsed.
    #[error("session store error: {message}")]
    Session {
        /// Underlying serialization error
        message: String,
    },

    /// I/O error (session file handling).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Which unique field a rejected write collided on. Surfaced separately so
/// callers can show a specific message instead of a generic one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintViolation {
    /// A user with this email already exists.
    DuplicateEmail,
    /// A key with this property code already exists.
    DuplicatePropertyCode,
    /// A key with this scan code already exists.
    DuplicateScanCode,
}

impl std::fmt::Display for ConstraintViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateEmail => write!(f, "a user with this email already exists"),
            Self::DuplicatePropertyCode => {
                write!(f, "a key with this property code already exists")
            }
            Self::DuplicateScanCode => write!(f, "a key with this scan code already exists"),
        }
    }
}

// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
