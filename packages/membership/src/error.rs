//! Typed errors for the membership engine.
//!
//! Directory failures are a closed set of kinds. Every `DirectoryError`
//! variant maps to exactly one [`DirectoryErrorKind`] and callers branch on
//! `kind()`, never on the variant.

use std::fmt;

use thiserror::Error;

/// Discriminator for directory failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectoryErrorKind {
    /// The primary identifier (or group membership) is already taken.
    AlreadyExists,
    /// The target account does not exist.
    NotFound,
    /// The account was just created and is not ready for mutation yet.
    CreationPending,
    /// The configured organizational scope is not valid.
    ScopeInvalid,
    /// Anything else.
    Unclassified,
}

impl fmt::Display for DirectoryErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DirectoryErrorKind::AlreadyExists => write!(f, "already_exists"),
            DirectoryErrorKind::NotFound => write!(f, "not_found"),
            DirectoryErrorKind::CreationPending => write!(f, "creation_pending"),
            DirectoryErrorKind::ScopeInvalid => write!(f, "scope_invalid"),
            DirectoryErrorKind::Unclassified => write!(f, "unclassified"),
        }
    }
}

/// Errors raised by a [`Directory`](crate::traits::directory::Directory).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DirectoryError {
    /// The primary identifier, or the group membership, is already taken.
    #[error("account already exists: {identifier}")]
    AlreadyExists { identifier: String },

    /// The target account does not exist. Backends may leave `identifier`
    /// blank; see [`DirectoryError::with_identifier`].
    #[error("account not found: {identifier}")]
    NotFound { identifier: String },

    /// Freshly created account not ready yet; retry unchanged.
    #[error("account creation still pending: {identifier}")]
    CreationPending { identifier: String },

    /// The organizational scope does not exist. `scope` may be empty until
    /// the caller annotates it with [`DirectoryError::with_scope`].
    #[error("invalid organizational scope: {scope:?}")]
    ScopeInvalid { scope: String },

    /// Create rejected for a reason other than an identifier collision.
    #[error("could not create {identifier}: {message}")]
    Conflict { identifier: String, message: String },

    /// Backend failure with no more specific kind.
    #[error("directory service error: {message}")]
    Service { message: String },

    /// A bounded retry loop gave up.
    #[error("gave up after {attempts} attempts on {kind}: {last}")]
    RetriesExhausted {
        kind: DirectoryErrorKind,
        attempts: u32,
        last: Box<DirectoryError>,
    },
}

impl DirectoryError {
    pub fn kind(&self) -> DirectoryErrorKind {
        match self {
            DirectoryError::AlreadyExists { .. } => DirectoryErrorKind::AlreadyExists,
            DirectoryError::NotFound { .. } => DirectoryErrorKind::NotFound,
            DirectoryError::CreationPending { .. } => DirectoryErrorKind::CreationPending,
            DirectoryError::ScopeInvalid { .. } => DirectoryErrorKind::ScopeInvalid,
            DirectoryError::Conflict { .. }
            | DirectoryError::Service { .. }
            | DirectoryError::RetriesExhausted { .. } => DirectoryErrorKind::Unclassified,
        }
    }

    /// Transient errors are worth retrying unchanged.
    pub fn is_transient(&self) -> bool {
        self.kind() == DirectoryErrorKind::CreationPending
    }

    /// Annotate a `ScopeInvalid` error with the offending scope value.
    ///
    /// Every other error is returned verbatim.
    pub fn with_scope(self, scope: impl Into<String>) -> Self {
        match self {
            DirectoryError::ScopeInvalid { .. } => DirectoryError::ScopeInvalid {
                scope: scope.into(),
            },
            other => other,
        }
    }

    /// Fill in the identifier of a `NotFound` error raised without one.
    pub fn with_identifier(self, identifier: impl Into<String>) -> Self {
        match self {
            DirectoryError::NotFound { identifier: missing } if missing.is_empty() => {
                DirectoryError::NotFound {
                    identifier: identifier.into(),
                }
            }
            other => other,
        }
    }

    // Convenience constructors

    pub fn already_exists(identifier: impl Into<String>) -> Self {
        DirectoryError::AlreadyExists {
            identifier: identifier.into(),
        }
    }

    pub fn not_found(identifier: impl Into<String>) -> Self {
        DirectoryError::NotFound {
            identifier: identifier.into(),
        }
    }

    pub fn creation_pending(identifier: impl Into<String>) -> Self {
        DirectoryError::CreationPending {
            identifier: identifier.into(),
        }
    }

    pub fn scope_invalid(scope: impl Into<String>) -> Self {
        DirectoryError::ScopeInvalid {
            scope: scope.into(),
        }
    }

    pub fn conflict(identifier: impl Into<String>, message: impl Into<String>) -> Self {
        DirectoryError::Conflict {
            identifier: identifier.into(),
            message: message.into(),
        }
    }

    pub fn service(message: impl Into<String>) -> Self {
        DirectoryError::Service {
            message: message.into(),
        }
    }
}

/// Batch-level failures. Per-entry failures never surface here; they are
/// reported through the notifier instead.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Loading the current account set failed, so no entry was processed.
    #[error("failed to list accounts: {0}")]
    Listing(#[source] DirectoryError),
}

/// Result type alias for directory operations.
pub type DirectoryResult<T> = std::result::Result<T, DirectoryError>;

/// Result type alias for batch operations.
pub type Result<T> = std::result::Result<T, ReconcileError>;
