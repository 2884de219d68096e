use crate::link::LinkStatus;
use thiserror::Error;

/// Result type for link service operations.
pub type Result<T> = std::result::Result<T, LinkError>;

/// Result type for repository operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("short key already exists: {0}")]
    Conflict(String),
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("stored data is invalid: {0}")]
    InvalidData(String),
}

/// Malformed input or a business rule that refused the operation.
///
/// The caller may retry with corrected input.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("invalid short key: {0}")]
    InvalidShortKey(String),
    #[error("owner id must not be blank")]
    BlankOwner,
    #[error("max clicks must be greater than 0, got {0}")]
    InvalidMaxClicks(i64),
    #[error("invalid settings: {0}")]
    InvalidSettings(String),
    #[error("link expired by ttl")]
    ExpiredByTtl,
    #[error("link expired by clicks limit")]
    ExpiredByClicks,
    #[error("link is not active, status: {status}")]
    NotActive { status: LinkStatus },
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LinkError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("short link not found: {0}")]
    NotFound(String),
    #[error("access denied: only the owner may modify link {0}")]
    AccessDenied(String),
    #[error(
        "unable to generate a unique short key \
         (lengths {initial_length}..={max_length}, {attempts_per_length} attempts each)"
    )]
    KeyspaceExhausted {
        initial_length: usize,
        max_length: usize,
        attempts_per_length: u32,
    },
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Coarse classification of a [`LinkError`], for callers that map failures
/// onto exit codes or status lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    NotFound,
    AccessDenied,
    KeyspaceExhausted,
    Storage,
}

impl LinkError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LinkError::Validation(_) => ErrorKind::Validation,
            LinkError::NotFound(_) => ErrorKind::NotFound,
            LinkError::AccessDenied(_) => ErrorKind::AccessDenied,
            LinkError::KeyspaceExhausted { .. } => ErrorKind::KeyspaceExhausted,
            LinkError::Storage(_) => ErrorKind::Storage,
        }
    }

    /// Whether retrying with corrected input can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LinkError::Validation(_))
    }
}
