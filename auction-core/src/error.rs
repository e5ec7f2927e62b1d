//! Error taxonomy and its mapping to RPC-style status codes, per the
//! specification.

use std::fmt;

/// The six internal error kinds every component in this crate classifies its
/// failures into. Carries no stack traces across trust boundaries, only a
/// human-readable message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed input, unparseable config, script compile/runtime error,
    /// promise rejection.
    InvalidArgument,
    /// Unknown function URI, missing config file, missing scorer for an
    /// auction.
    NotFound,
    /// Remote script server rejected the fetch (401/403).
    PermissionDenied,
    /// A configured script failed to compile at the last refresh.
    Unavailable,
    /// Script output shape mismatch; sandbox protocol misuse.
    FailedPrecondition,
    /// Unexpected VM or IPC failure, fetch transport failure.
    Internal,
}

/// The RPC-style status code each [`ErrorKind`] maps to. The RPC shell itself
/// is out of scope; this exists so that whichever shell is eventually bound
/// on top has a one-to-one, already-decided mapping rather than reinventing
/// it per caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    /// `INVALID_ARGUMENT`
    InvalidArgument,
    /// `NOT_FOUND`
    NotFound,
    /// `PERMISSION_DENIED`
    PermissionDenied,
    /// `UNAVAILABLE`
    Unavailable,
    /// `FAILED_PRECONDITION`
    FailedPrecondition,
    /// `INTERNAL`
    Internal,
}

impl ErrorKind {
    /// The status code this kind maps to, one-to-one.
    pub fn status_code(self) -> StatusCode {
        match self {
            Self::InvalidArgument => StatusCode::InvalidArgument,
            Self::NotFound => StatusCode::NotFound,
            Self::PermissionDenied => StatusCode::PermissionDenied,
            Self::Unavailable => StatusCode::Unavailable,
            Self::FailedPrecondition => StatusCode::FailedPrecondition,
            Self::Internal => StatusCode::Internal,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::InvalidArgument => "invalid-argument",
            Self::NotFound => "not-found",
            Self::PermissionDenied => "permission-denied",
            Self::Unavailable => "unavailable",
            Self::FailedPrecondition => "failed-precondition",
            Self::Internal => "internal",
        };
        f.write_str(s)
    }
}

/// A classified failure: an [`ErrorKind`] plus a human-readable message and,
/// optionally, the underlying cause.
#[derive(Debug, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct AuctionError {
    kind: ErrorKind,
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl AuctionError {
    /// Build an error of the given kind with a message.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Attach an underlying cause to this error.
    pub fn with_source(
        mut self,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Shorthand for `AuctionError::new(ErrorKind::InvalidArgument, ..)`.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument, message)
    }

    /// Shorthand for `AuctionError::new(ErrorKind::NotFound, ..)`.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Shorthand for `AuctionError::new(ErrorKind::PermissionDenied, ..)`.
    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PermissionDenied, message)
    }

    /// Shorthand for `AuctionError::new(ErrorKind::Unavailable, ..)`.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unavailable, message)
    }

    /// Shorthand for `AuctionError::new(ErrorKind::FailedPrecondition, ..)`.
    pub fn failed_precondition(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::FailedPrecondition, message)
    }

    /// Shorthand for `AuctionError::new(ErrorKind::Internal, ..)`.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// The classified kind of this error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The RPC-style status code this error maps to.
    pub fn status_code(&self) -> StatusCode {
        self.kind.status_code()
    }

    /// The human-readable message, without the kind prefix.
    pub fn message(&self) -> &str {
        &self.message
    }
}
