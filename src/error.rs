//! Failure classification shared by the reconcilers.
//!
//! Every failure carries an [`ErrorKind`] that decides what the controller
//! does with it. The kind is checked once, at the reconcile entry point.

use std::fmt;

use thiserror::Error;

use crate::ownership::OwnershipError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Transient; requeue after a fixed delay.
    Temporary,
    /// Needs a human or an upstream change; surfaced without requeue.
    Permanent,
    /// Nothing to do for this object; finish successfully.
    Ignorable,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ErrorKind::Temporary => "temporary failure",
            ErrorKind::Permanent => "permanent failure",
            ErrorKind::Ignorable => "ignored",
        })
    }
}

/// What went wrong, independent of how it is handled.
#[derive(Debug, Error)]
pub enum Cause {
    #[error("kubernetes api error: {0}")]
    Kube(#[from] kube::Error),

    #[error(transparent)]
    Ownership(#[from] OwnershipError),

    #[error("failed to build connection url: {0}")]
    Url(#[from] url::ParseError),

    #[error("{0}")]
    Message(String),
}

#[derive(Debug, Error)]
#[error("{kind}: {source}")]
pub struct Error {
    kind: ErrorKind,
    source: Cause,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub fn new(kind: ErrorKind, cause: impl Into<Cause>) -> Self {
        Self {
            kind,
            source: cause.into(),
        }
    }

    pub fn temporary(cause: impl Into<Cause>) -> Self {
        Self::new(ErrorKind::Temporary, cause)
    }

    pub fn permanent(cause: impl Into<Cause>) -> Self {
        Self::new(ErrorKind::Permanent, cause)
    }

    pub fn ignorable(cause: impl Into<Cause>) -> Self {
        Self::new(ErrorKind::Ignorable, cause)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn cause(&self) -> &Cause {
        &self.source
    }
}

impl From<String> for Cause {
    fn from(message: String) -> Self {
        Cause::Message(message)
    }
}

impl From<&str> for Cause {
    fn from(message: &str) -> Self {
        Cause::Message(message.to_owned())
    }
}

/// Ownership conflicts are never retried.
impl From<OwnershipError> for Error {
    fn from(err: OwnershipError) -> Self {
        Error::permanent(err)
    }
}
