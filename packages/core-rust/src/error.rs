//! Failure taxonomy for chain runs.
//!
//! - [`DomainError`]: expected, user-facing failure. Crosses every boundary unchanged.
//! - [`IntegrityError`]: misuse of the chain handle. Fatal to the run.
//! - [`ChainError::Unexpected`]: anything else. Wrapped into a `DomainError`
//!   by [`classify`](crate::boundary::classify) before it leaves the core.

use std::error::Error as StdError;
use std::fmt;

use crate::chain::ChainState;

// ---------------------------------------------------------------------------
// DomainError
// ---------------------------------------------------------------------------

/// Structured, expected failure: a message plus an optional cause.
///
/// `Display` renders the message only; [`DomainError::describe`] appends the
/// cause description the way it is surfaced to clients.
#[derive(Debug)]
pub struct DomainError {
    message: String,
    cause: Option<anyhow::Error>,
}

impl DomainError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            cause: None,
        }
    }

    /// Create a domain error that retains the failure it was raised for.
    #[must_use]
    pub fn with_cause(message: impl Into<String>, cause: impl Into<anyhow::Error>) -> Self {
        Self {
            message: message.into(),
            cause: Some(cause.into()),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn cause(&self) -> Option<&anyhow::Error> {
        self.cause.as_ref()
    }

    /// Message followed by the cause description, if any.
    #[must_use]
    pub fn describe(&self) -> String {
        match &self.cause {
            Some(cause) => format!("{}: {cause}", self.message),
            None => self.message.clone(),
        }
    }
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl StdError for DomainError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.cause
            .as_deref()
            .map(|cause| cause as &(dyn StdError + 'static))
    }
}

// ---------------------------------------------------------------------------
// IntegrityError
// ---------------------------------------------------------------------------

/// Misuse of the chain handle detected by the executor.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntegrityError {
    #[error("continuation invoked after the chain reached {state:?}")]
    ContinuationAfterTerminal { state: ChainState },
    #[error("interceptor #{position} invoked its continuation more than once")]
    ContinuationReused { position: usize },
    #[error("target already invoked for this chain run")]
    TargetAlreadyInvoked,
}

// ---------------------------------------------------------------------------
// ChainError
// ---------------------------------------------------------------------------

/// Any failure raised by an interceptor, the target, or the executor.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("chain integrity violated: {0}")]
    Integrity(#[from] IntegrityError),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl ChainError {
    /// Shorthand for raising a cause-less domain error.
    #[must_use]
    pub fn domain(message: impl Into<String>) -> Self {
        Self::Domain(DomainError::new(message))
    }

    #[must_use]
    pub fn as_domain(&self) -> Option<&DomainError> {
        match self {
            Self::Domain(err) => Some(err),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_integrity(&self) -> bool {
        matches!(self, Self::Integrity(_))
    }
}
