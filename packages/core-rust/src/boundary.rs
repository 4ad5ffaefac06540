//! Error boundary: the single classification rule applied at both the inner
//! (`Chain::next`) and outer (`execute`) points.

use crate::error::{ChainError, DomainError, IntegrityError};

/// Message carried by every domain error that wraps an unexpected failure.
pub const UNEXPECTED_FAILURE_MESSAGE: &str = "interceptor chain execution failed";

/// Classify a failure so that only `Domain` or `Integrity` remains.
///
/// Domain and integrity errors pass through unchanged, including when they
/// arrive boxed inside an `anyhow::Error`, either bare or still wrapped in a
/// [`ChainError`] (as `?` produces in an `anyhow::Result` handler).
/// Everything else becomes a [`DomainError`] with
/// [`UNEXPECTED_FAILURE_MESSAGE`] and the original failure as its cause.
/// Idempotent.
#[must_use]
pub fn classify(err: ChainError) -> ChainError {
    match settle(err) {
        Ok(domain) => ChainError::Domain(domain),
        Err(integrity) => ChainError::Integrity(integrity),
    }
}

/// [`classify`] split by outcome: `Ok` holds the domain error to report,
/// `Err` the integrity violation that must not be reported as one.
///
/// # Errors
///
/// The [`IntegrityError`] carried by `err`, directly or boxed.
pub fn settle(err: ChainError) -> Result<DomainError, IntegrityError> {
    match err {
        ChainError::Domain(domain) => Ok(domain),
        ChainError::Integrity(integrity) => Err(integrity),
        ChainError::Unexpected(err) => {
            let err = match err.downcast::<ChainError>() {
                Ok(inner) => return settle(inner),
                Err(other) => other,
            };
            let err = match err.downcast::<DomainError>() {
                Ok(domain) => return Ok(domain),
                Err(other) => other,
            };
            match err.downcast::<IntegrityError>() {
                Ok(integrity) => Err(integrity),
                Err(other) => {
                    tracing::debug!(error = %other, "wrapping unexpected chain failure");
                    Ok(DomainError::with_cause(UNEXPECTED_FAILURE_MESSAGE, other))
                }
            }
        }
    }
}
