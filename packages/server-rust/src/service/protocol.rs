//! Conversion of escaping chain failures into client-facing protocol errors.

use intercept_core::{DomainError, PathSegment, SourceLocation};
use serde::Serialize;

/// Error object returned to clients: message, response path, and source locations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProtocolError {
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<PathSegment>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<SourceLocation>,
}

impl ProtocolError {
    /// Build from a domain error at the given field path and location.
    ///
    /// The message is the domain message followed by its cause, if any.
    #[must_use]
    pub fn from_domain(
        err: &DomainError,
        path: &[PathSegment],
        location: Option<SourceLocation>,
    ) -> Self {
        Self {
            message: err.describe(),
            path: path.to_vec(),
            locations: location.into_iter().collect(),
        }
    }
}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)?;
        if !self.path.is_empty() {
            let path: Vec<String> = self.path.iter().map(ToString::to_string).collect();
            write!(f, " (at {})", path.join("."))?;
        }
        Ok(())
    }
}
