//! Metadata guard: rejects requests that lack a required metadata entry.

use intercept_core::{Chain, ChainError, DomainError, Flow, Interceptor, Principal, RequestContext};
use serde_json::Value;

/// Rejects with a domain error when `key` is missing or blank in the request
/// metadata. For the `authorization` header, a present bearer token also
/// establishes the request principal.
#[derive(Debug, Clone)]
pub struct RequireMetadata {
    key: String,
    message: String,
}

impl RequireMetadata {
    #[must_use]
    pub fn new(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            key: key.into().to_ascii_lowercase(),
            message: message.into(),
        }
    }

    /// Guard on the `authorization` header, failing with `unauthenticated`.
    #[must_use]
    pub fn authorization() -> Self {
        Self::new("authorization", "unauthenticated")
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Interceptor for RequireMetadata {
    fn apply(
        &self,
        mut ctx: RequestContext,
        chain: &mut Chain<'_, RequestContext, Value>,
    ) -> Result<Flow<Value>, ChainError> {
        let Some(value) = ctx.metadata(&self.key).map(str::trim).filter(|v| !v.is_empty()) else {
            tracing::debug!(handler = %ctx.handler, key = %self.key, "required metadata missing");
            return Err(DomainError::new(self.message.clone()).into());
        };

        if self.key == "authorization" && ctx.principal.is_none() {
            if let Some(token) = value.strip_prefix("Bearer ") {
                ctx.principal = Some(Principal {
                    id: token.trim().to_string(),
                    roles: Vec::new(),
                });
            }
        }
        Ok(chain.next(ctx)?.into())
    }

    fn name(&self) -> &'static str {
        "require_metadata"
    }
}
