//! Invocation counter interceptor.
//!
//! Counts how many runs reached this interceptor across the life of the
//! process. The count is interceptor-owned state shared by every chain that
//! resolves the same instance, so it uses an atomic rather than chain state.

use std::sync::atomic::{AtomicU64, Ordering};

use intercept_core::{Chain, ChainError, Flow, Interceptor, RequestContext};
use serde_json::Value;

/// Increments a shared counter on every run, then continues the chain.
#[derive(Debug, Default)]
pub struct InvocationCounter {
    count: AtomicU64,
}

impl InvocationCounter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of runs that have entered this interceptor.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}

impl Interceptor for InvocationCounter {
    fn apply(
        &self,
        ctx: RequestContext,
        chain: &mut Chain<'_, RequestContext, Value>,
    ) -> Result<Flow<Value>, ChainError> {
        let seen = self.count.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::debug!(handler = %ctx.handler, count = seen, "invocation counted");
        Ok(chain.next(ctx)?.into())
    }

    fn name(&self) -> &'static str {
        "counter"
    }
}
