//! Logging interceptor.
//!
//! Emits a `tracing` event before handing the context downstream and another
//! once the rest of the chain has finished, with the elapsed time and outcome.

use std::time::Instant;

use intercept_core::{Chain, ChainError, Flow, Interceptor, RequestContext};
use serde_json::Value;

/// Logs entry to and exit from the downstream chain.
#[derive(Debug, Clone, Default)]
pub struct LoggingInterceptor;

impl Interceptor for LoggingInterceptor {
    fn apply(
        &self,
        ctx: RequestContext,
        chain: &mut Chain<'_, RequestContext, Value>,
    ) -> Result<Flow<Value>, ChainError> {
        let handler = ctx.handler.clone();
        let trace_id = ctx.trace_id.clone();
        tracing::info!(handler = %handler, trace_id = %trace_id, "request received");

        let start = Instant::now();
        let proceeded = chain.next(ctx)?;

        #[allow(clippy::cast_possible_truncation)]
        let duration_ms = start.elapsed().as_millis() as u64;
        tracing::info!(
            handler = %handler,
            trace_id = %trace_id,
            duration_ms = duration_ms,
            state = ?chain.state(),
            "request handled"
        );
        Ok(proceeded.into())
    }

    fn name(&self) -> &'static str {
        "logging"
    }
}
