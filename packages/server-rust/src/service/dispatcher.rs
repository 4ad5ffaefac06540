//! Handler dispatch: runs a registered handler behind its bound interceptor chain.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use intercept_core::{
    settle, ChainError, ChainOutcome, IntegrityError, RequestContext, TargetInvocation,
};
use serde_json::Value;
use tower::Service;
use tracing::info_span;

use super::builder::{BoundChain, ChainBuilder};
use super::config::DispatchConfig;
use super::protocol::ProtocolError;

// ---------------------------------------------------------------------------
// Handler trait
// ---------------------------------------------------------------------------

/// Business operation invoked at the end of a chain.
pub trait Handler: Send + Sync {
    /// Handle one request.
    ///
    /// # Errors
    ///
    /// Domain errors reach the client as protocol errors; any other failure is
    /// wrapped by the error boundary.
    fn handle(&self, ctx: RequestContext) -> Result<Value, ChainError>;
}

impl<F> Handler for F
where
    F: Fn(RequestContext) -> Result<Value, ChainError> + Send + Sync,
{
    fn handle(&self, ctx: RequestContext) -> Result<Value, ChainError> {
        self(ctx)
    }
}

// ---------------------------------------------------------------------------
// DispatchError
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("unknown handler: {name}")]
    UnknownHandler { name: String },
    #[error("{0}")]
    Rejected(ProtocolError),
    #[error(transparent)]
    Integrity(#[from] IntegrityError),
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Routes a `RequestContext` to the handler named by `ctx.handler` and runs
/// it behind that handler's bound chain.
///
/// Unregistered handlers return `DispatchError::UnknownHandler` without
/// running any interceptor.
#[derive(Clone)]
pub struct Dispatcher {
    config: Arc<DispatchConfig>,
    chains: Arc<ChainBuilder>,
    handlers: HashMap<String, Arc<dyn Handler>>,
}

impl Dispatcher {
    #[must_use]
    pub fn new(config: DispatchConfig, chains: ChainBuilder) -> Self {
        Self {
            config: Arc::new(config),
            chains: Arc::new(chains),
            handlers: HashMap::new(),
        }
    }

    /// Register a handler under `name`, replacing any previous one.
    pub fn register<H>(&mut self, name: impl Into<String>, handler: H)
    where
        H: Handler + 'static,
    {
        self.handlers.insert(name.into(), Arc::new(handler));
    }

    /// Dispatch one request synchronously.
    ///
    /// # Errors
    ///
    /// - `DispatchError::UnknownHandler` if no handler is registered for `ctx.handler`.
    /// - `DispatchError::Rejected` carrying the client-facing error for any
    ///   domain failure.
    /// - `DispatchError::Integrity` on chain misuse by an interceptor.
    pub fn dispatch(&self, ctx: RequestContext) -> Result<ChainOutcome<Value>, DispatchError> {
        let Some(handler) = self.handlers.get(&ctx.handler).cloned() else {
            return Err(DispatchError::UnknownHandler { name: ctx.handler });
        };
        let chain = self.chains.chain_for(&ctx.handler);
        run(&chain, handler, self.prepare(ctx))
    }

    /// Fill in node, tenant, and trace id for contexts that arrive without them.
    fn prepare(&self, mut ctx: RequestContext) -> RequestContext {
        if ctx.node_id.is_empty() {
            ctx.node_id.clone_from(&self.config.node_id);
        }
        if ctx.tenant_id.is_none() {
            ctx.tenant_id.clone_from(&self.config.default_tenant);
        }
        if ctx.trace_id.is_empty() {
            ctx.trace_id = uuid::Uuid::new_v4().to_string();
        }
        ctx
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut handlers: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        handlers.sort_unstable();
        f.debug_struct("Dispatcher")
            .field("config", &self.config)
            .field("handlers", &handlers)
            .finish_non_exhaustive()
    }
}

impl Service<RequestContext> for Dispatcher {
    type Response = ChainOutcome<Value>;
    type Error = DispatchError;
    type Future = Pin<Box<dyn Future<Output = Result<ChainOutcome<Value>, DispatchError>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, ctx: RequestContext) -> Self::Future {
        let Some(handler) = self.handlers.get(&ctx.handler).cloned() else {
            let name = ctx.handler;
            return Box::pin(async move { Err(DispatchError::UnknownHandler { name }) });
        };
        let chain = self.chains.chain_for(&ctx.handler);
        let ctx = self.prepare(ctx);
        Box::pin(async move { run(&chain, handler, ctx) })
    }
}

/// Run `handler` behind `chain` inside a `dispatch` span that records the
/// outcome and duration.
fn run(
    chain: &BoundChain,
    handler: Arc<dyn Handler>,
    ctx: RequestContext,
) -> Result<ChainOutcome<Value>, DispatchError> {
    let span = info_span!(
        "dispatch",
        handler = %ctx.handler,
        trace_id = %ctx.trace_id,
        interceptors = chain.len(),
        duration_ms = tracing::field::Empty,
        outcome = tracing::field::Empty,
    );
    let _entered = span.enter();

    let path = ctx.path.clone();
    let location = ctx.location;
    let target = TargetInvocation::new(handler, |handler: Arc<dyn Handler>, ctx: RequestContext| {
        handler.handle(ctx)
    });

    let start = Instant::now();
    let result = chain.execute(ctx, target);

    #[allow(clippy::cast_possible_truncation)]
    let duration_ms = start.elapsed().as_millis() as u64;
    let outcome = match &result {
        Ok(outcome) if outcome.target_invoked() => "completed",
        Ok(_) => "short_circuited",
        Err(ChainError::Integrity(_)) => "integrity_error",
        Err(_) => "rejected",
    };
    span.record("duration_ms", duration_ms);
    span.record("outcome", outcome);
    tracing::info!(duration_ms, outcome, "dispatch complete");

    result.map_err(|err| match settle(err) {
        Ok(domain) => DispatchError::Rejected(ProtocolError::from_domain(&domain, &path, location)),
        Err(violation) => DispatchError::Integrity(violation),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
