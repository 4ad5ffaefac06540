//! Target invocation: the business handler at the end of the chain.

use crate::error::ChainError;

/// Capability wrapping the handler call. Consumed on invocation, so a target
/// can fire at most once.
///
/// Failures are returned as-is; classification happens in the chain, not here.
pub trait Target<C, R> {
    /// Invoke the handler with the working context in its slot.
    ///
    /// # Errors
    ///
    /// Whatever the handler returns.
    fn invoke(self, ctx: C) -> Result<R, ChainError>;
}

impl<C, R, F> Target<C, R> for F
where
    F: FnOnce(C) -> Result<R, ChainError>,
{
    fn invoke(self, ctx: C) -> Result<R, ChainError> {
        self(ctx)
    }
}

/// Handler call with its non-context arguments fixed up front.
///
/// The context travels separately through the chain and is substituted at
/// invocation time, so the handler always receives the latest one.
pub struct TargetInvocation<A, H> {
    args: A,
    handler: H,
}

impl<A, H> TargetInvocation<A, H> {
    pub fn new(args: A, handler: H) -> Self {
        Self { args, handler }
    }

    /// The arguments the handler will receive alongside the context.
    pub fn args(&self) -> &A {
        &self.args
    }
}

impl<A, C, R, H> Target<C, R> for TargetInvocation<A, H>
where
    H: FnOnce(A, C) -> Result<R, ChainError>,
{
    fn invoke(self, ctx: C) -> Result<R, ChainError> {
        (self.handler)(self.args, ctx)
    }
}

impl<A: std::fmt::Debug, H> std::fmt::Debug for TargetInvocation<A, H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TargetInvocation")
            .field("args", &self.args)
            .finish_non_exhaustive()
    }
}
