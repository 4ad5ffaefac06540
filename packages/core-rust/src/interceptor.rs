use serde_json::Value;

use crate::chain::{Chain, Flow};
use crate::context::RequestContext;
use crate::error::ChainError;

/// Unit of cross-cutting logic run before a handler.
///
/// An interceptor either drives the chain forward by calling
/// [`Chain::next`] and returning the [`Proceeded`](crate::chain::Proceeded)
/// token it gets back, or stops the run with [`Flow::Halt`]. Code placed after
/// `next` runs once everything downstream has finished.
///
/// Instances are shared across runs; any state they keep is their own concern.
pub trait Interceptor<C = RequestContext, R = Value>: Send + Sync {
    /// Run this interceptor for one chain invocation.
    ///
    /// # Errors
    ///
    /// Any failure aborts the remaining chain. Failures other than domain or
    /// integrity errors are wrapped by the error boundary.
    fn apply(&self, ctx: C, chain: &mut Chain<'_, C, R>) -> Result<Flow<R>, ChainError>;

    /// Name used in log output.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
