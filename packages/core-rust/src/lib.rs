//! Intercept Core — request context, interceptor chain executor, and error boundary.

pub mod boundary;
pub mod chain;
pub mod context;
pub mod error;
pub mod interceptor;
pub mod target;
pub mod types;

pub use boundary::{classify, settle, UNEXPECTED_FAILURE_MESSAGE};
pub use chain::{execute, proceed, Chain, ChainOutcome, ChainState, Flow, Proceeded};
pub use context::RequestContext;
pub use error::{ChainError, DomainError, IntegrityError};
pub use interceptor::Interceptor;
pub use target::{Target, TargetInvocation};
pub use types::{PathSegment, Principal, SourceLocation};
