//! Built-in interceptors.
//!
//! - [`logging`]: Before/after `tracing` events with timing
//! - [`auth`]: Rejects requests missing a required metadata entry
//! - [`counter`]: Cross-run invocation counting
//! - [`stamp`]: Writes a fixed key into the context scratch map

pub mod auth;
pub mod counter;
pub mod logging;
pub mod stamp;

pub use auth::RequireMetadata;
pub use counter::InvocationCounter;
pub use logging::LoggingInterceptor;
pub use stamp::ScratchStamp;

use serde_json::Value;

use crate::service::registry::{InterceptorRegistry, RegistryError};

/// Registry ids of the built-in interceptors, in registration order.
pub const BUILTIN_IDS: [&str; 4] = ["logging", "auth", "counter", "stamp"];

/// Registry holding every built-in interceptor under its [`BUILTIN_IDS`] id.
///
/// # Errors
///
/// Propagates a `RegistryError` from registration.
pub fn builtin_registry() -> Result<InterceptorRegistry, RegistryError> {
    let registry = InterceptorRegistry::new();
    registry.register("logging", LoggingInterceptor)?;
    registry.register("auth", RequireMetadata::authorization())?;
    registry.register("counter", InvocationCounter::new())?;
    registry.register("stamp", ScratchStamp::new("stamped", Value::Bool(true)))?;
    Ok(registry)
}
