//! Interceptor binding and dispatch.
//!
//! This module wires the core chain engine to named handlers:
//!
//! 1. **Configuration** (`config`): handler -> ordered interceptor ids, plus dispatch settings
//! 2. **Registry** (`registry`): explicit id -> interceptor instance lookup
//! 3. **Builder** (`builder`): resolves bindings into per-handler chains, failing fast
//! 4. **Dispatcher** (`dispatcher`): runs a handler through its chain as a tower service
//! 5. **Protocol** (`protocol`): converts escaping domain errors for clients
//! 6. **Built-ins** (`middleware`): interceptors shipped with the server

pub mod builder;
pub mod config;
pub mod dispatcher;
pub mod middleware;
pub mod protocol;
pub mod registry;

// Re-export key types for convenient access.
pub use builder::{BindError, BoundChain, ChainBuilder};
pub use config::{BindingConfig, ConfigError, DispatchConfig};
pub use dispatcher::{DispatchError, Dispatcher, Handler};
pub use middleware::builtin_registry;
pub use protocol::ProtocolError;
pub use registry::{InterceptorRegistry, RegistryError};
