//! Intercept Server — handler bindings, interceptor registry, and tower dispatcher.

pub mod service;

pub use service::{
    builtin_registry, BindError, BindingConfig, ChainBuilder, DispatchConfig, DispatchError,
    Dispatcher, Handler, InterceptorRegistry, ProtocolError,
};
