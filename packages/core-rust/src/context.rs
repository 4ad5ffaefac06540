use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::types::{PathSegment, Principal, SourceLocation};

/// Per-request context carrying identity, arguments, and interceptor scratch space.
///
/// The context is moved through the chain: every interceptor receives it by
/// value and hands it (possibly modified, possibly replaced) to
/// [`Chain::next`](crate::chain::Chain::next). The value the target sees is
/// always the one most recently passed downstream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestContext {
    /// Identifier of the handler this request is bound for.
    pub handler: String,
    /// Identifier of the node handling this request.
    pub node_id: String,
    /// Tenant scope for multi-tenant isolation. `None` for single-tenant deployments.
    pub tenant_id: Option<String>,
    /// Authenticated principal, if an interceptor has established one.
    pub principal: Option<Principal>,
    /// Distributed trace identifier for observability.
    pub trace_id: String,
    /// Caller-supplied handler arguments.
    pub arguments: Map<String, Value>,
    /// Transport metadata such as headers. Keys are stored lowercase.
    pub metadata: HashMap<String, String>,
    /// Free-form key/value space shared by interceptors and the handler.
    pub scratch: HashMap<String, Value>,
    /// Response path of the field being resolved.
    pub path: Vec<PathSegment>,
    /// Source location of the field being resolved.
    pub location: Option<SourceLocation>,
}

impl RequestContext {
    /// Create a context for the given handler with everything else empty.
    #[must_use]
    pub fn new(handler: impl Into<String>) -> Self {
        Self {
            handler: handler.into(),
            ..Self::default()
        }
    }

    /// Builder-style helper to attach a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.metadata
            .insert(key.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    /// Builder-style helper to attach a handler argument.
    #[must_use]
    pub fn with_argument(mut self, name: impl Into<String>, value: Value) -> Self {
        self.arguments.insert(name.into(), value);
        self
    }

    /// Case-insensitive metadata lookup.
    #[must_use]
    pub fn metadata(&self, key: &str) -> Option<&str> {
        self.metadata
            .get(&key.to_ascii_lowercase())
            .map(String::as_str)
    }

    #[must_use]
    pub fn argument(&self, name: &str) -> Option<&Value> {
        self.arguments.get(name)
    }

    /// Store a scratch value, returning the previous one.
    pub fn put(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.scratch.insert(key.into(), value)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.scratch.get(key)
    }
}
