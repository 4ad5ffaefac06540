//! Chain building: resolves binding configuration into interceptor instances.
//!
//! Resolution is eager and total. Every binding is resolved when the builder
//! is constructed, and a single unknown id fails the whole build, so a
//! partially bound handler can never run.

use std::collections::HashMap;
use std::sync::Arc;

use intercept_core::{ChainError, ChainOutcome, Interceptor, RequestContext, Target};
use serde_json::Value;

use super::config::{BindingConfig, ConfigError};
use super::registry::InterceptorRegistry;

// ---------------------------------------------------------------------------
// BindError
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum BindError {
    #[error("handler {handler} references unknown interceptor {interceptor}")]
    UnknownInterceptor { handler: String, interceptor: String },
    #[error(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// BoundChain
// ---------------------------------------------------------------------------

/// The resolved, ordered interceptors for one handler.
pub struct BoundChain {
    handler: String,
    ids: Vec<String>,
    interceptors: Vec<Arc<dyn Interceptor>>,
}

impl BoundChain {
    fn empty(handler: &str) -> Self {
        Self {
            handler: handler.to_string(),
            ids: Vec::new(),
            interceptors: Vec::new(),
        }
    }

    #[must_use]
    pub fn handler(&self) -> &str {
        &self.handler
    }

    /// Interceptor ids in execution order.
    #[must_use]
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    #[must_use]
    pub fn interceptors(&self) -> &[Arc<dyn Interceptor>] {
        &self.interceptors
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    /// Run `target` behind this chain with the outer error boundary applied.
    ///
    /// # Errors
    ///
    /// A classified `ChainError`: `Domain` or `Integrity`.
    pub fn execute<'a, T>(
        &'a self,
        ctx: RequestContext,
        target: T,
    ) -> Result<ChainOutcome<Value>, ChainError>
    where
        T: Target<RequestContext, Value> + 'a,
    {
        intercept_core::execute(&self.interceptors, ctx, target)
    }
}

impl std::fmt::Debug for BoundChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundChain")
            .field("handler", &self.handler)
            .field("ids", &self.ids)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// ChainBuilder
// ---------------------------------------------------------------------------

/// Holds the bound chain of every configured handler.
#[derive(Debug, Default)]
pub struct ChainBuilder {
    chains: HashMap<String, Arc<BoundChain>>,
}

impl ChainBuilder {
    /// Resolve every binding in `config` against `registry`.
    ///
    /// # Errors
    ///
    /// - `BindError::Config` if the configuration fails structural validation.
    /// - `BindError::UnknownInterceptor` for the first id the registry cannot
    ///   resolve. Nothing is bound in that case.
    pub fn new(registry: &InterceptorRegistry, config: &BindingConfig) -> Result<Self, BindError> {
        config.validate()?;

        let mut chains = HashMap::with_capacity(config.bindings.len());
        for (handler, ids) in &config.bindings {
            let interceptors = ids
                .iter()
                .map(|id| {
                    registry.resolve(id).ok_or_else(|| BindError::UnknownInterceptor {
                        handler: handler.clone(),
                        interceptor: id.clone(),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;

            tracing::debug!(handler = %handler, interceptors = ?ids, "handler bound");
            chains.insert(
                handler.clone(),
                Arc::new(BoundChain {
                    handler: handler.clone(),
                    ids: ids.clone(),
                    interceptors,
                }),
            );
        }
        Ok(Self { chains })
    }

    /// The chain for `handler`. Handlers without a binding get an empty chain
    /// and run their target directly.
    #[must_use]
    pub fn chain_for(&self, handler: &str) -> Arc<BoundChain> {
        self.chains
            .get(handler)
            .cloned()
            .unwrap_or_else(|| Arc::new(BoundChain::empty(handler)))
    }

    #[must_use]
    pub fn is_bound(&self, handler: &str) -> bool {
        self.chains.contains_key(handler)
    }

    /// Bound handler ids, sorted.
    #[must_use]
    pub fn handlers(&self) -> Vec<&str> {
        let mut handlers: Vec<&str> = self.chains.keys().map(String::as_str).collect();
        handlers.sort_unstable();
        handlers
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
