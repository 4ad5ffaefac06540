//! Scratch stamp interceptor: writes a fixed key into the context scratch map
//! before continuing, so downstream interceptors and the handler can see it.

use intercept_core::{Chain, ChainError, Flow, Interceptor, RequestContext};
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct ScratchStamp {
    key: String,
    value: Value,
}

impl ScratchStamp {
    #[must_use]
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Interceptor for ScratchStamp {
    fn apply(
        &self,
        mut ctx: RequestContext,
        chain: &mut Chain<'_, RequestContext, Value>,
    ) -> Result<Flow<Value>, ChainError> {
        if let Some(previous) = ctx.put(self.key.clone(), self.value.clone()) {
            tracing::debug!(key = %self.key, previous = %previous, "scratch key overwritten");
        }
        Ok(chain.next(ctx)?.into())
    }

    fn name(&self) -> &'static str {
        "stamp"
    }
}
