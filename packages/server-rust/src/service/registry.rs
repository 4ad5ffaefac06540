use std::any::{Any, TypeId};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use intercept_core::Interceptor;
use parking_lot::RwLock;

// ---------------------------------------------------------------------------
// RegistryError
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("interceptor id must not be empty")]
    EmptyId,
    #[error("interceptor already registered: {id}")]
    Duplicate { id: String },
}

// ---------------------------------------------------------------------------
// InterceptorRegistry
// ---------------------------------------------------------------------------

/// Explicit registry of interceptor instances, populated at startup.
///
/// Provides two lookup mechanisms:
/// - **By id** (`resolve`): the identifier used in binding configuration
/// - **By type** (`get::<T>`): the concrete type, for callers that need to
///   read interceptor-owned state such as counters
///
/// Registration order is kept for diagnostics (`ids`).
pub struct InterceptorRegistry {
    /// Id-based lookup: interceptor id -> shared instance.
    by_id: DashMap<String, Arc<dyn Interceptor>>,
    /// Type-based lookup: `TypeId` -> `Arc<dyn Any + Send + Sync>`.
    by_type: DashMap<TypeId, Arc<dyn Any + Send + Sync>>,
    order: RwLock<Vec<String>>,
}

impl InterceptorRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            by_id: DashMap::new(),
            by_type: DashMap::new(),
            order: RwLock::new(Vec::new()),
        }
    }

    /// Register an interceptor under `id`. The instance becomes accessible via
    /// both `resolve(id)` and `get::<T>()`.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::EmptyId` for a blank id and
    /// `RegistryError::Duplicate` if the id is taken.
    pub fn register<T>(&self, id: impl Into<String>, interceptor: T) -> Result<Arc<T>, RegistryError>
    where
        T: Interceptor + 'static,
    {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(RegistryError::EmptyId);
        }
        let arc = Arc::new(interceptor);
        match self.by_id.entry(id.clone()) {
            Entry::Occupied(_) => return Err(RegistryError::Duplicate { id }),
            Entry::Vacant(slot) => {
                slot.insert(arc.clone());
            }
        }
        self.by_type.insert(TypeId::of::<T>(), arc.clone());
        tracing::debug!(id = %id, interceptor = arc.name(), "interceptor registered");
        self.order.write().push(id);
        Ok(arc)
    }

    /// Look up an interceptor by its binding id.
    #[must_use]
    pub fn resolve(&self, id: &str) -> Option<Arc<dyn Interceptor>> {
        self.by_id.get(id).map(|entry| entry.value().clone())
    }

    /// Retrieve the most recently registered interceptor of concrete type `T`.
    #[must_use]
    pub fn get<T: Interceptor + 'static>(&self) -> Option<Arc<T>> {
        self.by_type
            .get(&TypeId::of::<T>())
            .and_then(|entry| entry.value().clone().downcast::<T>().ok())
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    /// Registered ids in registration order.
    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        self.order.read().clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

impl Default for InterceptorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InterceptorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterceptorRegistry")
            .field("ids", &*self.order.read())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
