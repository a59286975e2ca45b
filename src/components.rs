//! Self-hosted component container for the kernel's own plumbing.

use std::any::{Any, TypeId};
use std::sync::Arc;

use ahash::AHashMap;

use crate::error::{DiError, DiResult};

/// Registry of the container's internal components (planner, pipeline, cache,
/// selector, settings).
///
/// A missing component is a [`DiError::NoSuchComponent`] — deliberately
/// distinct from [`DiError::NotFound`], because it indicates a container
/// self-configuration bug rather than a user binding gap.
pub struct ComponentContainer {
    map: AHashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl ComponentContainer {
    pub fn new() -> Self {
        Self { map: AHashMap::new() }
    }

    /// Registers a component, replacing any existing one of the same type.
    pub fn add<T: Any + Send + Sync>(&mut self, component: Arc<T>) {
        self.map.insert(TypeId::of::<T>(), component);
    }

    /// Looks up a component by type.
    pub fn get<T: Any + Send + Sync>(&self) -> DiResult<Arc<T>> {
        let name = std::any::type_name::<T>();
        self.map
            .get(&TypeId::of::<T>())
            .ok_or(DiError::NoSuchComponent(name))?
            .clone()
            .downcast::<T>()
            .map_err(|_| DiError::NoSuchComponent(name))
    }

    pub fn contains<T: Any + Send + Sync>(&self) -> bool {
        self.map.contains_key(&TypeId::of::<T>())
    }
}

impl Default for ComponentContainer {
    fn default() -> Self {
        Self::new()
    }
}
