//! Explicit store registry.
//!
//! The convenience layer that hands out one shared store per key. Unlike
//! a module-level singleton, the registry is an ordinary value the
//! application constructs and passes around, so tests and embedders
//! control its lifetime.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::environment::Environment;
use crate::error::{Result, StoreError};
use crate::store::Store;
use crate::types::{StoreOptions, StoreScope};

/// Object-safe view of a cached store, enough to tear it down and to
/// recover its concrete type.
trait ErasedStore: Send + Sync {
    fn destroy_store(&self);
    fn as_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T> ErasedStore for Store<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    fn destroy_store(&self) {
        self.destroy();
    }

    fn as_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// Caches one store per `(key, scope)` pair.
pub struct StoreRegistry {
    stores: Mutex<HashMap<(String, StoreScope), Arc<dyn ErasedStore>>>,
}

impl StoreRegistry {
    pub fn new() -> Self {
        Self {
            stores: Mutex::new(HashMap::new()),
        }
    }

    /// Fetch the cached store for `(key, options.scope)`, constructing it
    /// on first use.
    ///
    /// `initial_value` and the remaining options only take effect on
    /// first use; later calls for the same pair return the cached
    /// instance unchanged.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidInput` if a store for the pair already
    /// exists with a different value type; construction errors from
    /// [`Store::new`] otherwise.
    pub fn store<T>(
        &self,
        env: &Environment,
        key: &str,
        initial_value: T,
        options: StoreOptions,
    ) -> Result<Arc<Store<T>>>
    where
        T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
    {
        let map_key = (key.to_string(), options.scope);
        let mut stores = self
            .stores
            .lock()
            .map_err(|_| StoreError::Storage("store registry lock poisoned".to_string()))?;

        if let Some(existing) = stores.get(&map_key) {
            return Arc::clone(existing)
                .as_any_arc()
                .downcast::<Store<T>>()
                .map_err(|_| {
                    StoreError::InvalidInput(format!(
                        "store for key \"{}\" already exists with a different value type",
                        key
                    ))
                });
        }

        let store = Arc::new(Store::new(env, key, initial_value, options)?);
        stores.insert(map_key, Arc::clone(&store) as Arc<dyn ErasedStore>);
        Ok(store)
    }

    /// Destroy every cached store and clear the registry.
    pub fn destroy_all(&self) {
        let mut stores = match self.stores.lock() {
            Ok(stores) => stores,
            Err(poisoned) => poisoned.into_inner(),
        };
        for store in stores.values() {
            store.destroy_store();
        }
        stores.clear();
    }

    /// Number of cached stores.
    pub fn len(&self) -> usize {
        self.stores
            .lock()
            .map(|stores| stores.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for StoreRegistry {
    fn default() -> Self {
        Self::new()
    }
}
