//! Cached-value convenience handle.
//!
//! [`Store`] wraps a [`StorageManager`] with a cached current value and
//! the small mutation helpers most consumers want (`update`, `reset`),
//! and forwards every observed value into an optional reactive binding.

use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::binding::{NoopBinding, ReactiveBinding};
use crate::environment::Environment;
use crate::error::Result;
use crate::manager::{StorageManager, Subscription};
use crate::types::StoreOptions;

/// A storage-backed value with a synchronized in-memory snapshot.
pub struct Store<T> {
    manager: StorageManager<T>,
    current: Arc<Mutex<T>>,
}

impl<T> Store<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Create a store with the no-op binding.
    pub fn new(
        env: &Environment,
        key: impl Into<String>,
        initial_value: T,
        options: StoreOptions,
    ) -> Result<Self> {
        Self::with_binding(env, key, initial_value, options, Arc::new(NoopBinding))
    }

    /// Create a store that forwards every observed value to `binding`.
    pub fn with_binding(
        env: &Environment,
        key: impl Into<String>,
        initial_value: T,
        options: StoreOptions,
        binding: Arc<dyn ReactiveBinding<T>>,
    ) -> Result<Self> {
        let manager = StorageManager::with_options(env, key, initial_value, options)?;
        let current = Arc::new(Mutex::new(manager.get_value()));

        // First-registered listener, so the cache is current before any
        // later subscriber runs.
        let cache = Arc::clone(&current);
        manager.subscribe(move |value: &T| {
            *cache.lock().expect("store cache lock poisoned") = value.clone();
            binding.publish(value);
        });

        Ok(Self { manager, current })
    }

    /// Snapshot of the current value.
    pub fn value(&self) -> T {
        self.current
            .lock()
            .expect("store cache lock poisoned")
            .clone()
    }

    /// Persist `value` and notify subscribers.
    pub fn set(&self, value: T) -> Result<()> {
        self.manager.set_value(&value)
    }

    /// Apply `f` to the current value and persist the result.
    pub fn update<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&T) -> T,
    {
        let next = {
            let current = self.current.lock().expect("store cache lock poisoned");
            f(&current)
        };
        self.set(next)
    }

    /// Reset to the initial value.
    pub fn reset(&self) -> Result<()> {
        self.set(self.manager.initial_value().clone())
    }

    /// Subscribe to every value this store observes, writes and
    /// cross-context changes alike.
    pub fn subscribe<F>(&self, listener: F) -> Subscription<T>
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.manager.subscribe(listener)
    }

    /// Underlying manager.
    pub fn manager(&self) -> &StorageManager<T> {
        &self.manager
    }

    /// Destroy the underlying manager; see [`StorageManager::destroy`].
    pub fn destroy(&self) {
        self.manager.destroy();
    }
}
