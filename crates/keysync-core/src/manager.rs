//! Storage-synchronization manager.
//!
//! A [`StorageManager`] owns a single logical key in one storage area. It
//! persists writes as JSON, fans change notifications out to subscribers,
//! and bridges cross-context change events into the same notifications.

use std::sync::{Arc, Mutex, Weak};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::area::{is_storage_enabled, StorageArea};
use crate::environment::Environment;
use crate::error::{Result, StoreError};
use crate::event::ChangeBus;
use crate::parse::parse_str;
use crate::types::{ParseMode, StoreOptions, StoreScope};

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;
type ListenerSet<T> = Vec<(Uuid, Listener<T>)>;

/// Manages one key's value in one storage area.
///
/// Construction probes the area for writability and registers exactly one
/// hook on the environment's change bus, filtered to this manager's key
/// and scope. Dropping the manager destroys it; [`destroy`] may also be
/// called explicitly and is idempotent.
///
/// Two managers constructed for the same key are independent: each probes,
/// reads, and registers its own hook. Callers that want one shared
/// instance per key cache them in a [`StoreRegistry`].
///
/// [`destroy`]: StorageManager::destroy
/// [`StoreRegistry`]: crate::registry::StoreRegistry
pub struct StorageManager<T> {
    key: String,
    scope: StoreScope,
    parse_mode: ParseMode,
    initial_value: T,
    area: Arc<dyn StorageArea>,
    listeners: Arc<Mutex<ListenerSet<T>>>,
    bus: Arc<ChangeBus>,
    bus_token: Mutex<Option<Uuid>>,
}

impl<T> StorageManager<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Create a manager for `key` in `scope`, with default parse mode.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Unavailable` if the scope's area fails the
    /// writability probe, `StoreError::InvalidInput` if `key` is empty.
    pub fn new(
        env: &Environment,
        key: impl Into<String>,
        initial_value: T,
        scope: StoreScope,
    ) -> Result<Self> {
        Self::with_options(env, key, initial_value, StoreOptions::new().scope(scope))
    }

    /// Create a manager configured by `options`.
    pub fn with_options(
        env: &Environment,
        key: impl Into<String>,
        initial_value: T,
        options: StoreOptions,
    ) -> Result<Self> {
        let key = key.into();
        if key.is_empty() {
            return Err(StoreError::InvalidInput(
                "storage key must not be empty".to_string(),
            ));
        }

        let area = env.area(options.scope);
        if !is_storage_enabled(area.as_ref()) {
            return Err(StoreError::Unavailable(format!(
                "{} storage failed the writability probe",
                options.scope
            )));
        }

        let listeners: Arc<Mutex<ListenerSet<T>>> = Arc::new(Mutex::new(Vec::new()));
        let bus = env.events();

        let hook_key = key.clone();
        let hook_scope = options.scope;
        let hook_mode = options.parse_mode;
        let hook_initial = initial_value.clone();
        let hook_listeners = Arc::clone(&listeners);
        let token = bus.register(move |event| {
            if event.key != hook_key || event.scope != hook_scope {
                return;
            }
            let value = derive_value(event.new_value.as_deref(), &hook_initial, hook_mode);
            notify(&hook_listeners, &value);
        });

        debug!(key = %key, scope = %options.scope, "storage manager created");

        Ok(Self {
            key,
            scope: options.scope,
            parse_mode: options.parse_mode,
            initial_value,
            area,
            listeners,
            bus,
            bus_token: Mutex::new(Some(token)),
        })
    }

    /// Key this manager owns.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Scope this manager reads and writes.
    pub fn scope(&self) -> StoreScope {
        self.scope
    }

    /// Value substituted for absent or malformed stored data.
    pub fn initial_value(&self) -> &T {
        &self.initial_value
    }

    /// Current value under the key.
    ///
    /// Absent, empty, or malformed stored data silently yields a clone of
    /// the initial value; such failures are logged, never returned.
    pub fn get_value(&self) -> T {
        let raw = match self.area.get_item(&self.key) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(key = %self.key, error = %err, "storage read failed, using initial value");
                return self.initial_value.clone();
            }
        };
        derive_value(raw.as_deref(), &self.initial_value, self.parse_mode)
    }

    /// Serialize `value`, persist it under the key, then synchronously
    /// notify every current listener in registration order.
    ///
    /// A serialization failure propagates to the caller and leaves the
    /// stored value untouched. Still safe after [`destroy`]: the write
    /// happens, nobody is notified.
    ///
    /// [`destroy`]: StorageManager::destroy
    pub fn set_value(&self, value: &T) -> Result<()> {
        let encoded = serde_json::to_string(value)?;
        self.area.set_item(&self.key, &encoded)?;
        notify(&self.listeners, value);
        Ok(())
    }

    /// Register a change listener; returns its unsubscribe handle.
    ///
    /// Listeners observe every write through [`set_value`] and every
    /// matching cross-context event, in registration order. Dropping the
    /// handle does not unsubscribe; removal is the explicit, idempotent
    /// [`Subscription::unsubscribe`].
    ///
    /// [`set_value`]: StorageManager::set_value
    pub fn subscribe<F>(&self, listener: F) -> Subscription<T>
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = Uuid::new_v4();
        self.listeners
            .lock()
            .expect("listener set lock poisoned")
            .push((id, Arc::new(listener)));
        Subscription {
            id,
            listeners: Arc::downgrade(&self.listeners),
        }
    }

    /// Deregister the cross-context hook and clear all listeners.
    ///
    /// A destroyed manager never notifies again. Idempotent; also invoked
    /// on drop.
    pub fn destroy(&self) {
        let token = self
            .bus_token
            .lock()
            .expect("bus token lock poisoned")
            .take();
        if let Some(token) = token {
            self.bus.unregister(token);
            debug!(key = %self.key, scope = %self.scope, "storage manager destroyed");
        }
        self.listeners
            .lock()
            .expect("listener set lock poisoned")
            .clear();
    }
}

impl<T> Drop for StorageManager<T> {
    fn drop(&mut self) {
        if let Ok(mut token) = self.bus_token.lock() {
            if let Some(token) = token.take() {
                self.bus.unregister(token);
            }
        }
    }
}

/// Apply the shared fallback policy to a raw stored string.
///
/// Absent or empty raw data, and data the configured mode cannot parse
/// into `T`, all derive to a clone of the initial value.
fn derive_value<T>(raw: Option<&str>, initial: &T, mode: ParseMode) -> T
where
    T: DeserializeOwned + Clone,
{
    match raw {
        Some(raw) if !raw.is_empty() => parse_str(raw, mode).unwrap_or_else(|| initial.clone()),
        _ => initial.clone(),
    }
}

/// Invoke every listener with `value`, outside the set's lock so a
/// listener may subscribe or unsubscribe without deadlocking.
fn notify<T>(listeners: &Mutex<ListenerSet<T>>, value: &T) {
    let snapshot: Vec<Listener<T>> = listeners
        .lock()
        .expect("listener set lock poisoned")
        .iter()
        .map(|(_, listener)| Arc::clone(listener))
        .collect();
    for listener in snapshot {
        listener(value);
    }
}

/// Handle returned by [`StorageManager::subscribe`].
pub struct Subscription<T> {
    id: Uuid,
    listeners: Weak<Mutex<ListenerSet<T>>>,
}

impl<T> Subscription<T> {
    /// Remove the listener this handle was returned for.
    ///
    /// Calling more than once, or after the manager was destroyed or
    /// dropped, is a no-op.
    pub fn unsubscribe(&self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners
                .lock()
                .expect("listener set lock poisoned")
                .retain(|(id, _)| *id != self.id);
        }
    }
}
