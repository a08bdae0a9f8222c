//! Cross-context change events.
//!
//! When some other execution context mutates a shared storage area, the
//! embedding application delivers a [`StorageEvent`] through the
//! environment's [`ChangeBus`]. Managers register one filtered hook each
//! and translate matching events into listener notifications.

use std::sync::{Arc, Mutex};

use uuid::Uuid;

use crate::types::StoreScope;

/// Notification that another execution context changed a stored key.
#[derive(Debug, Clone)]
pub struct StorageEvent {
    /// Key that changed.
    pub key: String,

    /// Raw string now stored under the key, or `None` if it was removed.
    pub new_value: Option<String>,

    /// Scope whose area changed.
    pub scope: StoreScope,
}

impl StorageEvent {
    pub fn new(key: impl Into<String>, new_value: Option<String>, scope: StoreScope) -> Self {
        Self {
            key: key.into(),
            new_value,
            scope,
        }
    }
}

type Hook = Arc<dyn Fn(&StorageEvent) + Send + Sync>;

/// Ordered registry of change-event hooks.
///
/// Each manager registers at most one hook, identified by the token
/// returned from [`ChangeBus::register`].
pub struct ChangeBus {
    hooks: Mutex<Vec<(Uuid, Hook)>>,
}

impl ChangeBus {
    pub fn new() -> Self {
        Self {
            hooks: Mutex::new(Vec::new()),
        }
    }

    /// Register a hook; returns the token that removes it.
    pub fn register<F>(&self, hook: F) -> Uuid
    where
        F: Fn(&StorageEvent) + Send + Sync + 'static,
    {
        let token = Uuid::new_v4();
        self.hooks
            .lock()
            .expect("change bus lock poisoned")
            .push((token, Arc::new(hook)));
        token
    }

    /// Remove a previously registered hook. Unknown tokens are ignored.
    pub fn unregister(&self, token: Uuid) {
        self.hooks
            .lock()
            .expect("change bus lock poisoned")
            .retain(|(id, _)| *id != token);
    }

    /// Deliver an event to every registered hook in registration order.
    ///
    /// Hooks run outside the bus lock, so a hook may register or
    /// unregister without deadlocking; such changes take effect from the
    /// next emission.
    pub fn emit(&self, event: &StorageEvent) {
        let snapshot: Vec<Hook> = self
            .hooks
            .lock()
            .expect("change bus lock poisoned")
            .iter()
            .map(|(_, hook)| Arc::clone(hook))
            .collect();
        for hook in snapshot {
            hook(event);
        }
    }

    /// Number of registered hooks.
    pub fn len(&self) -> usize {
        self.hooks.lock().expect("change bus lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ChangeBus {
    fn default() -> Self {
        Self::new()
    }
}
