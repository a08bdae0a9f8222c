//! Host environment capability.
//!
//! The environment supplies everything platform-specific: the two storage
//! areas and the change bus that carries cross-context notifications. It
//! is constructed by the application and passed by reference, so tests and
//! embedders control its lifetime instead of relying on process globals.

use std::path::Path;
use std::sync::Arc;

use crate::area::{MemoryArea, SqliteArea, StorageArea};
use crate::error::Result;
use crate::event::{ChangeBus, StorageEvent};
use crate::types::StoreScope;

/// One execution context's view of the storage platform.
pub struct Environment {
    local: Arc<dyn StorageArea>,
    session: Arc<dyn StorageArea>,
    bus: Arc<ChangeBus>,
}

impl Environment {
    /// Environment whose local and session areas both live in memory.
    ///
    /// Nothing survives the process; useful for tests and ephemeral use.
    pub fn in_memory() -> Self {
        Self::with_areas(Arc::new(MemoryArea::new()), Arc::new(MemoryArea::new()))
    }

    /// Environment with a durable local area stored at `path` and an
    /// in-memory session area.
    pub fn persistent(path: &Path) -> Result<Self> {
        Ok(Self::with_areas(
            Arc::new(SqliteArea::open(path)?),
            Arc::new(MemoryArea::new()),
        ))
    }

    /// Environment built from explicit area implementations.
    pub fn with_areas(local: Arc<dyn StorageArea>, session: Arc<dyn StorageArea>) -> Self {
        Self {
            local,
            session,
            bus: Arc::new(ChangeBus::new()),
        }
    }

    /// Area handle for `scope`.
    pub fn area(&self, scope: StoreScope) -> Arc<dyn StorageArea> {
        match scope {
            StoreScope::Local => Arc::clone(&self.local),
            StoreScope::Session => Arc::clone(&self.session),
        }
    }

    /// Change bus carrying cross-context notifications in this context.
    pub fn events(&self) -> Arc<ChangeBus> {
        Arc::clone(&self.bus)
    }

    /// Deliver a cross-context change notification to this context.
    ///
    /// Called by whatever integration observes another context mutating
    /// the shared backing store; also the simulation point in tests.
    pub fn announce(&self, event: StorageEvent) {
        self.bus.emit(&event);
    }
}
