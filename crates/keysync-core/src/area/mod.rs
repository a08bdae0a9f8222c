//! Storage area trait and backends.
//!
//! A `StorageArea` is the raw string key-value store a manager writes
//! through. This abstraction allows keysync to back the local scope with a
//! durable store and the session scope with process memory without
//! changing the synchronization logic.

mod memory;
mod sqlite;

pub use memory::MemoryArea;
pub use sqlite::SqliteArea;

use crate::error::Result;

/// Reserved sentinel key used by the writability probe.
const PROBE_KEY: &str = "__keysync_probe__";

/// Raw string key-value storage.
///
/// All implementations must ensure:
/// - `set_item` either fully succeeds or returns an error; there is no
///   partial write observable through `get_item`
/// - removing a missing key is not an error
pub trait StorageArea: Send + Sync {
    /// Read the raw string stored under `key`.
    ///
    /// # Returns
    ///
    /// Returns `Ok(Some(raw))` if present, `Ok(None)` if absent.
    fn get_item(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any existing entry.
    fn set_item(&self, key: &str, value: &str) -> Result<()>;

    /// Remove the entry under `key`, if any.
    fn remove_item(&self, key: &str) -> Result<()>;

    /// List all stored keys in sorted order.
    fn keys(&self) -> Result<Vec<String>>;
}

/// Check whether an area is writable.
///
/// Performs a disposable write-then-remove probe with a reserved sentinel
/// key and returns false if either step fails (disabled storage, exhausted
/// quota, or a backend that is absent in this environment).
pub fn is_storage_enabled(area: &dyn StorageArea) -> bool {
    area.set_item(PROBE_KEY, "").is_ok() && area.remove_item(PROBE_KEY).is_ok()
}
