//! Scope and option types for the storage core.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Storage scope selected for a manager.
///
/// A manager's scope is fixed for its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreScope {
    /// Persists across processes until explicitly cleared.
    #[default]
    Local,

    /// Scoped to one process; gone when the process ends.
    Session,
}

impl fmt::Display for StoreScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreScope::Local => write!(f, "local"),
            StoreScope::Session => write!(f, "session"),
        }
    }
}

/// How raw stored strings are decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseMode {
    /// Strict JSON parsing.
    #[default]
    Json,

    /// Legacy-compatibility mode: strict JSON first, then a best-effort
    /// rewrite of JavaScript-style literals (single quotes, unquoted keys,
    /// trailing commas, `undefined`) into JSON. Every fallback is logged.
    Relaxed,
}

/// Per-consumer configuration for managers and stores.
///
/// No persisted identity; recreated per call.
#[derive(Debug, Clone, Copy, Default)]
pub struct StoreOptions {
    /// Storage scope to read and write.
    pub scope: StoreScope,

    /// How stored strings are decoded on read.
    pub parse_mode: ParseMode,
}

impl StoreOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scope(mut self, scope: StoreScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn parse_mode(mut self, parse_mode: ParseMode) -> Self {
        self.parse_mode = parse_mode;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = StoreOptions::new();
        assert_eq!(options.scope, StoreScope::Local);
        assert_eq!(options.parse_mode, ParseMode::Json);
    }

    #[test]
    fn test_options_builder() {
        let options = StoreOptions::new()
            .scope(StoreScope::Session)
            .parse_mode(ParseMode::Relaxed);
        assert_eq!(options.scope, StoreScope::Session);
        assert_eq!(options.parse_mode, ParseMode::Relaxed);
    }

    #[test]
    fn test_scope_display() {
        assert_eq!(StoreScope::Local.to_string(), "local");
        assert_eq!(StoreScope::Session.to_string(), "session");
    }
}
