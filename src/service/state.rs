//! Shared service state.

use std::sync::Arc;

use crate::config::EditConfig;
use crate::edit::GraphEditService;
use crate::store::EdgeStore;

/// Shared service state.
///
/// Holds the edit service and a label for the store backend used in health
/// reports. Cloning is cheap; the store is shared.
pub struct ServiceState<S: EdgeStore> {
    /// Validated edge operations.
    pub editor: GraphEditService<S>,
    /// Backend label ("postgres", "memory", ...).
    pub backend: &'static str,
}

impl<S: EdgeStore> ServiceState<S> {
    /// Create new service state over a store.
    pub fn new(store: S, config: EditConfig, backend: &'static str) -> Self {
        Self {
            editor: GraphEditService::new(Arc::new(store), config),
            backend,
        }
    }

    /// Create service state with budgets read from the environment.
    pub fn from_env(store: S, backend: &'static str) -> Self {
        Self::new(store, EditConfig::from_env(), backend)
    }
}

impl<S: EdgeStore> Clone for ServiceState<S> {
    fn clone(&self) -> Self {
        Self {
            editor: self.editor.clone(),
            backend: self.backend,
        }
    }
}
