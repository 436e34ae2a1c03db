//! Application state.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use tnse_sync::{
    CoordinatorRegistry, RefreshConfig, RefreshCoordinator, RefreshHandle, RefreshScheduler,
    ServiceHandler,
};
use tracing::info;

use crate::error::AppError;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Coordinators by config entry id.
    registry: Arc<CoordinatorRegistry>,
    /// Service actions over the registry.
    services: Arc<ServiceHandler>,
    /// Running schedulers by config entry id.
    schedulers: Arc<Mutex<HashMap<String, RefreshHandle>>>,
}

impl AppState {
    /// Creates an empty state writing bills into `bill_dir`.
    pub fn new(bill_dir: impl Into<PathBuf>) -> Self {
        let registry = Arc::new(CoordinatorRegistry::new());
        let services = Arc::new(ServiceHandler::new(registry.clone(), bill_dir));
        Self {
            registry,
            services,
            schedulers: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Registers a coordinator without scheduling it.
    pub fn register(&self, coordinator: Arc<RefreshCoordinator>) {
        self.registry.insert(coordinator);
    }

    /// Registers a coordinator and starts its background scheduler.
    pub fn attach(&self, coordinator: Arc<RefreshCoordinator>, config: RefreshConfig) {
        let entry_id = coordinator.entry_id().to_string();
        info!(
            "Attaching entry {} (interval {:?})",
            entry_id, config.interval
        );

        self.registry.insert(coordinator.clone());
        let handle = RefreshScheduler::new(coordinator, config).start();
        // Replacing a handle drops and stops the previous scheduler.
        self.schedulers.lock().insert(entry_id, handle);
    }

    /// Unregisters an entry and stops its scheduler.
    pub fn detach(&self, entry_id: &str) -> Option<Arc<RefreshCoordinator>> {
        if let Some(handle) = self.schedulers.lock().remove(entry_id) {
            handle.stop();
        }
        self.registry.remove(entry_id)
    }

    /// Returns the coordinator registry.
    pub fn registry(&self) -> &Arc<CoordinatorRegistry> {
        &self.registry
    }

    /// Returns the service handler.
    pub fn services(&self) -> &ServiceHandler {
        self.services.as_ref()
    }

    /// Returns the coordinator of an entry.
    pub fn coordinator(&self, entry_id: &str) -> Result<Arc<RefreshCoordinator>, AppError> {
        self.registry
            .get(entry_id)
            .ok_or_else(|| AppError::EntryNotFound(entry_id.to_string()))
    }
}
