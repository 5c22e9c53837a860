pub mod store;

pub use store::{DoctorQueue, HospitalStore, StoreError};

use std::sync::Arc;
use std::time::Duration;

use shared_config::AppConfig;

/// Shared application state handed to every router as `Arc<AppState>`.
pub struct AppState {
    pub config: AppConfig,
    pub store: HospitalStore,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let store = HospitalStore::new(Duration::from_millis(config.lock_timeout_ms));
        Self { config, store }
    }

    pub fn shared(config: AppConfig) -> Arc<Self> {
        Arc::new(Self::new(config))
    }
}
