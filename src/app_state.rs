use std::sync::Arc;

use crate::config::AppConfig;
use crate::services::queue::JobStore;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub queue: Arc<dyn JobStore>,
}

impl AppState {
    pub fn new(config: AppConfig, queue: Arc<dyn JobStore>) -> Self {
        Self {
            config: Arc::new(config),
            queue,
        }
    }
}
