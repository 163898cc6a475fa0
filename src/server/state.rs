use std::sync::Arc;

use crate::common::config::AppConfig;
use crate::server::detector::Detector;

/// Shared state handed to every HTTP handler and WebSocket session.
///
/// Both members are immutable after startup and cloned by `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Defaults for per-request settings
    pub config: Arc<AppConfig>,
    /// The loaded model
    pub detector: Arc<Detector>,
}

impl AppState {
    pub fn new(config: AppConfig, detector: Detector) -> Self {
        Self {
            config: Arc::new(config),
            detector: Arc::new(detector),
        }
    }
}
