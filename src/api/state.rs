//! Application state for the API server

use crate::{Config, MediaService};
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// Cloned for each request (cheap Arc clones).
#[derive(Clone)]
pub struct AppState {
    /// The assembled media service
    pub service: Arc<MediaService>,

    /// Configuration the service was built with
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(service: Arc<MediaService>) -> Self {
        let config = service.config().clone();
        Self { service, config }
    }
}
