//! Shared application state.

use std::sync::Arc;

use subgate_config::Config;
use subgate_store::CustomerManager;

/// State handed to every handler: the lifecycle manager and the resolved
/// configuration, both constructed once at startup.
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<CustomerManager>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(manager: Arc<CustomerManager>, config: Arc<Config>) -> Self {
        Self { manager, config }
    }
}
