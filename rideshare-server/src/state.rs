//! Application state shared across all request handlers.

use rideshare_core::config::{ConfigStore, DispatchConfig};
use rideshare_core::processors::Dispatcher;

/// Application state that is shared across all request handlers.
///
/// This is cloneable and cheap to pass around (everything is behind Arc).
#[derive(Clone)]
pub struct AppState {
    /// The dispatch engine.
    pub dispatcher: Dispatcher,
}

impl AppState {
    pub fn new(dispatch_config: ConfigStore<DispatchConfig>) -> Self {
        Self {
            dispatcher: Dispatcher::new(dispatch_config),
        }
    }

    /// Dispatch configuration (can be reloaded via SIGHUP).
    pub fn dispatch_config(&self) -> &ConfigStore<DispatchConfig> {
        self.dispatcher.config()
    }
}
