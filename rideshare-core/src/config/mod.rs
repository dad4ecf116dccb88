//! Runtime configuration for the dispatch engine.
//!
//! The server crate parses the configuration file; this module holds the
//! validated values and the store that lets them be swapped at runtime.

mod config_store;
mod dispatch;

pub use config_store::{ConfigStore, ConfigWatcher};
pub use dispatch::DispatchConfig;
