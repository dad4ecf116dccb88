//! Shared configuration value with change notification.
//!
//! `ConfigStore<T>` keeps the current value in a `watch` channel. Readers
//! take a cheap `Arc` snapshot; watchers are woken on every update.

use std::sync::Arc;
use tokio::sync::watch;

/// A shared, swappable configuration value.
pub struct ConfigStore<T> {
    tx: Arc<watch::Sender<Arc<T>>>,
}

/// Receives notifications when a [`ConfigStore`] is updated.
pub struct ConfigWatcher<T> {
    rx: watch::Receiver<Arc<T>>,
}

impl<T> ConfigStore<T> {
    pub fn new(initial: T) -> Self {
        let (tx, _) = watch::channel(Arc::new(initial));
        Self { tx: Arc::new(tx) }
    }

    /// Replace the stored value and notify all watchers.
    pub fn update(&self, value: T) {
        self.tx.send_replace(Arc::new(value));
    }

    /// Snapshot of the current value.
    pub fn read(&self) -> Arc<T> {
        Arc::clone(&*self.tx.borrow())
    }

    pub fn subscribe(&self) -> ConfigWatcher<T> {
        ConfigWatcher {
            rx: self.tx.subscribe(),
        }
    }
}

impl<T> Clone for ConfigStore<T> {
    fn clone(&self) -> Self {
        Self {
            tx: Arc::clone(&self.tx),
        }
    }
}

impl<T> ConfigWatcher<T> {
    /// Wait until the store is updated.
    ///
    /// Returns `Err` once every [`ConfigStore`] handle has been dropped.
    pub async fn changed(&mut self) -> Result<(), watch::error::RecvError> {
        self.rx.changed().await
    }
}
