//! RideJanitor processor.
//!
//! The RideJanitor periodically evicts rides that reached a terminal status
//! more than `ride_retention` ago. With no retention configured it stays
//! idle and rides are kept for the life of the process. Pending and accepted
//! rides are never touched.

use crate::config::{ConfigStore, ConfigWatcher, DispatchConfig};
use crate::processors::Dispatcher;
use tokio::sync::watch;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, info};

pub struct RideJanitor {
    dispatcher: Dispatcher,
}

impl RideJanitor {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    /// Evict expired terminal rides once. Returns how many were removed.
    pub async fn sweep(&self, config: &DispatchConfig) -> usize {
        let Some(retention) = config.ride_retention else {
            return 0;
        };
        let evicted = self.dispatcher.rides().evict_resolved(retention).await;
        if evicted > 0 {
            info!(evicted, "Evicted resolved rides");
        } else {
            debug!("No resolved rides to evict");
        }
        evicted
    }

    /// Run the janitor until shutdown is signaled.
    pub async fn run(
        self,
        mut shutdown_rx: watch::Receiver<bool>,
        config_store: ConfigStore<DispatchConfig>,
        mut config_watcher: ConfigWatcher<DispatchConfig>,
    ) {
        let mut ticker = sweep_ticker(&config_store.read());
        info!(
            retention = ?config_store.read().ride_retention,
            "RideJanitor started"
        );

        loop {
            tokio::select! {
                biased;

                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("RideJanitor received shutdown signal");
                        break;
                    }
                }

                Ok(()) = config_watcher.changed() => {
                    let config = config_store.read();
                    ticker = sweep_ticker(&config);
                    info!(
                        retention = ?config.ride_retention,
                        interval = ?config.sweep_interval,
                        "RideJanitor reloaded config"
                    );
                }

                _ = ticker.tick() => {
                    let config = config_store.read();
                    self.sweep(&config).await;
                }
            }
        }

        info!("RideJanitor shutdown complete");
    }
}

fn sweep_ticker(config: &DispatchConfig) -> Interval {
    let period = config.sweep_interval;
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}
