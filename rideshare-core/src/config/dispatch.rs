//! Dispatch timing configuration.

use std::time::Duration;

/// Timing knobs of the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchConfig {
    /// How long a ride may stay `Pending` before it is auto-rejected.
    /// Read when a ride is requested, so changes only affect new rides.
    pub offer_timeout: Duration,
    /// How long terminal rides are kept. `None` keeps them forever.
    pub ride_retention: Option<Duration>,
    /// How often the janitor looks for rides to evict.
    pub sweep_interval: Duration,
}

impl DispatchConfig {
    pub const DEFAULT_OFFER_TIMEOUT: Duration = Duration::from_secs(10);
    pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

    pub fn with_offer_timeout(mut self, offer_timeout: Duration) -> Self {
        self.offer_timeout = offer_timeout;
        self
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            offer_timeout: Self::DEFAULT_OFFER_TIMEOUT,
            ride_retention: None,
            sweep_interval: Self::DEFAULT_SWEEP_INTERVAL,
        }
    }
}
