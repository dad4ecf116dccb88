//! One-shot expiry timers keyed by ride id.
//!
//! Each armed timer is a spawned task that sleeps and then runs its expiry
//! future. A timer claims its map entry before running, so a timer that has
//! been cancelled or superseded never starts its callback. A callback that
//! already started still races with other mutators and must guard itself.

use rideshare_sdk::objects::RideId;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::AbortHandle;
use tracing::debug;

struct ArmedTimer {
    token: u64,
    handle: AbortHandle,
}

/// Schedules and cancels per-ride expiry callbacks.
pub struct TimeoutManager {
    next_token: AtomicU64,
    timers: Arc<Mutex<HashMap<RideId, ArmedTimer>>>,
}

impl TimeoutManager {
    pub fn new() -> Self {
        Self {
            next_token: AtomicU64::new(1),
            timers: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Run `on_expire` once `after` has elapsed, unless cancelled first.
    ///
    /// Arming a ride that already has a timer replaces the old one.
    pub async fn arm<F>(&self, ride_id: RideId, after: Duration, on_expire: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        let timers = Arc::clone(&self.timers);

        // Hold the map while spawning so the task cannot look for its entry
        // before it has been inserted.
        let mut armed = self.timers.lock().await;
        let task = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            {
                let mut timers = timers.lock().await;
                match timers.get(&ride_id) {
                    Some(timer) if timer.token == token => {
                        timers.remove(&ride_id);
                    }
                    _ => return,
                }
            }
            on_expire.await;
        });

        let previous = armed.insert(
            ride_id,
            ArmedTimer {
                token,
                handle: task.abort_handle(),
            },
        );
        if let Some(previous) = previous {
            previous.handle.abort();
        }
        debug!(ride_id, ?after, "Armed ride timeout");
    }

    /// Prevent the ride's timer from firing.
    ///
    /// Safe to call for a timer that already fired or was never armed.
    /// Returns whether a pending timer was cancelled.
    pub async fn cancel(&self, ride_id: RideId) -> bool {
        match self.timers.lock().await.remove(&ride_id) {
            Some(timer) => {
                timer.handle.abort();
                debug!(ride_id, "Cancelled ride timeout");
                true
            }
            None => false,
        }
    }

    pub async fn is_armed(&self, ride_id: RideId) -> bool {
        self.timers.lock().await.contains_key(&ride_id)
    }

    /// Cancel every pending timer.
    pub async fn cancel_all(&self) -> usize {
        let mut timers = self.timers.lock().await;
        let count = timers.len();
        for (_, timer) in timers.drain() {
            timer.handle.abort();
        }
        count
    }
}

impl Default for TimeoutManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn bump(fired: &Arc<AtomicUsize>) -> impl Future<Output = ()> + Send + 'static {
        let fired = Arc::clone(fired);
        async move {
            fired.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_once_after_duration() {
        let timeouts = TimeoutManager::new();
        let fired = Arc::new(AtomicUsize::new(0));
        timeouts.arm(1, Duration::from_secs(10), bump(&fired)).await;

        tokio::time::sleep(Duration::from_secs(9)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(timeouts.is_armed(1).await);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!timeouts.is_armed(1).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_firing() {
        let timeouts = TimeoutManager::new();
        let fired = Arc::new(AtomicUsize::new(0));
        timeouts.arm(1, Duration::from_secs(10), bump(&fired)).await;

        assert!(timeouts.cancel(1).await);
        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_is_idempotent() {
        let timeouts = TimeoutManager::new();
        let fired = Arc::new(AtomicUsize::new(0));

        assert!(!timeouts.cancel(1).await);

        timeouts.arm(1, Duration::from_secs(1), bump(&fired)).await;
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        assert!(!timeouts.cancel(1).await);
        assert!(!timeouts.cancel(1).await);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_replaces_previous_timer() {
        let timeouts = TimeoutManager::new();
        let fired = Arc::new(AtomicUsize::new(0));
        timeouts.arm(1, Duration::from_secs(5), bump(&fired)).await;
        timeouts.arm(1, Duration::from_secs(10), bump(&fired)).await;

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_all() {
        let timeouts = TimeoutManager::new();
        let fired = Arc::new(AtomicUsize::new(0));
        timeouts.arm(1, Duration::from_secs(5), bump(&fired)).await;
        timeouts.arm(2, Duration::from_secs(5), bump(&fired)).await;

        assert_eq!(timeouts.cancel_all().await, 2);
        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
