//! Connected drivers, their availability and their pending offer queues.
//!
//! Each connected driver owns a slot holding its availability and a FIFO of
//! ride offers. The driver's stream waits on the slot's [`Notify`] instead of
//! polling; producers wake it whenever something it could consume changes.

use crate::events::RideOffer;
use rideshare_sdk::objects::DriverId;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::{Mutex, Notify, RwLock};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Availability {
    Available,
    OnRide,
}

struct DriverState {
    availability: Availability,
    queue: VecDeque<RideOffer>,
    /// Set once the slot has been unregistered or replaced.
    closed: bool,
}

struct DriverSlot {
    state: Mutex<DriverState>,
    wakeup: Notify,
}

impl DriverSlot {
    fn new() -> Self {
        Self {
            state: Mutex::new(DriverState {
                availability: Availability::Available,
                queue: VecDeque::new(),
                closed: false,
            }),
            wakeup: Notify::new(),
        }
    }

    async fn close(&self) {
        let mut state = self.state.lock().await;
        state.closed = true;
        state.queue.clear();
        drop(state);
        self.wakeup.notify_one();
    }
}

/// Handle held by a driver's stream for as long as it is connected.
pub struct DriverSession {
    driver_id: DriverId,
    slot: Arc<DriverSlot>,
}

impl DriverSession {
    pub fn driver_id(&self) -> DriverId {
        self.driver_id
    }

    /// Wait for the oldest queued offer.
    ///
    /// Offers are only handed out while the driver is `Available`; an
    /// `OnRide` driver's queue is frozen until it becomes available again.
    /// Returns `None` once the session has been unregistered or replaced by
    /// a newer connection for the same driver.
    pub async fn next_offer(&self) -> Option<RideOffer> {
        loop {
            {
                let mut state = self.slot.state.lock().await;
                if state.closed {
                    return None;
                }
                if state.availability == Availability::Available
                    && let Some(offer) = state.queue.pop_front()
                {
                    return Some(offer);
                }
            }
            // `notify_one` stores a permit, so a wakeup that lands between
            // releasing the lock and awaiting here is not lost.
            self.slot.wakeup.notified().await;
        }
    }

    pub async fn is_closed(&self) -> bool {
        self.slot.state.lock().await.closed
    }
}

/// Registry of connected drivers.
pub struct DriverRegistry {
    drivers: RwLock<HashMap<DriverId, Arc<DriverSlot>>>,
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self {
            drivers: RwLock::new(HashMap::new()),
        }
    }

    /// Register `driver_id` as `Available` with an empty queue.
    ///
    /// Registering an already connected driver replaces its slot; the old
    /// session is closed and its queued offers are dropped.
    pub async fn register(&self, driver_id: DriverId) -> DriverSession {
        let slot = Arc::new(DriverSlot::new());
        let previous = self
            .drivers
            .write()
            .await
            .insert(driver_id, Arc::clone(&slot));
        if let Some(previous) = previous {
            previous.close().await;
        }
        DriverSession { driver_id, slot }
    }

    /// Remove `driver_id` and drop its queue.
    pub async fn unregister(&self, driver_id: DriverId) -> bool {
        let removed = self.drivers.write().await.remove(&driver_id);
        match removed {
            Some(slot) => {
                slot.close().await;
                true
            }
            None => false,
        }
    }

    /// Remove the driver only if `session` is still its current connection.
    ///
    /// A stream that was superseded by a newer connection must not tear down
    /// its successor's registration.
    pub async fn end_session(&self, session: &DriverSession) -> bool {
        let mut drivers = self.drivers.write().await;
        let is_current = drivers
            .get(&session.driver_id)
            .is_some_and(|slot| Arc::ptr_eq(slot, &session.slot));
        if is_current {
            drivers.remove(&session.driver_id);
        }
        drop(drivers);
        session.slot.close().await;
        is_current
    }

    async fn slot(&self, driver_id: DriverId) -> Option<Arc<DriverSlot>> {
        self.drivers.read().await.get(&driver_id).cloned()
    }

    /// Append `offer` to the driver's queue if it is registered and
    /// `Available`. Returns whether the offer was queued.
    pub async fn enqueue_offer(&self, driver_id: DriverId, offer: RideOffer) -> bool {
        let Some(slot) = self.slot(driver_id).await else {
            return false;
        };
        push_if_available(&slot, offer).await
    }

    /// Queue `offer` for every currently `Available` driver.
    ///
    /// Returns the number of drivers that received it.
    pub async fn broadcast_offer(&self, offer: &RideOffer) -> usize {
        let drivers = self.drivers.read().await;
        let mut delivered = 0;
        for slot in drivers.values() {
            if push_if_available(slot, offer.clone()).await {
                delivered += 1;
            }
        }
        delivered
    }

    /// Pop the oldest offer without waiting, if the driver is `Available`.
    pub async fn dequeue_offer(&self, driver_id: DriverId) -> Option<RideOffer> {
        let slot = self.slot(driver_id).await?;
        let mut state = slot.state.lock().await;
        if state.availability != Availability::Available {
            return None;
        }
        state.queue.pop_front()
    }

    /// Returns `false` if the driver is not registered.
    pub async fn set_availability(&self, driver_id: DriverId, availability: Availability) -> bool {
        let Some(slot) = self.slot(driver_id).await else {
            return false;
        };
        slot.state.lock().await.availability = availability;
        if availability == Availability::Available {
            slot.wakeup.notify_one();
        }
        true
    }

    pub async fn availability(&self, driver_id: DriverId) -> Option<Availability> {
        let slot = self.slot(driver_id).await?;
        let availability = slot.state.lock().await.availability;
        Some(availability)
    }

    pub async fn queued_offers(&self, driver_id: DriverId) -> usize {
        match self.slot(driver_id).await {
            Some(slot) => slot.state.lock().await.queue.len(),
            None => 0,
        }
    }

    pub async fn len(&self) -> usize {
        self.drivers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.drivers.read().await.is_empty()
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::new()
    }
}

async fn push_if_available(slot: &DriverSlot, offer: RideOffer) -> bool {
    let mut state = slot.state.lock().await;
    if state.closed || state.availability != Availability::Available {
        return false;
    }
    state.queue.push_back(offer);
    drop(state);
    slot.wakeup.notify_one();
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use rideshare_sdk::objects::Location;
    use std::time::Duration;

    fn offer(ride_id: u64) -> RideOffer {
        RideOffer {
            ride_id,
            rider_id: 1,
            pickup: Location::new(10.0, 20.0),
            destination: Location::new(11.0, 21.0),
        }
    }

    #[tokio::test]
    async fn test_queue_is_fifo() {
        let registry = DriverRegistry::new();
        let session = registry.register(7).await;

        assert!(registry.enqueue_offer(7, offer(1)).await);
        assert!(registry.enqueue_offer(7, offer(2)).await);
        assert!(!registry.enqueue_offer(8, offer(3)).await);

        assert_eq!(session.next_offer().await.map(|o| o.ride_id), Some(1));
        assert_eq!(registry.dequeue_offer(7).await.map(|o| o.ride_id), Some(2));
        assert_eq!(registry.dequeue_offer(7).await, None);
    }

    #[tokio::test]
    async fn test_on_ride_driver_gets_nothing_and_queue_is_frozen() {
        let registry = DriverRegistry::new();
        let _session = registry.register(7).await;
        registry.enqueue_offer(7, offer(1)).await;

        assert!(registry.set_availability(7, Availability::OnRide).await);
        assert!(!registry.enqueue_offer(7, offer(2)).await);
        assert_eq!(registry.dequeue_offer(7).await, None);
        assert_eq!(registry.queued_offers(7).await, 1);

        registry.set_availability(7, Availability::Available).await;
        assert_eq!(registry.dequeue_offer(7).await.map(|o| o.ride_id), Some(1));
    }

    #[tokio::test]
    async fn test_broadcast_skips_busy_drivers() {
        let registry = DriverRegistry::new();
        let _a = registry.register(1).await;
        let _b = registry.register(2).await;
        let _c = registry.register(3).await;
        registry.set_availability(2, Availability::OnRide).await;

        assert_eq!(registry.broadcast_offer(&offer(10)).await, 2);
        assert_eq!(registry.queued_offers(1).await, 1);
        assert_eq!(registry.queued_offers(2).await, 0);
        assert_eq!(registry.queued_offers(3).await, 1);
    }

    #[tokio::test]
    async fn test_register_is_idempotent_and_resets() {
        let registry = DriverRegistry::new();
        let first = registry.register(7).await;
        registry.enqueue_offer(7, offer(1)).await;
        registry.set_availability(7, Availability::OnRide).await;

        let second = registry.register(7).await;
        assert_eq!(registry.len().await, 1);
        assert_eq!(registry.availability(7).await, Some(Availability::Available));
        assert_eq!(registry.queued_offers(7).await, 0);
        assert!(first.is_closed().await);
        assert_eq!(first.next_offer().await, None);

        // The stale session must not unregister its successor.
        assert!(!registry.end_session(&first).await);
        assert_eq!(registry.len().await, 1);
        assert!(!second.is_closed().await);
    }

    #[tokio::test]
    async fn test_waiting_stream_wakes_on_offer() {
        let registry = Arc::new(DriverRegistry::new());
        let session = registry.register(7).await;

        let waiter = tokio::spawn(async move { session.next_offer().await });
        tokio::task::yield_now().await;
        registry.enqueue_offer(7, offer(4)).await;

        let received = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(received.map(|o| o.ride_id), Some(4));
    }

    #[tokio::test]
    async fn test_unregister_ends_waiting_stream() {
        let registry = Arc::new(DriverRegistry::new());
        let session = registry.register(7).await;
        registry.set_availability(7, Availability::OnRide).await;

        let waiter = tokio::spawn(async move { session.next_offer().await });
        tokio::task::yield_now().await;
        assert!(registry.unregister(7).await);

        let received = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(received, None);
        assert!(!registry.enqueue_offer(7, offer(5)).await);
        assert!(registry.is_empty().await);
    }
}
