//! Per-rider notification channels.
//!
//! Each connected rider gets one unbounded channel. The dispatcher is the
//! only writer; the rider's stream handler is the only reader.

use super::types::RideUpdate;
use crate::error::DispatchError;
use rideshare_sdk::objects::RiderId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{RwLock, mpsc};

/// Sender handle for RideUpdate events.
type RideUpdateSender = mpsc::UnboundedSender<RideUpdate>;
/// Receiver handle for RideUpdate events.
type RideUpdateReceiver = mpsc::UnboundedReceiver<RideUpdate>;

/// Create a new RideUpdate channel.
///
/// Unbounded so that pushing an update never waits on the rider's
/// connection.
fn ride_update_channel() -> (RideUpdateSender, RideUpdateReceiver) {
    mpsc::unbounded_channel()
}

/// The reading end of a rider's subscription.
pub struct RiderSubscription {
    rider_id: RiderId,
    subscription_id: u64,
    receiver: RideUpdateReceiver,
}

impl RiderSubscription {
    pub fn rider_id(&self) -> RiderId {
        self.rider_id
    }

    /// Wait for the next update.
    ///
    /// Returns `None` after the subscription has been replaced or removed
    /// and every update pushed before that has been delivered.
    pub async fn recv(&mut self) -> Option<RideUpdate> {
        self.receiver.recv().await
    }
}

/// Registry of connected riders, at most one subscription per rider.
pub struct RiderChannels {
    next_subscription: AtomicU64,
    riders: RwLock<HashMap<RiderId, (u64, RideUpdateSender)>>,
}

impl RiderChannels {
    pub fn new() -> Self {
        Self {
            next_subscription: AtomicU64::new(1),
            riders: RwLock::new(HashMap::new()),
        }
    }

    /// Open a subscription for `rider_id`, replacing any existing one.
    pub async fn subscribe(&self, rider_id: RiderId) -> RiderSubscription {
        let subscription_id = self.next_subscription.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = ride_update_channel();
        self.riders
            .write()
            .await
            .insert(rider_id, (subscription_id, sender));
        RiderSubscription {
            rider_id,
            subscription_id,
            receiver,
        }
    }

    /// Remove `subscription` if it is still the rider's current one.
    pub async fn unsubscribe(&self, subscription: &RiderSubscription) -> bool {
        let mut riders = self.riders.write().await;
        let is_current = riders
            .get(&subscription.rider_id)
            .is_some_and(|(id, _)| *id == subscription.subscription_id);
        if is_current {
            riders.remove(&subscription.rider_id);
        }
        is_current
    }

    /// Push `update` to the rider's channel.
    ///
    /// Fails with [`DispatchError::SubscriberDisconnected`] if the rider has
    /// no live subscription. The update is dropped in that case.
    pub async fn push(&self, rider_id: RiderId, update: RideUpdate) -> Result<(), DispatchError> {
        let riders = self.riders.read().await;
        let (_, sender) = riders
            .get(&rider_id)
            .ok_or(DispatchError::SubscriberDisconnected)?;
        sender
            .send(update)
            .map_err(|_| DispatchError::SubscriberDisconnected)
    }

    pub async fn is_subscribed(&self, rider_id: RiderId) -> bool {
        self.riders.read().await.contains_key(&rider_id)
    }
}

impl Default for RiderChannels {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::RideStatus;

    fn update(ride_id: u64, status: RideStatus) -> RideUpdate {
        RideUpdate {
            ride_id,
            status,
            message: status.to_string(),
        }
    }

    #[tokio::test]
    async fn test_updates_arrive_in_push_order() {
        let channels = RiderChannels::new();
        let mut subscription = channels.subscribe(3).await;

        channels.push(3, update(1, RideStatus::Accepted)).await.unwrap();
        channels.push(3, update(1, RideStatus::Completed)).await.unwrap();

        assert_eq!(subscription.recv().await.unwrap().status, RideStatus::Accepted);
        assert_eq!(subscription.recv().await.unwrap().status, RideStatus::Completed);
    }

    #[tokio::test]
    async fn test_push_without_subscriber() {
        let channels = RiderChannels::new();
        let result = channels.push(3, update(1, RideStatus::AutoRejected)).await;
        assert_eq!(result, Err(DispatchError::SubscriberDisconnected));
    }

    #[tokio::test]
    async fn test_second_subscribe_replaces_first() {
        let channels = RiderChannels::new();
        let mut first = channels.subscribe(3).await;
        channels.push(3, update(1, RideStatus::Accepted)).await.unwrap();

        let mut second = channels.subscribe(3).await;
        channels.push(3, update(1, RideStatus::Completed)).await.unwrap();

        // The old stream drains what it already had, then ends.
        assert_eq!(first.recv().await.unwrap().status, RideStatus::Accepted);
        assert_eq!(first.recv().await, None);
        assert_eq!(second.recv().await.unwrap().status, RideStatus::Completed);

        // Tearing down the stale stream leaves the new one in place.
        assert!(!channels.unsubscribe(&first).await);
        assert!(channels.is_subscribed(3).await);
        assert!(channels.unsubscribe(&second).await);
        assert!(!channels.is_subscribed(3).await);
    }
}
