//! Dispatcher processor.
//!
//! The Dispatcher owns every piece of shared dispatch state and is
//! responsible for:
//! - Creating rides and broadcasting offers to available drivers
//! - Arming a per-ride expiry timer and auto-rejecting unanswered rides
//! - Resolving accept / reject / complete against the ride's current status
//! - Pushing a `RideUpdate` to the rider for every transition that happened
//!
//! Every status change is a compare-and-transition performed while holding
//! the ride's lock, so concurrent accepts, completions and timer firings on
//! the same ride are serialized and at most one driver is ever assigned.

use crate::config::{ConfigStore, DispatchConfig};
use crate::entities::{
    Availability, DriverRegistry, DriverSession, Ride, RideStatus, RideStore,
};
use crate::error::DispatchError;
use crate::events::{RideOffer, RideUpdate, RiderChannels, RiderSubscription};
use crate::processors::TimeoutManager;
use kanau::processor::Processor;
use rideshare_sdk::objects::{DriverId, Location, RideId, RiderId};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// A rider asks for a ride. Always succeeds and returns the new `Pending`
/// ride without waiting for a driver.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestRide {
    pub rider_id: RiderId,
    pub pickup: Location,
    pub destination: Location,
}

/// Look up a ride's current status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetRideStatus {
    pub ride_id: RideId,
}

/// A driver claims a pending ride. The first accept wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcceptRide {
    pub ride_id: RideId,
    pub driver_id: DriverId,
}

/// A driver declines a pending ride. Advisory only: the ride stays pending
/// and other drivers may still accept it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RejectRide {
    pub ride_id: RideId,
    pub driver_id: DriverId,
}

/// The assigned driver finishes an accepted ride.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompleteRide {
    pub ride_id: RideId,
    pub driver_id: DriverId,
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// The ride dispatch engine.
///
/// Cheap to clone; all clones share the same state.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    rides: RideStore,
    drivers: DriverRegistry,
    riders: RiderChannels,
    timeouts: TimeoutManager,
    config: ConfigStore<DispatchConfig>,
}

impl Dispatcher {
    pub fn new(config: ConfigStore<DispatchConfig>) -> Self {
        Self {
            inner: Arc::new(DispatcherInner {
                rides: RideStore::new(),
                drivers: DriverRegistry::new(),
                riders: RiderChannels::new(),
                timeouts: TimeoutManager::new(),
                config,
            }),
        }
    }

    pub fn rides(&self) -> &RideStore {
        &self.inner.rides
    }

    pub fn drivers(&self) -> &DriverRegistry {
        &self.inner.drivers
    }

    pub fn riders(&self) -> &RiderChannels {
        &self.inner.riders
    }

    pub fn timeouts(&self) -> &TimeoutManager {
        &self.inner.timeouts
    }

    pub fn config(&self) -> &ConfigStore<DispatchConfig> {
        &self.inner.config
    }

    // -- Driver stream ------------------------------------------------------

    /// Register a driver whose offer stream just opened.
    pub async fn connect_driver(&self, driver_id: DriverId) -> DriverSession {
        let session = self.inner.drivers.register(driver_id).await;
        info!(driver_id, "Driver subscribed for rides");
        session
    }

    /// Deregister a driver whose offer stream closed. Queued offers are
    /// dropped; accepts that are already in flight are still honoured.
    pub async fn disconnect_driver(&self, session: &DriverSession) {
        let driver_id = session.driver_id();
        if self.inner.drivers.end_session(session).await {
            info!(driver_id, "Driver disconnected");
        } else {
            debug!(driver_id, "Superseded driver stream closed");
        }
    }

    /// Wait for the next offer that still refers to a pending ride.
    ///
    /// Returns `None` once the session has been closed.
    pub async fn next_offer(&self, session: &DriverSession) -> Option<RideOffer> {
        loop {
            let offer = session.next_offer().await?;
            let still_pending = self
                .inner
                .rides
                .get_ride(offer.ride_id)
                .await
                .is_some_and(|ride| ride.is_pending());
            if still_pending {
                return Some(offer);
            }
            debug!(
                driver_id = session.driver_id(),
                ride_id = offer.ride_id,
                "Skipping stale offer"
            );
        }
    }

    // -- Rider stream -------------------------------------------------------

    /// Open the rider's update channel, replacing any previous one.
    pub async fn subscribe_rider(&self, rider_id: RiderId) -> RiderSubscription {
        let subscription = self.inner.riders.subscribe(rider_id).await;
        info!(rider_id, "Rider subscribed for ride updates");
        subscription
    }

    pub async fn unsubscribe_rider(&self, subscription: &RiderSubscription) {
        let rider_id = subscription.rider_id();
        if self.inner.riders.unsubscribe(subscription).await {
            info!(rider_id, "Rider disconnected");
        } else {
            debug!(rider_id, "Superseded rider stream closed");
        }
    }

    // -- Internals ----------------------------------------------------------

    /// Timer callback: auto-reject the ride if nobody took it.
    async fn expire_ride(&self, ride_id: RideId, waited: Duration) {
        let Some(mut ride) = self.inner.rides.lock_ride(ride_id).await else {
            debug!(ride_id, "Timeout fired for evicted ride");
            return;
        };
        if !ride.auto_reject() {
            debug!(ride_id, status = %ride.status(), "Timeout fired after ride was resolved");
            return;
        }

        info!(ride_id, rider_id = ride.rider_id, "Ride auto-rejected, no driver accepted in time");
        let message = format!(
            "No drivers accepted the ride within {}.",
            describe_wait(waited)
        );
        self.notify_rider(&ride, message).await;
    }

    /// Push the ride's current status to its rider. A missing subscriber is
    /// not an error: the rider can still poll the status.
    async fn notify_rider(&self, ride: &Ride, message: String) {
        let update = RideUpdate {
            ride_id: ride.ride_id,
            status: ride.status(),
            message,
        };
        if let Err(e) = self.inner.riders.push(ride.rider_id, update).await {
            debug!(
                ride_id = ride.ride_id,
                rider_id = ride.rider_id,
                error = %e,
                "Rider update not delivered"
            );
        }
    }
}

/// Render a wait duration for a rider-facing message.
fn describe_wait(waited: Duration) -> String {
    if waited.subsec_nanos() == 0 {
        format!("{} seconds", waited.as_secs())
    } else {
        format!("{waited:?}")
    }
}

// ---------------------------------------------------------------------------
// Processor trait implementations
// ---------------------------------------------------------------------------

impl Processor<RequestRide> for Dispatcher {
    type Output = Ride;
    type Error = Infallible;

    #[tracing::instrument(skip_all, name = "Dispatch:RequestRide", fields(rider_id = request.rider_id))]
    async fn process(&self, request: RequestRide) -> Result<Ride, Infallible> {
        let offer_timeout = self.inner.config.read().offer_timeout;
        let ride = self
            .inner
            .rides
            .create_ride(request.rider_id, request.pickup, request.destination)
            .await;
        let ride_id = ride.ride_id;

        info!(
            ride_id,
            rider_id = ride.rider_id,
            pickup = %ride.pickup,
            destination = %ride.destination,
            "Received ride request"
        );

        // Offers go out while the ride is still locked, so every queued offer
        // refers to a ride that was pending at enqueue time.
        let offered = self.inner.drivers.broadcast_offer(&RideOffer::from(&*ride)).await;
        debug!(ride_id, drivers = offered, "Broadcast ride offer");

        let dispatcher = self.clone();
        self.inner
            .timeouts
            .arm(ride_id, offer_timeout, async move {
                dispatcher.expire_ride(ride_id, offer_timeout).await;
            })
            .await;

        Ok(ride.clone())
    }
}

impl Processor<GetRideStatus> for Dispatcher {
    type Output = RideStatus;
    type Error = DispatchError;

    #[tracing::instrument(skip_all, name = "Dispatch:GetRideStatus", fields(ride_id = query.ride_id))]
    async fn process(&self, query: GetRideStatus) -> Result<RideStatus, DispatchError> {
        self.inner
            .rides
            .get_ride(query.ride_id)
            .await
            .map(|ride| ride.status())
            .ok_or(DispatchError::NotFound)
    }
}

impl Processor<AcceptRide> for Dispatcher {
    type Output = ();
    type Error = DispatchError;

    #[tracing::instrument(skip_all, name = "Dispatch:AcceptRide", fields(ride_id = request.ride_id, driver_id = request.driver_id))]
    async fn process(&self, request: AcceptRide) -> Result<(), DispatchError> {
        let AcceptRide { ride_id, driver_id } = request;
        let Some(mut ride) = self.inner.rides.lock_ride(ride_id).await else {
            debug!(ride_id, driver_id, "Accept for unknown ride");
            return Err(DispatchError::RideUnavailable);
        };
        if !ride.accept(driver_id) {
            debug!(ride_id, driver_id, status = %ride.status(), "Accept lost, ride not pending");
            return Err(DispatchError::RideUnavailable);
        }

        self.inner.timeouts.cancel(ride_id).await;
        if !self
            .inner
            .drivers
            .set_availability(driver_id, Availability::OnRide)
            .await
        {
            debug!(driver_id, "Accepting driver has no open stream");
        }

        info!(ride_id, driver_id, rider_id = ride.rider_id, "Ride accepted");
        self.notify_rider(
            &ride,
            format!("Your ride has been accepted by driver {driver_id}"),
        )
        .await;
        Ok(())
    }
}

impl Processor<RejectRide> for Dispatcher {
    type Output = ();
    type Error = DispatchError;

    #[tracing::instrument(skip_all, name = "Dispatch:RejectRide", fields(ride_id = request.ride_id, driver_id = request.driver_id))]
    async fn process(&self, request: RejectRide) -> Result<(), DispatchError> {
        let RejectRide { ride_id, driver_id } = request;
        let pending = self
            .inner
            .rides
            .mutate_ride(ride_id, |ride| ride.is_pending())
            .await
            .unwrap_or(false);
        if !pending {
            return Err(DispatchError::RideUnavailable);
        }
        debug!(ride_id, driver_id, "Ride declined by driver");
        Ok(())
    }
}

impl Processor<CompleteRide> for Dispatcher {
    type Output = ();
    type Error = DispatchError;

    #[tracing::instrument(skip_all, name = "Dispatch:CompleteRide", fields(ride_id = request.ride_id, driver_id = request.driver_id))]
    async fn process(&self, request: CompleteRide) -> Result<(), DispatchError> {
        let CompleteRide { ride_id, driver_id } = request;
        let Some(mut ride) = self.inner.rides.lock_ride(ride_id).await else {
            return Err(DispatchError::RideUnavailable);
        };
        if let Err(e) = ride.complete(driver_id) {
            debug!(ride_id, driver_id, error = %e, "Completion refused");
            return Err(e);
        }

        self.inner
            .drivers
            .set_availability(driver_id, Availability::Available)
            .await;

        info!(ride_id, driver_id, rider_id = ride.rider_id, "Ride completed");
        self.notify_rider(
            &ride,
            format!("Your ride has been completed by driver {driver_id}"),
        )
        .await;
        Ok(())
    }
}
