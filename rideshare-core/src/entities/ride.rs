//! Ride records and the store that owns them.
//!
//! Each ride sits behind its own mutex, so transitions on unrelated rides
//! never contend. The outer map lock is only held long enough to find or
//! insert a ride's slot.

use crate::error::DispatchError;
use rideshare_sdk::objects::{DriverId, Location, RideId, RideStatusName, RiderId};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tokio::time::Instant;

/// Lifecycle status of a ride.
///
/// `Pending` moves to `Accepted` then `Completed`, or to `AutoRejected`
/// when nobody accepts in time. `Completed` and `AutoRejected` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RideStatus {
    Pending,
    Accepted,
    AutoRejected,
    Completed,
}

impl RideStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, RideStatus::AutoRejected | RideStatus::Completed)
    }
}

impl From<RideStatus> for RideStatusName {
    fn from(value: RideStatus) -> Self {
        match value {
            RideStatus::Pending => RideStatusName::Pending,
            RideStatus::Accepted => RideStatusName::Accepted,
            RideStatus::AutoRejected => RideStatusName::AutoRejected,
            RideStatus::Completed => RideStatusName::Completed,
        }
    }
}

impl std::fmt::Display for RideStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", RideStatusName::from(*self))
    }
}

/// A single ride record.
///
/// Status changes go through the compare-and-transition methods below so
/// that `driver_id` is set exactly when the status is `Accepted` or
/// `Completed`.
#[derive(Debug, Clone, PartialEq)]
pub struct Ride {
    pub ride_id: RideId,
    pub rider_id: RiderId,
    pub pickup: Location,
    pub destination: Location,
    status: RideStatus,
    driver_id: Option<DriverId>,
    pub requested_at: time::OffsetDateTime,
    resolved_at: Option<Instant>,
}

impl Ride {
    fn new(ride_id: RideId, rider_id: RiderId, pickup: Location, destination: Location) -> Self {
        Self {
            ride_id,
            rider_id,
            pickup,
            destination,
            status: RideStatus::Pending,
            driver_id: None,
            requested_at: time::OffsetDateTime::now_utc(),
            resolved_at: None,
        }
    }

    pub fn status(&self) -> RideStatus {
        self.status
    }

    /// The assigned driver, present only once the ride has been accepted.
    pub fn driver_id(&self) -> Option<DriverId> {
        self.driver_id
    }

    /// When the ride reached a terminal status, if it has.
    pub fn resolved_at(&self) -> Option<Instant> {
        self.resolved_at
    }

    pub fn is_pending(&self) -> bool {
        self.status == RideStatus::Pending
    }

    /// `Pending -> Accepted`, assigning `driver_id`.
    ///
    /// Returns `false` and leaves the ride untouched if it is not pending.
    pub fn accept(&mut self, driver_id: DriverId) -> bool {
        if !self.is_pending() {
            return false;
        }
        self.status = RideStatus::Accepted;
        self.driver_id = Some(driver_id);
        true
    }

    /// `Pending -> AutoRejected`.
    ///
    /// Returns `false` and leaves the ride untouched if it is not pending.
    pub fn auto_reject(&mut self) -> bool {
        if !self.is_pending() {
            return false;
        }
        self.status = RideStatus::AutoRejected;
        self.resolved_at = Some(Instant::now());
        true
    }

    /// `Accepted -> Completed`, only for the assigned driver.
    pub fn complete(&mut self, driver_id: DriverId) -> Result<(), DispatchError> {
        if self.status != RideStatus::Accepted {
            return Err(DispatchError::RideUnavailable);
        }
        if self.driver_id != Some(driver_id) {
            return Err(DispatchError::NotAssigned);
        }
        self.status = RideStatus::Completed;
        self.resolved_at = Some(Instant::now());
        Ok(())
    }
}

/// Exclusive access to one ride record.
pub type RideGuard = OwnedMutexGuard<Ride>;

/// Authoritative mapping of ride ids to ride records.
pub struct RideStore {
    next_id: AtomicU64,
    rides: RwLock<HashMap<RideId, Arc<Mutex<Ride>>>>,
}

impl RideStore {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            rides: RwLock::new(HashMap::new()),
        }
    }

    /// Allocate the next ride id and insert a `Pending` record.
    ///
    /// The record is returned already locked, so the caller can finish
    /// setting the ride up before any other mutator sees it.
    pub async fn create_ride(
        &self,
        rider_id: RiderId,
        pickup: Location,
        destination: Location,
    ) -> RideGuard {
        let ride_id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let slot = Arc::new(Mutex::new(Ride::new(ride_id, rider_id, pickup, destination)));
        // Nobody else can reach the slot yet, so this never waits.
        let guard = Arc::clone(&slot).lock_owned().await;
        self.rides.write().await.insert(ride_id, slot);
        guard
    }

    /// Lock a ride for a compare-and-transition.
    pub async fn lock_ride(&self, ride_id: RideId) -> Option<RideGuard> {
        let slot = self.rides.read().await.get(&ride_id).cloned()?;
        Some(slot.lock_owned().await)
    }

    /// Snapshot of a ride.
    pub async fn get_ride(&self, ride_id: RideId) -> Option<Ride> {
        self.lock_ride(ride_id).await.map(|ride| ride.clone())
    }

    /// Apply `f` to a ride under exclusive access.
    ///
    /// Returns `None` if the ride does not exist, otherwise whatever `f`
    /// returned (typically whether the transition was applied).
    pub async fn mutate_ride<T>(&self, ride_id: RideId, f: impl FnOnce(&mut Ride) -> T) -> Option<T> {
        let mut ride = self.lock_ride(ride_id).await?;
        Some(f(&mut ride))
    }

    /// Drop terminal rides that were resolved more than `retention` ago.
    ///
    /// Returns the number of evicted rides.
    pub async fn evict_resolved(&self, retention: Duration) -> usize {
        let slots: Vec<(RideId, Arc<Mutex<Ride>>)> = self
            .rides
            .read()
            .await
            .iter()
            .map(|(id, slot)| (*id, Arc::clone(slot)))
            .collect();

        let now = Instant::now();
        let mut expired = Vec::new();
        for (ride_id, slot) in slots {
            let ride = slot.lock().await;
            // Terminal rides never change again, so the decision stays valid
            // after the lock is released.
            if ride.status.is_terminal()
                && let Some(resolved_at) = ride.resolved_at
                && now.saturating_duration_since(resolved_at) >= retention
            {
                expired.push(ride_id);
            }
        }

        if expired.is_empty() {
            return 0;
        }

        let mut rides = self.rides.write().await;
        expired
            .into_iter()
            .filter(|ride_id| rides.remove(ride_id).is_some())
            .count()
    }

    pub async fn len(&self) -> usize {
        self.rides.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rides.read().await.is_empty()
    }
}

impl Default for RideStore {
    fn default() -> Self {
        Self::new()
    }
}
