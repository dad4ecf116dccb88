//! Event type definitions.

use crate::entities::{Ride, RideStatus};
use rideshare_sdk::objects::{
    DriverServerMessage, Location, RideId, RiderId, RiderServerMessage,
};

/// A pending ride offered to a driver.
///
/// The ride was `Pending` when the offer was queued but may have been
/// resolved since; consumers must re-check before presenting it.
#[derive(Debug, Clone, PartialEq)]
pub struct RideOffer {
    pub ride_id: RideId,
    pub rider_id: RiderId,
    pub pickup: Location,
    pub destination: Location,
}

impl From<&Ride> for RideOffer {
    fn from(ride: &Ride) -> Self {
        Self {
            ride_id: ride.ride_id,
            rider_id: ride.rider_id,
            pickup: ride.pickup,
            destination: ride.destination,
        }
    }
}

impl From<RideOffer> for DriverServerMessage {
    fn from(offer: RideOffer) -> Self {
        DriverServerMessage::RideOffer {
            ride_id: offer.ride_id,
            rider_id: offer.rider_id,
            pickup: offer.pickup,
            destination: offer.destination,
        }
    }
}

/// A status transition reported to the ride's rider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RideUpdate {
    pub ride_id: RideId,
    pub status: RideStatus,
    pub message: String,
}

impl From<RideUpdate> for RiderServerMessage {
    fn from(update: RideUpdate) -> Self {
        RiderServerMessage::RideUpdate {
            ride_id: update.ride_id,
            status: update.status.into(),
            message: update.message,
        }
    }
}
