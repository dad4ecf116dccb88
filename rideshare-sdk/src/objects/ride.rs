//! Ride request and response types.
//!
//! These are the API/DTO shapes of the unary ride operations. The engine's
//! own ride record lives in `rideshare-core::entities`.

use serde::{Deserialize, Serialize};

/// Server-assigned ride identifier. Monotonically increasing, never reused.
pub type RideId = u64;
/// Rider identifier, supplied by the (already authenticated) caller.
pub type RiderId = u64;
/// Driver identifier, supplied by the driver when it connects.
pub type DriverId = u64;

/// A latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.latitude, self.longitude)
    }
}

/// Ride status as it appears on the wire.
///
/// `NotFound` is a sentinel returned only by the status lookup; it is never
/// the stored status of a ride.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RideStatusName {
    Pending,
    Accepted,
    AutoRejected,
    Completed,
    NotFound,
}

impl std::fmt::Display for RideStatusName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RideStatusName::Pending => write!(f, "Pending"),
            RideStatusName::Accepted => write!(f, "Accepted"),
            RideStatusName::AutoRejected => write!(f, "AutoRejected"),
            RideStatusName::Completed => write!(f, "Completed"),
            RideStatusName::NotFound => write!(f, "NotFound"),
        }
    }
}

/// Request body for `POST /api/v1/rides`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestRideBody {
    pub rider_id: RiderId,
    pub pickup: Location,
    pub destination: Location,
}

/// Response returned after a ride has been requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RideResponse {
    pub ride_id: RideId,
    /// Always `Pending` for a freshly requested ride.
    pub status: RideStatusName,
    /// Unix timestamp of when the ride was requested.
    pub requested_at: i64,
}

/// Response of `GET /api/v1/rides/{ride_id}/status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RideStatusResponse {
    pub ride_id: RideId,
    pub status: RideStatusName,
}

/// Request body for the accept, reject and complete endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RideActionBody {
    pub driver_id: DriverId,
}

/// Outcome of a driver action.
///
/// A lost race is reported as `success: false`, not as an HTTP error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResponse {
    pub success: bool,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_vocabulary_on_the_wire() {
        let json = serde_json::to_string(&RideStatusName::AutoRejected).unwrap();
        assert_eq!(json, "\"AutoRejected\"");

        let parsed: RideStatusName = serde_json::from_str("\"NotFound\"").unwrap();
        assert_eq!(parsed, RideStatusName::NotFound);
        assert_eq!(parsed.to_string(), "NotFound");
    }

    #[test]
    fn test_request_body_shape() {
        let body: RequestRideBody = serde_json::from_str(
            r#"{"rider_id":3,"pickup":{"latitude":10.0,"longitude":20.0},"destination":{"latitude":11.0,"longitude":21.0}}"#,
        )
        .unwrap();
        assert_eq!(body.rider_id, 3);
        assert_eq!(body.pickup, Location::new(10.0, 20.0));
        assert_eq!(body.destination.to_string(), "(11, 21)");
    }
}
