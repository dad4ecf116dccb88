//! WebSocket message types for the two push streams.
//!
//! # Rider stream (`GET /api/v1/riders/{rider_id}/ws`)
//!
//! The server pushes a [`RiderServerMessage::RideUpdate`] for every event
//! the dispatcher emits for that rider, in emission order. A second
//! subscription for the same rider replaces the first; the old stream is
//! closed with [`WsCloseCode::SUPERSEDED`].
//!
//! # Driver stream (`GET /api/v1/drivers/ws`)
//!
//! 1. The client sends exactly one [`DriverClientMessage::Hello`] carrying
//!    its driver id and current location.
//! 2. The server pushes a [`DriverServerMessage::RideOffer`] for each
//!    pending ride offered to the driver while it is available.
//! 3. If the first frame is missing or malformed the server closes the
//!    connection with [`WsCloseCode::HELLO_REQUIRED`].

use serde::{Deserialize, Serialize};

use super::ride::{DriverId, Location, RideId, RideStatusName, RiderId};

/// Server-to-rider WebSocket message.
///
/// ```json
/// {"type":"ride_update","ride_id":1,"status":"Accepted","message":"..."}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RiderServerMessage {
    /// A status transition of one of the rider's rides.
    RideUpdate {
        ride_id: RideId,
        status: RideStatusName,
        message: String,
    },
}

/// Driver-to-server WebSocket message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DriverClientMessage {
    /// Identifies the driver. Must be the first frame of the stream.
    Hello {
        driver_id: DriverId,
        location: Location,
    },
}

/// Server-to-driver WebSocket message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DriverServerMessage {
    /// A pending ride the driver may accept or reject.
    RideOffer {
        ride_id: RideId,
        rider_id: RiderId,
        pickup: Location,
        destination: Location,
    },

    /// A server-side error. The server may close the connection afterwards.
    Error { code: u16, reason: String },
}

/// Well-known WebSocket close codes used by both streams.
///
/// Codes in the 4000–4999 range are reserved for application use by
/// [RFC 6455 §7.4.2](https://www.rfc-editor.org/rfc/rfc6455#section-7.4.2).
pub struct WsCloseCode;

impl WsCloseCode {
    /// An unexpected server-side error prevented the connection from
    /// continuing.
    pub const INTERNAL_ERROR: u16 = 1011;

    /// The driver stream did not start with a valid `hello` frame.
    pub const HELLO_REQUIRED: u16 = 4000;

    /// A newer subscription for the same rider or driver took over.
    pub const SUPERSEDED: u16 = 4009;
}
