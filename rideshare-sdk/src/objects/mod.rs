pub mod ride;
pub mod ws;

pub use ride::{
    ActionResponse, DriverId, Location, RequestRideBody, RideActionBody, RideId, RideResponse,
    RideStatusName, RideStatusResponse, RiderId,
};
pub use ws::{DriverClientMessage, DriverServerMessage, RiderServerMessage, WsCloseCode};
