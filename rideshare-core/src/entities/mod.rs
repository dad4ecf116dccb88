//! In-memory entities owned by the dispatch engine.
//!
//! Lock order for operations that touch more than one entity:
//! ride record first, then the driver registry, then a single driver slot.
//! Nothing may acquire a ride lock while holding a driver lock.

pub mod driver;
pub mod ride;

pub use driver::{Availability, DriverRegistry, DriverSession};
pub use ride::{Ride, RideGuard, RideStatus, RideStore};
