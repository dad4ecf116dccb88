//! Events pushed from the dispatcher to connected subscribers.
//!
//! # Delivery paths
//!
//! 1. `RideOffer` -> every available driver's offer queue
//!    (see [`crate::entities::DriverRegistry`])
//! 2. `RideUpdate` -> the requesting rider's notification channel
//!    (see [`RiderChannels`])
//!
//! Producers never block on a slow subscriber: offer queues and rider
//! channels are both unbounded and consumed by the subscriber's stream.

pub mod channels;
pub mod types;

pub use channels::{RiderChannels, RiderSubscription};
pub use types::{RideOffer, RideUpdate};
