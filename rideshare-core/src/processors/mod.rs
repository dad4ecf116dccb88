//! Processors that drive the dispatch engine.
//!
//! - `Dispatcher`: handles ride requests, accepts, rejects and completions
//! - `TimeoutManager`: fires the per-ride auto-reject timer
//! - `RideJanitor`: evicts resolved rides once their retention has passed

pub mod dispatcher;
pub mod ride_janitor;
pub mod timeout_manager;

pub use dispatcher::{
    AcceptRide, CompleteRide, Dispatcher, GetRideStatus, RejectRide, RequestRide,
};
pub use ride_janitor::RideJanitor;
pub use timeout_manager::TimeoutManager;
