//! Dispatch-level error taxonomy.
//!
//! Every variant is an ordinary, expected outcome that is returned to the
//! caller. None of them indicates a broken process.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// The referenced ride does not exist.
    #[error("ride not found")]
    NotFound,

    /// The ride's current status does not allow the requested transition
    /// (already accepted, expired, completed, or never existed). This is how
    /// the loser of an accept race is told.
    #[error("ride not available")]
    RideUnavailable,

    /// A completion was attempted by a driver who is not assigned to the ride.
    #[error("ride is not assigned to this driver")]
    NotAssigned,

    /// The subscriber's stream is gone; delivery was skipped.
    #[error("subscriber disconnected")]
    SubscriberDisconnected,
}
