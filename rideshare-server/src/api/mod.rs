//! HTTP and WebSocket API.
//!
//! # Endpoints
//!
//! - `POST /rides`                  – request a ride
//! - `GET  /rides/{ride_id}/status` – poll ride status
//! - `POST /rides/{ride_id}/accept` – driver accepts a pending ride
//! - `POST /rides/{ride_id}/reject` – driver declines a pending ride
//! - `POST /rides/{ride_id}/complete` – assigned driver finishes a ride
//! - `GET  /riders/{rider_id}/ws`   – rider update stream
//! - `GET  /drivers/ws`             – driver offer stream

mod drivers;
mod riders;
mod rides;
mod ws;

use crate::state::AppState;
use axum::Router;

/// Build the API router, to be nested under `/api/v1`.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(rides::router())
        .merge(riders::router())
        .merge(drivers::router())
}
