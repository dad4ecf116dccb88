//! Shared wire types and clients for the rideshare dispatch server.
//!
//! The [`objects`] module is always available. The typed HTTP and
//! WebSocket clients in `client` are gated behind the `client` feature.

pub mod objects;

#[cfg(feature = "client")]
pub mod client;
