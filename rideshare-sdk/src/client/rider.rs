//! Rider client: request rides, look up their status and follow updates.

use reqwest::Client;
use url::Url;

use super::{ClientError, Socket, next_json, parse_response, websocket_url};
use crate::objects::{
    Location, RequestRideBody, RideId, RideResponse, RideStatusResponse, RiderId,
    RiderServerMessage,
};

/// Typed client for the rider-facing endpoints.
#[derive(Debug, Clone)]
pub struct RiderClient {
    http: Client,
    base_url: Url,
}

impl RiderClient {
    /// Create a new `RiderClient` for the server rooted at `base_url`.
    pub fn new(base_url: Url) -> Self {
        Self {
            http: Client::new(),
            base_url,
        }
    }

    /// Replace the default `reqwest::Client` with a custom one.
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    /// `POST /api/v1/rides` – request a ride. Returns as soon as the ride
    /// is created; acceptance arrives later on the update stream.
    pub async fn request_ride(
        &self,
        rider_id: RiderId,
        pickup: Location,
        destination: Location,
    ) -> Result<RideResponse, ClientError> {
        let url = self.base_url.join("/api/v1/rides")?;
        let body = RequestRideBody {
            rider_id,
            pickup,
            destination,
        };

        let resp = self.http.post(url).json(&body).send().await?;
        parse_response(resp).await
    }

    /// `GET /api/v1/rides/{ride_id}/status` – look up the current status.
    ///
    /// An unknown ride is not an error: the response carries the
    /// `NotFound` status.
    pub async fn get_ride_status(&self, ride_id: RideId) -> Result<RideStatusResponse, ClientError> {
        let url = self
            .base_url
            .join(&format!("/api/v1/rides/{ride_id}/status"))?;

        let resp = self.http.get(url).send().await?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            let bytes = resp.bytes().await?;
            return serde_json::from_slice(&bytes).map_err(ClientError::Json);
        }
        parse_response(resp).await
    }

    /// `GET /api/v1/riders/{rider_id}/ws` – open the rider update stream.
    pub async fn subscribe_updates(
        &self,
        rider_id: RiderId,
    ) -> Result<RideUpdateStream, ClientError> {
        let url = websocket_url(&self.base_url, &format!("/api/v1/riders/{rider_id}/ws"))?;
        let (socket, _) = tokio_tungstenite::connect_async(url.as_str()).await?;
        Ok(RideUpdateStream { socket })
    }
}

/// An open rider update stream.
pub struct RideUpdateStream {
    socket: Socket,
}

impl RideUpdateStream {
    /// Wait for the next message. Returns `None` once the server closes
    /// the stream.
    pub async fn next_update(&mut self) -> Option<Result<RiderServerMessage, ClientError>> {
        next_json(&mut self.socket).await
    }
}
