//! Driver client: receive ride offers and answer them.

use futures_util::SinkExt;
use reqwest::Client;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

use super::{ClientError, Socket, next_json, parse_response, websocket_url};
use crate::objects::{
    ActionResponse, DriverClientMessage, DriverId, DriverServerMessage, Location, RideActionBody,
    RideId,
};

/// Typed client for the driver-facing endpoints.
///
/// The client is bound to one driver id; every action is sent on its behalf.
#[derive(Debug, Clone)]
pub struct DriverClient {
    http: Client,
    base_url: Url,
    driver_id: DriverId,
}

impl DriverClient {
    /// Create a new `DriverClient` acting as `driver_id`.
    pub fn new(base_url: Url, driver_id: DriverId) -> Self {
        Self {
            http: Client::new(),
            base_url,
            driver_id,
        }
    }

    /// Replace the default `reqwest::Client` with a custom one.
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    pub fn driver_id(&self) -> DriverId {
        self.driver_id
    }

    /// `GET /api/v1/drivers/ws` – connect, introduce ourselves and start
    /// receiving offers.
    pub async fn subscribe_offers(&self, location: Location) -> Result<OfferStream, ClientError> {
        let url = websocket_url(&self.base_url, "/api/v1/drivers/ws")?;
        let (mut socket, _) = tokio_tungstenite::connect_async(url.as_str()).await?;

        let hello = DriverClientMessage::Hello {
            driver_id: self.driver_id,
            location,
        };
        socket
            .send(Message::Text(serde_json::to_string(&hello)?))
            .await?;

        Ok(OfferStream { socket })
    }

    /// `POST /api/v1/rides/{ride_id}/accept`
    pub async fn accept_ride(&self, ride_id: RideId) -> Result<ActionResponse, ClientError> {
        self.act(ride_id, "accept").await
    }

    /// `POST /api/v1/rides/{ride_id}/reject`
    pub async fn reject_ride(&self, ride_id: RideId) -> Result<ActionResponse, ClientError> {
        self.act(ride_id, "reject").await
    }

    /// `POST /api/v1/rides/{ride_id}/complete`
    pub async fn complete_ride(&self, ride_id: RideId) -> Result<ActionResponse, ClientError> {
        self.act(ride_id, "complete").await
    }

    async fn act(&self, ride_id: RideId, action: &str) -> Result<ActionResponse, ClientError> {
        let url = self
            .base_url
            .join(&format!("/api/v1/rides/{ride_id}/{action}"))?;
        let body = RideActionBody {
            driver_id: self.driver_id,
        };

        let resp = self.http.post(url).json(&body).send().await?;
        parse_response(resp).await
    }
}

/// An open driver offer stream.
pub struct OfferStream {
    socket: Socket,
}

impl OfferStream {
    /// Wait for the next offer. Returns `None` once the server closes the
    /// stream.
    pub async fn next_offer(&mut self) -> Option<Result<DriverServerMessage, ClientError>> {
        next_json(&mut self.socket).await
    }

    /// Close the stream. The server unregisters the driver and drops any
    /// offers still queued for it.
    pub async fn close(mut self) -> Result<(), ClientError> {
        self.socket.close(None).await?;
        Ok(())
    }
}
