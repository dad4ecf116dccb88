//! HTTP and WebSocket clients for the rideshare dispatch API.
//!
//! Gated behind the `client` cargo feature so downstream crates that only
//! need the shared types do not pull in `reqwest` or `tokio-tungstenite`.

mod driver;
mod rider;

pub use driver::{DriverClient, OfferStream};
pub use rider::{RideUpdateStream, RiderClient};

use futures_util::StreamExt;
use reqwest::StatusCode;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use url::Url;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Errors produced by the SDK clients.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport-level failure (DNS, TLS, connection reset, …).
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// WebSocket handshake or framing failure.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// The server returned a non-2xx status code.
    #[error("api error: status {status}, body: {body}")]
    Api { status: StatusCode, body: String },

    /// Response body could not be deserialized.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The base URL could not be joined with the endpoint path.
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    /// The base URL has a scheme that cannot be upgraded to a WebSocket.
    #[error("unsupported url scheme: {0}")]
    UnsupportedScheme(String),
}

async fn parse_response<T: serde::de::DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, ClientError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(ClientError::Api { status, body });
    }
    let bytes = resp.bytes().await?;
    serde_json::from_slice(&bytes).map_err(ClientError::Json)
}

/// Join `path` onto `base_url` and switch `http(s)` to `ws(s)`.
fn websocket_url(base_url: &Url, path: &str) -> Result<Url, ClientError> {
    let mut url = base_url.join(path)?;
    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => return Err(ClientError::UnsupportedScheme(other.to_string())),
    };
    url.set_scheme(scheme)
        .map_err(|_| ClientError::UnsupportedScheme(scheme.to_string()))?;
    Ok(url)
}

/// Read the next JSON text frame from `socket`.
///
/// Returns `None` once the server closes the stream.
async fn next_json<T: serde::de::DeserializeOwned>(
    socket: &mut Socket,
) -> Option<Result<T, ClientError>> {
    loop {
        match socket.next().await? {
            Ok(Message::Text(text)) => {
                return Some(serde_json::from_str(&text).map_err(ClientError::Json));
            }
            Ok(Message::Close(_)) => return None,
            Ok(_) => continue,
            Err(e) => return Some(Err(e.into())),
        }
    }
}
