//! Driver offer stream.

use axum::{
    Router,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
    routing::get,
};
use rideshare_core::processors::Dispatcher;
use rideshare_sdk::objects::{DriverClientMessage, DriverServerMessage, WsCloseCode};
use std::time::Duration;

use crate::api::ws::{close_with, send_json};
use crate::state::AppState;

/// How long a new driver stream may stay silent before its `hello`.
const HELLO_TIMEOUT: Duration = Duration::from_secs(5);

pub fn router() -> Router<AppState> {
    Router::new().route("/drivers/ws", get(driver_offers_ws))
}

/// `GET /drivers/ws` — WebSocket ride offer stream.
///
/// The client must open with a `hello` frame carrying its driver id. From
/// then on the server pushes a `ride_offer` frame for every pending ride the
/// driver may take, one at a time and in request order.
async fn driver_offers_ws(state: State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    let dispatcher = state.dispatcher.clone();
    ws.on_upgrade(move |socket| handle_driver_ws(socket, dispatcher))
}

async fn handle_driver_ws(mut socket: WebSocket, dispatcher: Dispatcher) {
    let Some(DriverClientMessage::Hello {
        driver_id,
        location,
    }) = read_hello(&mut socket).await
    else {
        let _ = send_json(
            &mut socket,
            &DriverServerMessage::Error {
                code: WsCloseCode::HELLO_REQUIRED,
                reason: "Driver information is required".to_string(),
            },
        )
        .await;
        close_with(&mut socket, WsCloseCode::HELLO_REQUIRED, "driver information is required").await;
        return;
    };

    tracing::debug!(driver_id, %location, "WS: driver hello");
    let session = dispatcher.connect_driver(driver_id).await;

    // The offer future is kept across iterations: dropping it midway could
    // lose an offer that was already taken off the queue.
    let mut next_offer = Box::pin(dispatcher.next_offer(&session));

    loop {
        tokio::select! {
            offer = &mut next_offer => {
                let Some(offer) = offer else {
                    close_with(&mut socket, WsCloseCode::SUPERSEDED, "superseded by a newer stream").await;
                    break;
                };
                let ride_id = offer.ride_id;
                if send_json(&mut socket, &DriverServerMessage::from(offer)).await.is_err() {
                    tracing::debug!(driver_id, ride_id, "WS: driver gone before offer was sent");
                    break;
                }
                tracing::debug!(driver_id, ride_id, "Offer delivered");
                next_offer.set(dispatcher.next_offer(&session));
            }

            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                    Some(Ok(Message::Text(text))) => {
                        tracing::warn!(driver_id, frame = %text.as_str(), "WS: unexpected driver frame");
                    }
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    drop(next_offer);
    dispatcher.disconnect_driver(&session).await;
}

/// Wait for the opening `hello` frame.
///
/// Returns `None` if the stream closes first, the frame is malformed, or
/// nothing arrives within [`HELLO_TIMEOUT`].
async fn read_hello(socket: &mut WebSocket) -> Option<DriverClientMessage> {
    match tokio::time::timeout(HELLO_TIMEOUT, recv_hello(socket)).await {
        Ok(hello) => hello,
        Err(_) => {
            tracing::warn!(timeout = ?HELLO_TIMEOUT, "WS: no driver hello in time");
            None
        }
    }
}

async fn recv_hello(socket: &mut WebSocket) -> Option<DriverClientMessage> {
    loop {
        match socket.recv().await? {
            Ok(Message::Text(text)) => {
                return serde_json::from_str(text.as_str())
                    .map_err(|e| tracing::warn!(error = %e, "WS: malformed driver hello"))
                    .ok();
            }
            Ok(Message::Ping(_) | Message::Pong(_)) => continue,
            Ok(_) | Err(_) => return None,
        }
    }
}
