//! Shared WebSocket helpers.

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use rideshare_sdk::objects::WsCloseCode;

/// Serialize `value` as JSON and send it as a text WebSocket frame.
///
/// A frame that cannot be serialized closes the stream with
/// [`WsCloseCode::INTERNAL_ERROR`]. Returns `Err(())` if nothing was sent.
pub async fn send_json<T: serde::Serialize>(socket: &mut WebSocket, value: &T) -> Result<(), ()> {
    let json = match serde_json::to_string(value) {
        Ok(json) => json,
        Err(e) => {
            tracing::error!(error = %e, "WS: failed to serialize frame");
            close_with(socket, WsCloseCode::INTERNAL_ERROR, "internal error").await;
            return Err(());
        }
    };
    socket
        .send(Message::Text(json.into()))
        .await
        .map_err(|_| ())
}

/// Send a close frame, ignoring a client that is already gone.
pub async fn close_with(socket: &mut WebSocket, code: u16, reason: &'static str) {
    let _ = socket
        .send(Message::Close(Some(CloseFrame {
            code,
            reason: reason.into(),
        })))
        .await;
}


#[cfg(test)]
mod tests {
    use super::testing::{connect, recv_close_code, serve};
    use super::*;
    use axum::{Router, extract::ws::WebSocketUpgrade, response::IntoResponse, routing::get};
    use std::collections::HashMap;

    async fn unserializable_frame(ws: WebSocketUpgrade) -> impl IntoResponse {
        ws.on_upgrade(|mut socket| async move {
            // JSON object keys must be strings.
            let frame = HashMap::from([((1u8, 2u8), 3u8)]);
            let _ = send_json(&mut socket, &frame).await;
        })
    }

    #[tokio::test]
    async fn test_unserializable_frame_closes_with_internal_error() {
        let addr = serve(Router::new().route("/frame", get(unserializable_frame))).await;
        let mut client = connect(addr, "/frame").await;
        assert_eq!(
            recv_close_code(&mut client).await,
            Some(WsCloseCode::INTERNAL_ERROR)
        );
    }
}
