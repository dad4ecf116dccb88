//! Rider update stream.

use axum::{
    Router,
    extract::{
        Path, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
    routing::get,
};
use rideshare_core::processors::Dispatcher;
use rideshare_sdk::objects::{RiderId, RiderServerMessage, WsCloseCode};

use crate::api::ws::{close_with, send_json};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/riders/{rider_id}/ws", get(rider_updates_ws))
}

/// `GET /riders/{rider_id}/ws` — WebSocket ride update stream.
///
/// Pushes a `ride_update` frame for every status change of the rider's
/// rides. A second connection for the same rider takes over; the older one
/// is closed with [`WsCloseCode::SUPERSEDED`].
async fn rider_updates_ws(
    state: State<AppState>,
    Path(rider_id): Path<RiderId>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let dispatcher = state.dispatcher.clone();
    ws.on_upgrade(move |socket| handle_rider_ws(socket, dispatcher, rider_id))
}

async fn handle_rider_ws(mut socket: WebSocket, dispatcher: Dispatcher, rider_id: RiderId) {
    let mut subscription = dispatcher.subscribe_rider(rider_id).await;

    loop {
        tokio::select! {
            update = subscription.recv() => {
                let Some(update) = update else {
                    close_with(&mut socket, WsCloseCode::SUPERSEDED, "superseded by a newer stream").await;
                    break;
                };
                let ride_id = update.ride_id;
                if send_json(&mut socket, &RiderServerMessage::from(update)).await.is_err() {
                    tracing::debug!(rider_id, ride_id, "WS: rider gone before update was sent");
                    break;
                }
            }

            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                    // Riders only listen; anything else is ignored.
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    dispatcher.unsubscribe_rider(&subscription).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ws::testing::{Client, connect, recv_close_code, recv_json, spawn_app, wait_until};
    use kanau::processor::Processor;
    use rideshare_core::processors::{AcceptRide, RequestRide};
    use rideshare_sdk::objects::{Location, RideStatusName};
    use std::net::SocketAddr;

    fn rider_ws(rider_id: RiderId) -> String {
        format!("/api/v1/riders/{rider_id}/ws")
    }

    async fn wait_subscribed(state: &AppState, rider_id: RiderId, subscribed: bool) {
        let dispatcher = state.dispatcher.clone();
        wait_until(|| {
            let dispatcher = dispatcher.clone();
            async move { dispatcher.riders().is_subscribed(rider_id).await == subscribed }
        })
        .await;
    }

    async fn subscribe(state: &AppState, addr: SocketAddr, rider_id: RiderId) -> Client {
        let socket = connect(addr, &rider_ws(rider_id)).await;
        wait_subscribed(state, rider_id, true).await;
        socket
    }

    async fn request_and_accept(state: &AppState, rider_id: RiderId, driver_id: u64) -> u64 {
        let ride = state
            .dispatcher
            .process(RequestRide {
                rider_id,
                pickup: Location::new(10.0, 20.0),
                destination: Location::new(11.0, 21.0),
            })
            .await
            .unwrap();
        state
            .dispatcher
            .process(AcceptRide {
                ride_id: ride.ride_id,
                driver_id,
            })
            .await
            .unwrap();
        ride.ride_id
    }

    #[tokio::test]
    async fn test_acceptance_is_pushed_to_rider() {
        let (state, addr) = spawn_app().await;
        let mut socket = subscribe(&state, addr, 3).await;

        let ride_id = request_and_accept(&state, 3, 5).await;

        let RiderServerMessage::RideUpdate {
            ride_id: updated,
            status,
            message,
        } = recv_json::<RiderServerMessage>(&mut socket).await;
        assert_eq!(updated, ride_id);
        assert_eq!(status, RideStatusName::Accepted);
        assert_eq!(message, "Your ride has been accepted by driver 5");
    }

    #[tokio::test]
    async fn test_second_subscription_supersedes_first() {
        let (state, addr) = spawn_app().await;
        let mut first = subscribe(&state, addr, 3).await;
        let mut second = connect(addr, &rider_ws(3)).await;

        assert_eq!(
            recv_close_code(&mut first).await,
            Some(WsCloseCode::SUPERSEDED)
        );

        let ride_id = request_and_accept(&state, 3, 5).await;
        let RiderServerMessage::RideUpdate { ride_id: updated, .. } =
            recv_json::<RiderServerMessage>(&mut second).await;
        assert_eq!(updated, ride_id);
    }

    #[tokio::test]
    async fn test_closed_stream_unsubscribes_rider() {
        let (state, addr) = spawn_app().await;
        let mut socket = subscribe(&state, addr, 3).await;
        socket.close(None).await.unwrap();

        wait_subscribed(&state, 3, false).await;
    }
}
