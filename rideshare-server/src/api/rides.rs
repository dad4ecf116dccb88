//! Ride handlers.
//!
//! Unary operations for riders (request, poll) and drivers (accept,
//! reject, complete). Losing an accept race is an ordinary outcome and is
//! reported as `success: false` with `200 OK`.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use kanau::processor::Processor;
use rideshare_core::DispatchError;
use rideshare_core::entities::Ride;
use rideshare_core::processors::{AcceptRide, CompleteRide, GetRideStatus, RejectRide, RequestRide};
use rideshare_sdk::objects::{
    ActionResponse, RequestRideBody, RideActionBody, RideId, RideResponse, RideStatusName,
    RideStatusResponse,
};

use crate::state::AppState;

/// Build the ride router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/rides", post(request_ride))
        .route("/rides/{ride_id}/status", get(get_ride_status))
        .route("/rides/{ride_id}/accept", post(accept_ride))
        .route("/rides/{ride_id}/reject", post(reject_ride))
        .route("/rides/{ride_id}/complete", post(complete_ride))
}

fn to_response(ride: &Ride) -> RideResponse {
    RideResponse {
        ride_id: ride.ride_id,
        status: ride.status().into(),
        requested_at: ride.requested_at.unix_timestamp(),
    }
}

fn succeeded(message: &str) -> Json<ActionResponse> {
    Json(ActionResponse {
        success: true,
        message: message.to_string(),
    })
}

// ---------------------------------------------------------------------------
// POST /rides
// ---------------------------------------------------------------------------

/// `POST /rides` — request a ride.
///
/// Returns immediately with the new ride in `Pending`; the outcome arrives
/// on the rider's update stream.
async fn request_ride(
    state: State<AppState>,
    Json(body): Json<RequestRideBody>,
) -> impl IntoResponse {
    let request = RequestRide {
        rider_id: body.rider_id,
        pickup: body.pickup,
        destination: body.destination,
    };
    let ride = match state.dispatcher.process(request).await {
        Ok(ride) => ride,
        Err(never) => match never {},
    };
    (StatusCode::CREATED, Json(to_response(&ride)))
}

// ---------------------------------------------------------------------------
// GET /rides/{ride_id}/status
// ---------------------------------------------------------------------------

async fn get_ride_status(
    state: State<AppState>,
    Path(ride_id): Path<RideId>,
) -> Result<Json<RideStatusResponse>, RideApiError> {
    let status = state
        .dispatcher
        .process(GetRideStatus { ride_id })
        .await
        .map_err(|_| RideApiError::NotFound { ride_id })?;
    Ok(Json(RideStatusResponse {
        ride_id,
        status: status.into(),
    }))
}

// ---------------------------------------------------------------------------
// POST /rides/{ride_id}/{accept,reject,complete}
// ---------------------------------------------------------------------------

async fn accept_ride(
    state: State<AppState>,
    Path(ride_id): Path<RideId>,
    Json(body): Json<RideActionBody>,
) -> Result<Json<ActionResponse>, RideApiError> {
    state
        .dispatcher
        .process(AcceptRide {
            ride_id,
            driver_id: body.driver_id,
        })
        .await
        .map_err(|e| RideApiError::declined(e, "Ride not available."))?;
    Ok(succeeded("Ride accepted."))
}

async fn reject_ride(
    state: State<AppState>,
    Path(ride_id): Path<RideId>,
    Json(body): Json<RideActionBody>,
) -> Result<Json<ActionResponse>, RideApiError> {
    state
        .dispatcher
        .process(RejectRide {
            ride_id,
            driver_id: body.driver_id,
        })
        .await
        .map_err(|e| RideApiError::declined(e, "Ride not available."))?;
    Ok(succeeded("Ride rejected."))
}

async fn complete_ride(
    state: State<AppState>,
    Path(ride_id): Path<RideId>,
    Json(body): Json<RideActionBody>,
) -> Result<Json<ActionResponse>, RideApiError> {
    state
        .dispatcher
        .process(CompleteRide {
            ride_id,
            driver_id: body.driver_id,
        })
        .await
        .map_err(|e| {
            RideApiError::declined(e, "Ride not available or not assigned to this driver.")
        })?;
    Ok(succeeded("Ride completed successfully."))
}

// ---------------------------------------------------------------------------
// Error handling
// ---------------------------------------------------------------------------

/// Errors that can occur in ride handlers.
#[derive(Debug)]
enum RideApiError {
    /// The ride does not exist. Answered with the `NotFound` status sentinel.
    NotFound { ride_id: RideId },
    /// The dispatcher refused the action.
    Declined { message: &'static str },
}

impl RideApiError {
    fn declined(error: DispatchError, message: &'static str) -> Self {
        tracing::debug!(error = %error, "Ride action declined");
        RideApiError::Declined { message }
    }
}

impl IntoResponse for RideApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            RideApiError::NotFound { ride_id } => (
                StatusCode::NOT_FOUND,
                Json(RideStatusResponse {
                    ride_id,
                    status: RideStatusName::NotFound,
                }),
            )
                .into_response(),
            RideApiError::Declined { message } => (
                StatusCode::OK,
                Json(ActionResponse {
                    success: false,
                    message: message.to_string(),
                }),
            )
                .into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::server::build_router;
    use crate::state::AppState;
    use axum::Router;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use rideshare_core::config::{ConfigStore, DispatchConfig};
    use rideshare_sdk::objects::{
        ActionResponse, Location, RequestRideBody, RideActionBody, RideResponse, RideStatusName,
        RideStatusResponse,
    };
    use serde::Serialize;
    use serde::de::DeserializeOwned;
    use tower::ServiceExt;

    fn app() -> Router {
        build_router(AppState::new(ConfigStore::new(DispatchConfig::default())))
    }

    async fn call<T: DeserializeOwned>(
        app: &Router,
        method: &str,
        uri: &str,
        body: Option<&impl Serialize>,
    ) -> (StatusCode, T) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(body).unwrap()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn request_ride(app: &Router) -> RideResponse {
        let body = RequestRideBody {
            rider_id: 1,
            pickup: Location::new(10.0, 20.0),
            destination: Location::new(11.0, 21.0),
        };
        let (status, ride) = call(app, "POST", "/api/v1/rides", Some(&body)).await;
        assert_eq!(status, StatusCode::CREATED);
        ride
    }

    async fn act(app: &Router, ride_id: u64, action: &str, driver_id: u64) -> ActionResponse {
        let uri = format!("/api/v1/rides/{ride_id}/{action}");
        let (status, response) = call(app, "POST", &uri, Some(&RideActionBody { driver_id })).await;
        assert_eq!(status, StatusCode::OK);
        response
    }

    #[tokio::test]
    async fn test_request_then_poll() {
        let app = app();
        let ride = request_ride(&app).await;
        assert_eq!(ride.ride_id, 1);
        assert_eq!(ride.status, RideStatusName::Pending);
        assert!(ride.requested_at > 0);

        let (status, body): (_, RideStatusResponse) =
            call(&app, "GET", "/api/v1/rides/1/status", None::<&()>).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.status, RideStatusName::Pending);
    }

    #[tokio::test]
    async fn test_unknown_ride_is_not_found_sentinel() {
        let (status, body): (_, RideStatusResponse) =
            call(&app(), "GET", "/api/v1/rides/77/status", None::<&()>).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.ride_id, 77);
        assert_eq!(body.status, RideStatusName::NotFound);
    }

    #[tokio::test]
    async fn test_accept_race_loser_gets_success_false() {
        let app = app();
        let ride = request_ride(&app).await;

        let won = act(&app, ride.ride_id, "accept", 101).await;
        assert!(won.success);
        assert_eq!(won.message, "Ride accepted.");

        let lost = act(&app, ride.ride_id, "accept", 102).await;
        assert!(!lost.success);
        assert_eq!(lost.message, "Ride not available.");

        let (_, body): (_, RideStatusResponse) =
            call(&app, "GET", "/api/v1/rides/1/status", None::<&()>).await;
        assert_eq!(body.status, RideStatusName::Accepted);
    }

    #[tokio::test]
    async fn test_reject_and_complete() {
        let app = app();
        let ride = request_ride(&app).await;

        let rejected = act(&app, ride.ride_id, "reject", 5).await;
        assert!(rejected.success);
        assert_eq!(rejected.message, "Ride rejected.");

        assert!(act(&app, ride.ride_id, "accept", 6).await.success);

        let wrong = act(&app, ride.ride_id, "complete", 5).await;
        assert!(!wrong.success);
        assert_eq!(wrong.message, "Ride not available or not assigned to this driver.");

        let done = act(&app, ride.ride_id, "complete", 6).await;
        assert!(done.success);
        assert_eq!(done.message, "Ride completed successfully.");

        let (_, body): (_, RideStatusResponse) =
            call(&app, "GET", "/api/v1/rides/1/status", None::<&()>).await;
        assert_eq!(body.status, RideStatusName::Completed);
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body): (_, serde_json::Value) =
            call(&app(), "GET", "/health", None::<&()>).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }
}
