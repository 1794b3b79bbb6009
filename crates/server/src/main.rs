// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

#![deny(
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    clippy::style,
    clippy::correctness,
    clippy::all
)]
#![allow(clippy::multiple_crate_versions)]

mod alerts;
mod dispatch;
mod live;

use axum::{
    Json, Router,
    extract::{Path, State as AxumState},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::{error, info};

use ride_dispatch::AlertInput;
use ride_dispatch_api::{
    AcceptRideRequest, ApiError, ApiResult, AuthenticatedActor, CancelRideRequest,
    CompleteRideRequest, CreateRideRequest, DeclineRideRequest, LocationInfo, OfferRideRequest,
    RideResponse, Role, StartRideRequest, ViolationInfo, accept_ride, cancel_ride, complete_ride,
    create_ride, decline_ride, get_ride, offer_ride, start_ride,
};
use ride_dispatch_audit::{AuditLog, Cause};
use ride_dispatch_domain::DriverId;

use alerts::AlertRuntime;
use dispatch::{DispatchConfig, Dispatcher};
use live::{ChannelRegistry, live_channel_handler, new_assignment_event, publish_ride_events};

/// Ride Dispatch Server - HTTP and realtime broker for ride assignment
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port to bind the server to
    #[arg(short, long, default_value_t = 3000)]
    port: u16,

    /// Speed ceiling for active rides, in km/h
    #[arg(long, default_value_t = 60.0)]
    speed_limit_kmh: f64,

    /// Seconds a candidate offer stays open
    #[arg(long, default_value_t = 60)]
    offer_window_secs: u64,

    /// Arrival tolerance around the drop point, in meters
    #[arg(long, default_value_t = 150.0)]
    arrival_radius_m: f64,

    /// Minimum seconds between speed violation notifications
    #[arg(long, default_value_t = 30)]
    debounce_secs: u64,
}

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The canonical ride registry.
    pub dispatcher: Arc<Dispatcher>,
    /// The realtime channel registry.
    pub registry: Arc<ChannelRegistry>,
    /// The alert session runtime.
    pub alerts: Arc<AlertRuntime>,
}

/// API request for booking a ride.
///
/// This includes authentication information in addition to the ride data.
#[derive(Debug, Clone, Deserialize, Serialize)]
struct CreateRideApiRequest {
    /// The actor ID performing this action.
    actor_id: String,
    /// The role of the actor.
    actor_role: String,
    /// A client-supplied ride identifier.
    ride_id: String,
    /// The pickup location.
    pickup: LocationInfo,
    /// The drop location.
    drop: LocationInfo,
    /// When the ride is scheduled to begin (ISO 8601).
    #[serde(with = "time::serde::rfc3339")]
    scheduled_at: OffsetDateTime,
    /// The requested vehicle type.
    vehicle_type: String,
    /// The booked hourly rate.
    hourly_rate: f64,
    /// Whether the ride returns to its pickup point.
    is_round_trip: bool,
}

/// API request for extending an offer to a driver.
#[derive(Debug, Clone, Deserialize, Serialize)]
struct OfferRideApiRequest {
    /// The actor ID performing this action.
    actor_id: String,
    /// The role of the actor.
    actor_role: String,
    /// The cause ID for this action.
    cause_id: String,
    /// The cause description.
    cause_description: String,
    /// The driver receiving the offer.
    driver_id: String,
}

/// API request for a driver accepting their offer.
#[derive(Debug, Clone, Deserialize, Serialize)]
struct AcceptRideApiRequest {
    /// The actor ID performing this action.
    actor_id: String,
    /// The role of the actor.
    actor_role: String,
    /// The cause ID for this action.
    cause_id: String,
    /// The cause description.
    cause_description: String,
    /// The accepting driver.
    driver_id: String,
}

/// API request for a driver declining their offer.
#[derive(Debug, Clone, Deserialize, Serialize)]
struct DeclineRideApiRequest {
    /// The actor ID performing this action.
    actor_id: String,
    /// The role of the actor.
    actor_role: String,
    /// The cause ID for this action.
    cause_id: String,
    /// The cause description.
    cause_description: String,
    /// The declining driver.
    driver_id: String,
    /// Whether the countdown expired rather than the driver declining.
    #[serde(default)]
    timed_out: bool,
}

/// API request for the assigned driver starting the ride.
#[derive(Debug, Clone, Deserialize, Serialize)]
struct StartRideApiRequest {
    /// The actor ID performing this action.
    actor_id: String,
    /// The role of the actor.
    actor_role: String,
    /// The cause ID for this action.
    cause_id: String,
    /// The cause description.
    cause_description: String,
    /// The assigned driver.
    driver_id: String,
    /// Where the ride started.
    at: LocationInfo,
}

/// API request for the assigned driver completing the current leg.
#[derive(Debug, Clone, Deserialize, Serialize)]
struct CompleteRideApiRequest {
    /// The actor ID performing this action.
    actor_id: String,
    /// The role of the actor.
    actor_role: String,
    /// The cause ID for this action.
    cause_id: String,
    /// The cause description.
    cause_description: String,
    /// The assigned driver.
    driver_id: String,
    /// Where the leg ended.
    at: LocationInfo,
    /// Distance driven on the return leg, in km. When omitted the server
    /// falls back to the tracked GPS distance.
    #[serde(default)]
    return_distance_km: f64,
}

/// API request for cancelling a ride.
#[derive(Debug, Clone, Deserialize, Serialize)]
struct CancelRideApiRequest {
    /// The actor ID performing this action.
    actor_id: String,
    /// The role of the actor.
    actor_role: String,
    /// The cause ID for this action.
    cause_id: String,
    /// The cause description.
    cause_description: String,
    /// Why the ride is being cancelled.
    reason: String,
}

/// API response for the violations lookup.
#[derive(Debug, Clone, Deserialize, Serialize)]
struct ViolationsResponse {
    /// The ride the violations belong to.
    ride_id: String,
    /// Recorded violations in detection order.
    violations: Vec<ViolationInfo>,
}

/// Error response type.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ErrorResponse {
    /// Error indicator.
    error: bool,
    /// Error message.
    message: String,
}

/// HTTP error wrapper that implements `IntoResponse`.
struct HttpError {
    /// The HTTP status code.
    status: StatusCode,
    /// The error message.
    message: String,
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let body: Json<ErrorResponse> = Json(ErrorResponse {
            error: true,
            message: self.message,
        });
        (self.status, body).into_response()
    }
}

impl From<ApiError> for HttpError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Unauthorized { .. } => Self {
                status: StatusCode::FORBIDDEN,
                message: err.to_string(),
            },
            // An expected branch of the acceptance race, not a fault. The
            // client renders this as "ride no longer available".
            ApiError::RideNoLongerAvailable { .. } => Self {
                status: StatusCode::CONFLICT,
                message: err.to_string(),
            },
            ApiError::RideRuleViolation { .. } => Self {
                status: StatusCode::UNPROCESSABLE_ENTITY,
                message: err.to_string(),
            },
            ApiError::InvalidInput { .. } => Self {
                status: StatusCode::BAD_REQUEST,
                message: err.to_string(),
            },
            ApiError::ResourceNotFound { .. } => Self {
                status: StatusCode::NOT_FOUND,
                message: err.to_string(),
            },
            ApiError::Internal { .. } => {
                error!(error = %err, "Internal error");
                Self {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    message: err.to_string(),
                }
            }
        }
    }
}

/// Parses a role string into a Role enum.
fn parse_role(role_str: &str) -> Result<Role, HttpError> {
    match role_str.to_lowercase().as_str() {
        "admin" => Ok(Role::Admin),
        "owner" => Ok(Role::Owner),
        "driver" => Ok(Role::Driver),
        _ => Err(HttpError {
            status: StatusCode::BAD_REQUEST,
            message: format!("Invalid role: '{role_str}'. Must be 'admin', 'owner' or 'driver'"),
        }),
    }
}

/// Handler for POST `/rides` endpoint.
///
/// Books a new ride in the Searching state.
async fn handle_create_ride(
    AxumState(app_state): AxumState<AppState>,
    Json(req): Json<CreateRideApiRequest>,
) -> Result<Json<RideResponse>, HttpError> {
    info!(
        actor_id = %req.actor_id,
        role = %req.actor_role,
        ride_id = %req.ride_id,
        "Handling create_ride request"
    );

    let role: Role = parse_role(&req.actor_role)?;
    let actor: AuthenticatedActor = AuthenticatedActor::new(req.actor_id.clone(), role);
    let request = CreateRideRequest {
        ride_id: req.ride_id,
        pickup: req.pickup,
        drop: req.drop,
        scheduled_at: req.scheduled_at,
        vehicle_type: req.vehicle_type,
        hourly_rate: req.hourly_rate,
        is_round_trip: req.is_round_trip,
    };

    let (state, response) = create_ride(&request, &actor, OffsetDateTime::now_utc())?;
    app_state.dispatcher.insert(state).await?;

    Ok(Json(response))
}

/// Handler for POST `/rides/{ride_id}/offer` endpoint.
///
/// Extends a candidate offer to a driver and opens their alert session.
async fn handle_offer_ride(
    AxumState(app_state): AxumState<AppState>,
    Path(ride_id): Path<String>,
    Json(req): Json<OfferRideApiRequest>,
) -> Result<Json<RideResponse>, HttpError> {
    info!(
        actor_id = %req.actor_id,
        ride_id = %ride_id,
        driver_id = %req.driver_id,
        "Handling offer_ride request"
    );

    let role: Role = parse_role(&req.actor_role)?;
    let actor: AuthenticatedActor = AuthenticatedActor::new(req.actor_id.clone(), role);
    let cause: Cause = Cause::new(req.cause_id, req.cause_description);
    let request = OfferRideRequest {
        driver_id: req.driver_id,
    };
    let now = OffsetDateTime::now_utc();
    let settings = app_state.dispatcher.broker_settings();

    let result: ApiResult<RideResponse> = app_state
        .dispatcher
        .transition(&ride_id, |state| {
            offer_ride(state, &request, &actor, cause, now, settings)
        })
        .await?;

    let driver = DriverId::new(&request.driver_id);
    let estimate = app_state.alerts.open(&result.new_state, &driver).await;
    // Report the countdown the broker actually recorded on the candidate,
    // not the configured window.
    let expires_in_secs = result
        .new_state
        .candidate_for(&driver)
        .map_or(0, |candidate| {
            u32::try_from((candidate.expires_at - now).whole_seconds()).unwrap_or(0)
        });
    app_state
        .registry
        .send(
            driver.value(),
            new_assignment_event(&result.response, estimate.into(), expires_in_secs),
        )
        .await;

    Ok(Json(result.response))
}

/// Handler for POST `/rides/{ride_id}/accept` endpoint.
///
/// Resolves the driver's accept against the broker. Exactly one accept per
/// ride can win; losers get a 409 and their alert session resolves Lost.
async fn handle_accept_ride(
    AxumState(app_state): AxumState<AppState>,
    Path(ride_id): Path<String>,
    Json(req): Json<AcceptRideApiRequest>,
) -> Result<Json<RideResponse>, HttpError> {
    info!(
        actor_id = %req.actor_id,
        ride_id = %ride_id,
        "Handling accept_ride request"
    );

    let role: Role = parse_role(&req.actor_role)?;
    let actor: AuthenticatedActor = AuthenticatedActor::new(req.actor_id.clone(), role);
    let cause: Cause = Cause::new(req.cause_id, req.cause_description);
    let request = AcceptRideRequest {
        driver_id: req.driver_id,
    };
    let now = OffsetDateTime::now_utc();
    let settings = app_state.dispatcher.broker_settings();

    let outcome = app_state
        .dispatcher
        .transition(&ride_id, |state| {
            accept_ride(state, &request, &actor, cause, now, settings)
        })
        .await;

    match outcome {
        Ok(result) => {
            app_state
                .alerts
                .notify(&ride_id, &request.driver_id, AlertInput::AcceptGranted)
                .await;
            app_state.alerts.invalidate_withdrawn(&result.events).await;
            publish_ride_events(
                &app_state.registry,
                &result.new_state.ride.owner,
                &result.events,
            )
            .await;
            Ok(Json(result.response))
        }
        Err(err) => {
            if matches!(err, ApiError::RideNoLongerAvailable { .. }) {
                app_state
                    .alerts
                    .notify(&ride_id, &request.driver_id, AlertInput::AcceptLost)
                    .await;
            }
            Err(err.into())
        }
    }
}

/// Handler for POST `/rides/{ride_id}/decline` endpoint.
///
/// Resolves a driver's decline, explicit or by countdown timeout.
async fn handle_decline_ride(
    AxumState(app_state): AxumState<AppState>,
    Path(ride_id): Path<String>,
    Json(req): Json<DeclineRideApiRequest>,
) -> Result<Json<RideResponse>, HttpError> {
    info!(
        actor_id = %req.actor_id,
        ride_id = %ride_id,
        timed_out = req.timed_out,
        "Handling decline_ride request"
    );

    let role: Role = parse_role(&req.actor_role)?;
    let actor: AuthenticatedActor = AuthenticatedActor::new(req.actor_id.clone(), role);
    let cause: Cause = Cause::new(req.cause_id, req.cause_description);
    let request = DeclineRideRequest {
        driver_id: req.driver_id,
        timed_out: req.timed_out,
    };
    let now = OffsetDateTime::now_utc();
    let settings = app_state.dispatcher.broker_settings();

    let result: ApiResult<RideResponse> = app_state
        .dispatcher
        .transition(&ride_id, |state| {
            decline_ride(state, &request, &actor, cause, now, settings)
        })
        .await?;

    app_state
        .alerts
        .notify(&ride_id, &request.driver_id, AlertInput::Decline)
        .await;
    publish_ride_events(
        &app_state.registry,
        &result.new_state.ride.owner,
        &result.events,
    )
    .await;

    Ok(Json(result.response))
}

/// Handler for POST `/rides/{ride_id}/start` endpoint.
async fn handle_start_ride(
    AxumState(app_state): AxumState<AppState>,
    Path(ride_id): Path<String>,
    Json(req): Json<StartRideApiRequest>,
) -> Result<Json<RideResponse>, HttpError> {
    info!(
        actor_id = %req.actor_id,
        ride_id = %ride_id,
        "Handling start_ride request"
    );

    let role: Role = parse_role(&req.actor_role)?;
    let actor: AuthenticatedActor = AuthenticatedActor::new(req.actor_id.clone(), role);
    let cause: Cause = Cause::new(req.cause_id, req.cause_description);
    let request = StartRideRequest {
        driver_id: req.driver_id,
        at: req.at,
    };
    let now = OffsetDateTime::now_utc();
    let settings = app_state.dispatcher.broker_settings();

    let result: ApiResult<RideResponse> = app_state
        .dispatcher
        .transition(&ride_id, |state| {
            start_ride(state, &request, &actor, cause, now, settings)
        })
        .await?;

    publish_ride_events(
        &app_state.registry,
        &result.new_state.ride.owner,
        &result.events,
    )
    .await;

    Ok(Json(result.response))
}

/// Handler for POST `/rides/{ride_id}/complete` endpoint.
///
/// Completes the current leg. On the return leg of a round trip, a missing
/// distance falls back to the GPS-tracked leg distance.
async fn handle_complete_ride(
    AxumState(app_state): AxumState<AppState>,
    Path(ride_id): Path<String>,
    Json(req): Json<CompleteRideApiRequest>,
) -> Result<Json<RideResponse>, HttpError> {
    info!(
        actor_id = %req.actor_id,
        ride_id = %ride_id,
        "Handling complete_ride request"
    );

    let role: Role = parse_role(&req.actor_role)?;
    let actor: AuthenticatedActor = AuthenticatedActor::new(req.actor_id.clone(), role);
    let cause: Cause = Cause::new(req.cause_id, req.cause_description);
    let mut request = CompleteRideRequest {
        driver_id: req.driver_id,
        at: req.at,
        return_distance_km: req.return_distance_km,
    };

    if request.return_distance_km <= 0.0 {
        let state = app_state.dispatcher.snapshot(&ride_id).await?;
        if state.ride.is_return_leg {
            request.return_distance_km =
                app_state.dispatcher.leg_distance_km(&request.driver_id).await;
        }
    }

    let now = OffsetDateTime::now_utc();
    let settings = app_state.dispatcher.broker_settings();

    let result: ApiResult<RideResponse> = app_state
        .dispatcher
        .transition(&ride_id, |state| {
            complete_ride(state, &request, &actor, cause, now, settings)
        })
        .await?;

    publish_ride_events(
        &app_state.registry,
        &result.new_state.ride.owner,
        &result.events,
    )
    .await;

    Ok(Json(result.response))
}

/// Handler for POST `/rides/{ride_id}/cancel` endpoint.
///
/// Cancels a ride that has not yet become active. Pending offers are
/// withdrawn and their alert sessions invalidated.
async fn handle_cancel_ride(
    AxumState(app_state): AxumState<AppState>,
    Path(ride_id): Path<String>,
    Json(req): Json<CancelRideApiRequest>,
) -> Result<Json<RideResponse>, HttpError> {
    info!(
        actor_id = %req.actor_id,
        ride_id = %ride_id,
        "Handling cancel_ride request"
    );

    let role: Role = parse_role(&req.actor_role)?;
    let actor: AuthenticatedActor = AuthenticatedActor::new(req.actor_id.clone(), role);
    let cause: Cause = Cause::new(req.cause_id, req.cause_description);
    let request = CancelRideRequest { reason: req.reason };
    let now = OffsetDateTime::now_utc();
    let settings = app_state.dispatcher.broker_settings();

    let result: ApiResult<RideResponse> = app_state
        .dispatcher
        .transition(&ride_id, |state| {
            cancel_ride(state, &request, &actor, cause, now, settings)
        })
        .await?;

    app_state.alerts.invalidate_withdrawn(&result.events).await;
    publish_ride_events(
        &app_state.registry,
        &result.new_state.ride.owner,
        &result.events,
    )
    .await;

    Ok(Json(result.response))
}

/// Handler for GET `/rides/{ride_id}` endpoint.
async fn handle_get_ride(
    AxumState(app_state): AxumState<AppState>,
    Path(ride_id): Path<String>,
) -> Result<Json<RideResponse>, HttpError> {
    let state = app_state.dispatcher.snapshot(&ride_id).await?;
    Ok(Json(get_ride(&state)))
}

/// Handler for GET `/rides/{ride_id}/violations` endpoint.
async fn handle_get_violations(
    AxumState(app_state): AxumState<AppState>,
    Path(ride_id): Path<String>,
) -> Result<Json<ViolationsResponse>, HttpError> {
    let violations = app_state.dispatcher.violations(&ride_id).await?;
    Ok(Json(ViolationsResponse {
        ride_id,
        violations: violations.iter().map(ViolationInfo::from).collect(),
    }))
}

/// Builds the application router with all endpoints.
fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/rides", post(handle_create_ride))
        .route("/rides/{ride_id}", get(handle_get_ride))
        .route("/rides/{ride_id}/offer", post(handle_offer_ride))
        .route("/rides/{ride_id}/accept", post(handle_accept_ride))
        .route("/rides/{ride_id}/decline", post(handle_decline_ride))
        .route("/rides/{ride_id}/start", post(handle_start_ride))
        .route("/rides/{ride_id}/complete", post(handle_complete_ride))
        .route("/rides/{ride_id}/cancel", post(handle_cancel_ride))
        .route("/rides/{ride_id}/violations", get(handle_get_violations))
        .route("/live", get(live_channel_handler))
        .with_state(app_state)
}

/// Builds the shared application state from parsed arguments.
fn build_app_state(args: &Args) -> AppState {
    let config = DispatchConfig {
        broker: ride_dispatch::BrokerSettings {
            offer_window: time::Duration::seconds(
                i64::try_from(args.offer_window_secs).unwrap_or(60),
            ),
            ..ride_dispatch::BrokerSettings::default()
        },
        speed_limit_kmh: args.speed_limit_kmh,
        debounce: time::Duration::seconds(i64::try_from(args.debounce_secs).unwrap_or(30)),
        arrival_radius_km: args.arrival_radius_m / 1000.0,
    };

    let audit = Arc::new(AuditLog::new());
    let dispatcher = Arc::new(Dispatcher::new(config, audit));
    let registry = Arc::new(ChannelRegistry::new());
    let alerts = Arc::new(AlertRuntime::new(
        Arc::clone(&registry),
        Arc::clone(&dispatcher),
    ));

    AppState {
        dispatcher,
        registry,
        alerts,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command-line arguments
    let args: Args = Args::parse();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Initializing Ride Dispatch Server");

    let app_state: AppState = build_app_state(&args);

    // Build router
    let app: Router = build_router(app_state);

    // Bind to address
    let addr: std::net::SocketAddr = format!("127.0.0.1:{}", args.port).parse()?;
    info!("Server listening on {}", addr);

    // Run server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode as HttpStatusCode},
    };
    use time::macros::datetime;
    use tower::ServiceExt;

    /// Helper to create test app state with default dispatch config.
    fn create_test_app_state() -> AppState {
        let args = Args {
            port: 3000,
            speed_limit_kmh: 60.0,
            offer_window_secs: 60,
            arrival_radius_m: 150.0,
            debounce_secs: 30,
        };
        build_app_state(&args)
    }

    /// Helper to create a test ride booking request.
    fn create_test_ride_request(actor_id: &str, role: &str, ride_id: &str) -> CreateRideApiRequest {
        CreateRideApiRequest {
            actor_id: actor_id.to_string(),
            actor_role: role.to_string(),
            ride_id: ride_id.to_string(),
            pickup: LocationInfo {
                lat: 28.6139,
                lng: 77.2090,
                address: Some(String::from("Connaught Place")),
            },
            drop: LocationInfo {
                lat: 28.4595,
                lng: 77.0266,
                address: None,
            },
            scheduled_at: datetime!(2026-01-10 10:00 UTC),
            vehicle_type: String::from("sedan"),
            hourly_rate: 100.0,
            is_round_trip: false,
        }
    }

    /// Helper to POST a JSON body to a path.
    async fn post_json<T: Serialize>(app: Router, path: &str, body: &T) -> axum::response::Response {
        app.oneshot(
            Request::builder()
                .method("POST")
                .uri(path)
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_string(body).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap()
    }

    /// Helper to book a ride and extend an offer to a driver.
    async fn book_and_offer(app: &Router, ride_id: &str, driver_id: &str) {
        let create_req = create_test_ride_request("owner-1", "owner", ride_id);
        let response = post_json(app.clone(), "/rides", &create_req).await;
        assert_eq!(response.status(), HttpStatusCode::OK);

        let offer_req = OfferRideApiRequest {
            actor_id: String::from("matcher-1"),
            actor_role: String::from("admin"),
            cause_id: String::from("test-cause"),
            cause_description: String::from("Test offer"),
            driver_id: driver_id.to_string(),
        };
        let response = post_json(app.clone(), &format!("/rides/{ride_id}/offer"), &offer_req).await;
        assert_eq!(response.status(), HttpStatusCode::OK);
    }

    /// Helper to build an accept request for a driver.
    fn accept_request(driver_id: &str) -> AcceptRideApiRequest {
        AcceptRideApiRequest {
            actor_id: driver_id.to_string(),
            actor_role: String::from("driver"),
            cause_id: String::from("test-cause"),
            cause_description: String::from("Test accept"),
            driver_id: driver_id.to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_ride_returns_searching_ride() {
        let app_state: AppState = create_test_app_state();
        let app: Router = build_router(app_state);

        let req = create_test_ride_request("owner-1", "owner", "ride-1");
        let response = post_json(app, "/rides", &req).await;

        assert_eq!(response.status(), HttpStatusCode::OK);
        let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let ride: RideResponse = serde_json::from_slice(&body_bytes).unwrap();
        assert_eq!(ride.ride_id, "ride-1");
        assert_eq!(ride.status, "searching");
        assert_eq!(ride.owner_id, "owner-1");
    }

    #[tokio::test]
    async fn test_create_ride_as_driver_is_forbidden() {
        let app_state: AppState = create_test_app_state();
        let app: Router = build_router(app_state);

        let req = create_test_ride_request("driver-1", "driver", "ride-1");
        let response = post_json(app, "/rides", &req).await;

        assert_eq!(response.status(), HttpStatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_create_ride_with_unknown_role_is_bad_request() {
        let app_state: AppState = create_test_app_state();
        let app: Router = build_router(app_state);

        let req = create_test_ride_request("owner-1", "passenger", "ride-1");
        let response = post_json(app, "/rides", &req).await;

        assert_eq!(response.status(), HttpStatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_duplicate_ride_id_is_rejected() {
        let app_state: AppState = create_test_app_state();
        let app: Router = build_router(app_state);

        let req = create_test_ride_request("owner-1", "owner", "ride-1");
        let response = post_json(app.clone(), "/rides", &req).await;
        assert_eq!(response.status(), HttpStatusCode::OK);

        let response = post_json(app, "/rides", &req).await;
        assert_eq!(response.status(), HttpStatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_offer_accept_flow_assigns_driver() {
        let app_state: AppState = create_test_app_state();
        let app: Router = build_router(app_state);

        book_and_offer(&app, "ride-1", "driver-1").await;

        let response = post_json(
            app.clone(),
            "/rides/ride-1/accept",
            &accept_request("driver-1"),
        )
        .await;
        assert_eq!(response.status(), HttpStatusCode::OK);

        let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let ride: RideResponse = serde_json::from_slice(&body_bytes).unwrap();
        assert_eq!(ride.status, "accepted");
        assert_eq!(ride.assigned_driver.as_deref(), Some("driver-1"));
    }

    #[tokio::test]
    async fn test_winning_accept_closes_the_alert_session() {
        let app_state: AppState = create_test_app_state();
        let app: Router = build_router(app_state.clone());

        book_and_offer(&app, "ride-1", "driver-1").await;
        assert_eq!(app_state.alerts.live_sessions().await, 1);

        let response = post_json(
            app.clone(),
            "/rides/ride-1/accept",
            &accept_request("driver-1"),
        )
        .await;
        assert_eq!(response.status(), HttpStatusCode::OK);

        // The session task dismisses itself on the next channel poll;
        // give it a moment before checking the registry.
        tokio::time::sleep(std::time::Duration::from_millis(300)).await;
        assert_eq!(app_state.alerts.live_sessions().await, 0);
    }

    #[tokio::test]
    async fn test_losing_accept_returns_conflict() {
        let app_state: AppState = create_test_app_state();
        let app: Router = build_router(app_state);

        book_and_offer(&app, "ride-1", "driver-1").await;

        let offer_req = OfferRideApiRequest {
            actor_id: String::from("matcher-1"),
            actor_role: String::from("admin"),
            cause_id: String::from("test-cause"),
            cause_description: String::from("Second offer"),
            driver_id: String::from("driver-2"),
        };
        let response = post_json(app.clone(), "/rides/ride-1/offer", &offer_req).await;
        assert_eq!(response.status(), HttpStatusCode::OK);

        let response = post_json(
            app.clone(),
            "/rides/ride-1/accept",
            &accept_request("driver-1"),
        )
        .await;
        assert_eq!(response.status(), HttpStatusCode::OK);

        let response = post_json(app, "/rides/ride-1/accept", &accept_request("driver-2")).await;
        assert_eq!(response.status(), HttpStatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_accepting_as_someone_else_is_forbidden() {
        let app_state: AppState = create_test_app_state();
        let app: Router = build_router(app_state);

        book_and_offer(&app, "ride-1", "driver-1").await;

        let mut req = accept_request("driver-1");
        req.actor_id = String::from("driver-2");
        let response = post_json(app, "/rides/ride-1/accept", &req).await;

        assert_eq!(response.status(), HttpStatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_cancel_with_blank_reason_is_bad_request() {
        let app_state: AppState = create_test_app_state();
        let app: Router = build_router(app_state);

        let req = create_test_ride_request("owner-1", "owner", "ride-1");
        let response = post_json(app.clone(), "/rides", &req).await;
        assert_eq!(response.status(), HttpStatusCode::OK);

        let cancel_req = CancelRideApiRequest {
            actor_id: String::from("owner-1"),
            actor_role: String::from("owner"),
            cause_id: String::from("test-cause"),
            cause_description: String::from("Test cancel"),
            reason: String::from("   "),
        };
        let response = post_json(app, "/rides/ride-1/cancel", &cancel_req).await;

        assert_eq!(response.status(), HttpStatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_get_unknown_ride_is_not_found() {
        let app_state: AppState = create_test_app_state();
        let app: Router = build_router(app_state);

        let response = app
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/rides/no-such-ride")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), HttpStatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_violations_endpoint_starts_empty() {
        let app_state: AppState = create_test_app_state();
        let app: Router = build_router(app_state);

        let req = create_test_ride_request("owner-1", "owner", "ride-1");
        let response = post_json(app.clone(), "/rides", &req).await;
        assert_eq!(response.status(), HttpStatusCode::OK);

        let response = app
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/rides/ride-1/violations")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), HttpStatusCode::OK);
        let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let violations: ViolationsResponse = serde_json::from_slice(&body_bytes).unwrap();
        assert_eq!(violations.ride_id, "ride-1");
        assert!(violations.violations.is_empty());
    }

    #[tokio::test]
    async fn test_ingested_fixes_record_speed_violations() {
        use ride_dispatch_domain::{GeoFix, Location, RideId};

        let app_state: AppState = create_test_app_state();
        let app: Router = build_router(app_state.clone());

        book_and_offer(&app, "ride-1", "driver-1").await;
        let response = post_json(
            app.clone(),
            "/rides/ride-1/accept",
            &accept_request("driver-1"),
        )
        .await;
        assert_eq!(response.status(), HttpStatusCode::OK);

        let start_req = StartRideApiRequest {
            actor_id: String::from("driver-1"),
            actor_role: String::from("driver"),
            cause_id: String::from("test-cause"),
            cause_description: String::from("Test start"),
            driver_id: String::from("driver-1"),
            at: LocationInfo {
                lat: 28.6139,
                lng: 77.2090,
                address: None,
            },
        };
        let response = post_json(app.clone(), "/rides/ride-1/start", &start_req).await;
        assert_eq!(response.status(), HttpStatusCode::OK);

        let now = OffsetDateTime::now_utc();
        let fix = GeoFix {
            driver_id: DriverId::new("driver-1"),
            ride_id: RideId::new("ride-1"),
            location: Location::new(28.6139, 77.2090).unwrap(),
            timestamp_ms: 1_700_000_000_000,
        };
        let report = app_state.dispatcher.ingest_fix(&fix, now).await.unwrap();
        assert!(report.sample.speed_kmh.is_none());

        // 0.003 degrees of latitude in ten seconds is roughly 120 km/h,
        // well past the 60 km/h ceiling.
        let fix = GeoFix {
            driver_id: DriverId::new("driver-1"),
            ride_id: RideId::new("ride-1"),
            location: Location::new(28.6169, 77.2090).unwrap(),
            timestamp_ms: 1_700_000_010_000,
        };
        let report = app_state.dispatcher.ingest_fix(&fix, now).await.unwrap();
        let (violation, notify) = report.violation.expect("Ceiling must be breached");
        assert!(violation.speed_kmh > 60.0);
        assert!(notify);

        let violations = app_state.dispatcher.violations("ride-1").await.unwrap();
        assert_eq!(violations.len(), 1);
    }

    #[tokio::test]
    async fn test_fix_for_an_inactive_ride_is_rejected() {
        use ride_dispatch_domain::{GeoFix, Location, RideId};

        let app_state: AppState = create_test_app_state();
        let app: Router = build_router(app_state.clone());

        book_and_offer(&app, "ride-1", "driver-1").await;

        let fix = GeoFix {
            driver_id: DriverId::new("driver-1"),
            ride_id: RideId::new("ride-1"),
            location: Location::new(28.6139, 77.2090).unwrap(),
            timestamp_ms: 1_700_000_000_000,
        };
        let result = app_state
            .dispatcher
            .ingest_fix(&fix, OffsetDateTime::now_utc())
            .await;
        assert!(matches!(
            result,
            Err(ApiError::RideRuleViolation { .. })
        ));
    }

    #[tokio::test]
    async fn test_concurrent_accepts_have_exactly_one_winner() {
        let app_state: AppState = create_test_app_state();
        let app: Router = build_router(app_state.clone());

        book_and_offer(&app, "ride-1", "driver-1").await;
        for driver in ["driver-2", "driver-3"] {
            let offer_req = OfferRideApiRequest {
                actor_id: String::from("matcher-1"),
                actor_role: String::from("admin"),
                cause_id: String::from("test-cause"),
                cause_description: String::from("Broadcast offer"),
                driver_id: driver.to_string(),
            };
            let response = post_json(app.clone(), "/rides/ride-1/offer", &offer_req).await;
            assert_eq!(response.status(), HttpStatusCode::OK);
        }

        assert_eq!(app_state.alerts.live_sessions().await, 3);

        let mut handles = Vec::new();
        for driver in ["driver-1", "driver-2", "driver-3"] {
            let dispatcher = Arc::clone(&app_state.dispatcher);
            let driver = driver.to_string();
            handles.push(tokio::spawn(async move {
                let actor = AuthenticatedActor::new(driver.clone(), Role::Driver);
                let cause = Cause::new(
                    String::from("race"),
                    String::from("Concurrent accept"),
                );
                let request = AcceptRideRequest {
                    driver_id: driver,
                };
                let now = OffsetDateTime::now_utc();
                let settings = dispatcher.broker_settings();
                dispatcher
                    .transition("ride-1", |state| {
                        accept_ride(state, &request, &actor, cause, now, settings)
                    })
                    .await
            }));
        }

        let mut winners = 0;
        let mut losers = 0;
        for handle in handles {
            match handle.await.expect("Task panicked") {
                Ok(_) => winners += 1,
                Err(ApiError::RideNoLongerAvailable { .. }) => losers += 1,
                Err(e) => panic!("Unexpected error: {e}"),
            }
        }
        assert_eq!(winners, 1);
        assert_eq!(losers, 2);

        let state = app_state
            .dispatcher
            .snapshot("ride-1")
            .await
            .expect("Ride must exist");
        assert!(state.ride.assigned_driver.is_some());
    }
}
