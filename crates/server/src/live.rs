// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Realtime channel for drivers and owners.
//!
//! One WebSocket connection per identity. A client binds its identity with
//! a `register` message; registering the same identity on a new connection
//! force-logs-out the previous one. Drivers stream GPS fixes inbound;
//! assignment alerts, withdrawal notices, speed warnings, and ride
//! lifecycle facts flow outbound.
//!
//! Events are informational and never authoritative. Clients must resolve
//! offers through the HTTP API and never assume success without an
//! explicit acknowledgment.

use axum::{
    extract::{
        State as AxumState, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::Response,
};
use futures::{SinkExt, stream::StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, error, info, warn};

use ride_dispatch::RideEvent;
use ride_dispatch_api::{FareBreakdownInfo, LocationInfo, RideResponse};
use ride_dispatch_domain::{DriverId, GeoFix, Location, OwnerId, RideId, SpeedViolation};

use crate::AppState;

/// Messages clients send over the channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Binds the connection to an identity.
    Register {
        /// The driver or owner identity.
        user_id: String,
        /// The client's role ("driver" or "owner").
        role: String,
    },
    /// A GPS fix from the assigned driver of an active ride.
    DriverLocation {
        /// The sending driver.
        driver_id: String,
        /// The active ride the fix belongs to.
        ride_id: String,
        /// Latitude in degrees.
        lat: f64,
        /// Longitude in degrees.
        lng: f64,
        /// Device timestamp in milliseconds since the Unix epoch.
        timestamp_ms: i64,
    },
}

/// The decision-support estimate attached to a new assignment alert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimateInfo {
    /// Straight-line pickup to drop distance, in km.
    pub distance_km: f64,
    /// Rough duration at the assumed average speed, in minutes.
    pub duration_mins: f64,
}

impl From<ride_dispatch::RideEstimate> for EstimateInfo {
    fn from(estimate: ride_dispatch::RideEstimate) -> Self {
        Self {
            distance_km: estimate.distance_km,
            duration_mins: estimate.duration_mins,
        }
    }
}

/// Events the server pushes over the channel.
///
/// These represent facts about canonical state changes and the alert
/// lifecycle; they are derived from successful transitions, not the source
/// of truth.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Connection confirmation (sent on initial connect).
    Connected {
        /// Server timestamp (ISO 8601).
        timestamp: String,
    },
    /// The identity registered on a newer connection; this one is dead.
    ForceLogout {
        /// A human-readable explanation.
        message: String,
    },
    /// A candidate offer for the receiving driver.
    NewAssignment {
        /// The offered ride.
        ride_id: String,
        /// The pickup location.
        pickup: LocationInfo,
        /// The drop location.
        drop: LocationInfo,
        /// The decision-support estimate.
        estimate: EstimateInfo,
        /// Seconds until the offer lapses.
        expires_in_secs: u32,
    },
    /// An audible/haptic alert pulse while the offer rings.
    AlertPulse {
        /// The offered ride.
        ride_id: String,
        /// Seconds left on the countdown.
        remaining_secs: u32,
    },
    /// The receiving driver's pending offer was withdrawn.
    AssignmentWithdrawn {
        /// The ride.
        ride_id: String,
        /// Why the offer was withdrawn.
        reason: String,
    },
    /// The receiving driver breached the speed ceiling.
    SpeedWarning {
        /// The active ride.
        ride_id: String,
        /// The derived speed in km/h.
        speed_kmh: f64,
        /// The ceiling that was breached.
        max_allowed_kmh: f64,
        /// A human-readable warning.
        message: String,
    },
    /// A driver won the acceptance race.
    RideAccepted {
        /// The ride.
        ride_id: String,
        /// The winning driver.
        driver_id: String,
    },
    /// The assigned driver started the ride.
    RideStarted {
        /// The ride.
        ride_id: String,
    },
    /// A round trip reached its drop point and is on the return leg.
    RideTurnaround {
        /// The ride.
        ride_id: String,
    },
    /// The ride completed and its fare was settled.
    RideCompleted {
        /// The ride.
        ride_id: String,
        /// The settled fare.
        fare: FareBreakdownInfo,
    },
    /// The ride was cancelled before it became active.
    RideCancelled {
        /// The ride.
        ride_id: String,
        /// The cancellation reason.
        reason: String,
    },
}

/// One registered connection.
struct Channel {
    /// The outbound event sender for the connection task.
    tx: mpsc::UnboundedSender<ServerEvent>,
    /// The registration token, used to unregister only the same
    /// connection.
    token: u64,
}

/// Identity-keyed registry of live connections.
///
/// At most one live channel per identity. Registering an identity that
/// already has a channel force-logs-out the old channel before the new
/// one takes over.
pub struct ChannelRegistry {
    /// Channels keyed by identity.
    channels: Mutex<HashMap<String, Channel>>,
    /// Monotonic registration token source.
    next_token: AtomicU64,
}

impl ChannelRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            channels: Mutex::new(HashMap::new()),
            next_token: AtomicU64::new(1),
        }
    }

    /// Registers an identity on a connection, returning the registration
    /// token.
    ///
    /// Any previous channel for the identity receives a `force_logout`
    /// event and is dropped from the registry.
    pub async fn register(
        &self,
        identity: &str,
        tx: mpsc::UnboundedSender<ServerEvent>,
    ) -> u64 {
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        let mut channels = self.channels.lock().await;
        if let Some(previous) = channels.insert(identity.to_string(), Channel { tx, token }) {
            info!(identity, "Identity re-registered; logging out prior channel");
            let _ = previous.tx.send(ServerEvent::ForceLogout {
                message: String::from("Logged in from another device"),
            });
        }
        token
    }

    /// Removes a registration, but only if it still belongs to the same
    /// connection.
    pub async fn unregister(&self, identity: &str, token: u64) {
        let mut channels = self.channels.lock().await;
        if channels.get(identity).is_some_and(|channel| channel.token == token) {
            channels.remove(identity);
        }
    }

    /// Sends an event to an identity's live channel.
    ///
    /// Delivery is best effort; an identity with no live channel simply
    /// misses the event and must rely on HTTP state queries after
    /// reconnecting.
    pub async fn send(&self, identity: &str, event: ServerEvent) {
        let channels = self.channels.lock().await;
        match channels.get(identity) {
            Some(channel) => {
                if channel.tx.send(event).is_err() {
                    debug!(identity, "Channel task gone; event dropped");
                }
            }
            None => {
                debug!(identity, "No live channel for identity; event dropped");
            }
        }
    }

    /// Returns the number of live registrations.
    pub async fn live_channels(&self) -> usize {
        self.channels.lock().await.len()
    }
}

impl Default for ChannelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Renders broker events onto the realtime channel.
///
/// Routing: assignment withdrawals go to the affected driver; lifecycle
/// facts go to the ride owner and, where one exists, the assigned driver.
/// Offer extensions are rendered separately by the offer handler, which
/// owns the alert session and its estimate.
pub async fn publish_ride_events(registry: &ChannelRegistry, owner: &OwnerId, events: &[RideEvent]) {
    for event in events {
        match event {
            RideEvent::OfferExtended { .. } | RideEvent::CandidateDeclined { .. } => {}
            RideEvent::AssignmentWon { ride_id, driver_id } => {
                let out = ServerEvent::RideAccepted {
                    ride_id: ride_id.value().to_string(),
                    driver_id: driver_id.value().to_string(),
                };
                registry.send(owner.value(), out.clone()).await;
                registry.send(driver_id.value(), out).await;
            }
            RideEvent::AssignmentWithdrawn {
                ride_id,
                driver_id,
                reason,
            } => {
                registry
                    .send(
                        driver_id.value(),
                        ServerEvent::AssignmentWithdrawn {
                            ride_id: ride_id.value().to_string(),
                            reason: format!("{reason:?}"),
                        },
                    )
                    .await;
            }
            RideEvent::RideStarted { ride_id, .. } => {
                registry
                    .send(
                        owner.value(),
                        ServerEvent::RideStarted {
                            ride_id: ride_id.value().to_string(),
                        },
                    )
                    .await;
            }
            RideEvent::Turnaround { ride_id } => {
                registry
                    .send(
                        owner.value(),
                        ServerEvent::RideTurnaround {
                            ride_id: ride_id.value().to_string(),
                        },
                    )
                    .await;
            }
            RideEvent::RideCompleted { ride_id, fare } => {
                registry
                    .send(
                        owner.value(),
                        ServerEvent::RideCompleted {
                            ride_id: ride_id.value().to_string(),
                            fare: FareBreakdownInfo::from(fare),
                        },
                    )
                    .await;
            }
            RideEvent::RideCancelled { ride_id, reason } => {
                registry
                    .send(
                        owner.value(),
                        ServerEvent::RideCancelled {
                            ride_id: ride_id.value().to_string(),
                            reason: reason.clone(),
                        },
                    )
                    .await;
            }
        }
    }
}

/// Renders a notifiable speed violation to the driver and the owner.
pub async fn publish_speed_warning(
    registry: &ChannelRegistry,
    owner: &OwnerId,
    violation: &SpeedViolation,
) {
    let event = ServerEvent::SpeedWarning {
        ride_id: violation.ride_id.value().to_string(),
        speed_kmh: violation.speed_kmh,
        max_allowed_kmh: violation.max_allowed_kmh,
        message: format!(
            "Speed {:.1} km/h exceeds the {:.1} km/h limit",
            violation.speed_kmh, violation.max_allowed_kmh
        ),
    };
    registry
        .send(violation.driver_id.value(), event.clone())
        .await;
    registry.send(owner.value(), event).await;
}

/// Handles WebSocket upgrade requests for the realtime channel.
pub async fn live_channel_handler(
    ws: WebSocketUpgrade,
    AxumState(app_state): AxumState<AppState>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state))
}

/// Drives one WebSocket connection.
///
/// Sends a connection confirmation, then relays outbound events and
/// processes inbound messages until either side drops.
async fn handle_socket(socket: WebSocket, app_state: AppState) {
    info!("Client connected to realtime channel");

    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();

    // Send connection confirmation
    let connected_event = ServerEvent::Connected {
        timestamp: time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Iso8601::DEFAULT)
            .unwrap_or_else(|_| String::from("unknown")),
    };
    if let Ok(json) = serde_json::to_string(&connected_event)
        && sender.send(Message::Text(json.into())).await.is_err()
    {
        warn!("Failed to send connection confirmation");
        return;
    }

    let mut send_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let is_logout = matches!(event, ServerEvent::ForceLogout { .. });
            match serde_json::to_string(&event) {
                Ok(json) => {
                    if sender.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    error!(?e, "Failed to serialize server event");
                }
            }
            if is_logout {
                // A newer connection owns this identity now.
                break;
            }
        }
    });

    let recv_state = app_state.clone();
    let mut recv_task = tokio::spawn(async move {
        let mut registration: Option<(String, u64)> = None;
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    handle_client_message(&recv_state, &tx, &mut registration, text.as_str())
                        .await;
                }
                Ok(Message::Binary(_)) => {
                    warn!("Binary frames are not part of the protocol, ignoring");
                }
                Ok(Message::Close(_)) => {
                    debug!("Client sent close frame");
                    break;
                }
                Ok(Message::Ping(_) | Message::Pong(_)) => {}
                Err(e) => {
                    error!(?e, "WebSocket receive error");
                    break;
                }
            }
        }
        if let Some((identity, token)) = registration {
            recv_state.registry.unregister(&identity, token).await;
        }
    });

    tokio::select! {
        _ = &mut send_task => {
            debug!("Send task completed");
            recv_task.abort();
        }
        _ = &mut recv_task => {
            debug!("Receive task completed");
            send_task.abort();
        }
    }

    info!("Client disconnected from realtime channel");
}

/// Processes one inbound text frame.
async fn handle_client_message(
    app_state: &AppState,
    tx: &mpsc::UnboundedSender<ServerEvent>,
    registration: &mut Option<(String, u64)>,
    text: &str,
) {
    let message: ClientMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(e) => {
            warn!(?e, "Unparseable client message, ignoring");
            return;
        }
    };

    match message {
        ClientMessage::Register { user_id, role } => {
            if let Some((previous, token)) = registration.take() {
                app_state.registry.unregister(&previous, token).await;
            }
            let token = app_state.registry.register(&user_id, tx.clone()).await;
            info!(user_id, role, "Identity registered on realtime channel");
            *registration = Some((user_id, token));
        }
        ClientMessage::DriverLocation {
            driver_id,
            ride_id,
            lat,
            lng,
            timestamp_ms,
        } => {
            ingest_driver_location(app_state, &driver_id, &ride_id, lat, lng, timestamp_ms)
                .await;
        }
    }
}

/// Feeds one GPS fix through the dispatcher and renders the outcome.
///
/// The raw wire coordinates become a validated [`GeoFix`] here; everything
/// past this point works with domain types.
async fn ingest_driver_location(
    app_state: &AppState,
    driver_id: &str,
    ride_id: &str,
    lat: f64,
    lng: f64,
    timestamp_ms: i64,
) {
    let location = match Location::new(lat, lng) {
        Ok(location) => location,
        Err(e) => {
            debug!(driver_id, ride_id, error = %e, "Dropped location fix");
            return;
        }
    };
    let fix = GeoFix {
        driver_id: DriverId::new(driver_id),
        ride_id: RideId::new(ride_id),
        location,
        timestamp_ms,
    };

    let now = time::OffsetDateTime::now_utc();
    let report = match app_state.dispatcher.ingest_fix(&fix, now).await {
        Ok(report) => report,
        Err(e) => {
            debug!(driver_id, ride_id, error = %e, "Dropped location fix");
            return;
        }
    };

    let owner = match app_state.dispatcher.snapshot(ride_id).await {
        Ok(state) => state.ride.owner,
        Err(e) => {
            debug!(ride_id, error = %e, "Ride vanished after fix ingestion");
            return;
        }
    };

    if let Some(speed_kmh) = report.sample.speed_kmh {
        debug!(
            driver_id,
            ride_id,
            speed_kmh,
            leg_km = report.sample.leg_distance_km,
            "Fix ingested"
        );
    }
    if let Some((violation, true)) = &report.violation {
        publish_speed_warning(&app_state.registry, &owner, violation).await;
    }
    if !report.turnaround_events.is_empty() {
        publish_ride_events(&app_state.registry, &owner, &report.turnaround_events).await;
    }
}

/// Builds the `new_assignment` alert event for an extended offer.
#[must_use]
pub fn new_assignment_event(
    ride: &RideResponse,
    estimate: EstimateInfo,
    expires_in_secs: u32,
) -> ServerEvent {
    ServerEvent::NewAssignment {
        ride_id: ride.ride_id.clone(),
        pickup: ride.pickup.clone(),
        drop: ride.drop.clone(),
        estimate,
        expires_in_secs,
    }
}
