// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! API handler functions for state-changing and read-only ride operations.
//!
//! Handlers translate requests into broker commands, enforce authorization,
//! and translate every error to the API taxonomy. The server layer owns
//! per-ride serialization; handlers receive a snapshot of the current state
//! and return the transition result to be committed.

use std::str::FromStr;
use time::OffsetDateTime;

use ride_dispatch::{BrokerSettings, Command, RideEvent, RideState, apply};
use ride_dispatch_audit::{AuditEvent, Cause};
use ride_dispatch_domain::{
    DeclineReason, DriverId, Location, OwnerId, Ride, RideId, VehicleType, validate_hourly_rate,
    validate_identifier,
};

use crate::error::{ApiError, RequestPolicyError, translate_core_error, translate_domain_error};
use crate::request_response::{
    AcceptRideRequest, CancelRideRequest, CompleteRideRequest, CreateRideRequest,
    DeclineRideRequest, LocationInfo, OfferRideRequest, RideResponse, StartRideRequest,
};
use crate::{AuthenticatedActor, Role};

/// Maximum accepted length for a cancellation reason.
const MAX_REASON_LENGTH: usize = 500;

/// The result of an API operation that includes both the response and the
/// audit event.
///
/// This ensures that successful API operations always produce an audit
/// trail. The server layer commits `new_state` and renders `events` onto
/// the realtime channel.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResult<T> {
    /// The API response.
    pub response: T,
    /// The audit event generated by this operation.
    pub audit_event: AuditEvent,
    /// The new state after the operation.
    pub new_state: RideState,
    /// The facts emitted by the transition, for the realtime channel.
    pub events: Vec<RideEvent>,
}

/// Verifies the actor holds one of the allowed roles.
fn authorize(
    actor: &AuthenticatedActor,
    action: &str,
    allowed: &[Role],
) -> Result<(), ApiError> {
    if allowed.contains(&actor.role) {
        return Ok(());
    }
    let required_role = allowed
        .iter()
        .map(|role| role.as_str())
        .collect::<Vec<_>>()
        .join(" or ");
    Err(ApiError::Unauthorized {
        action: String::from(action),
        required_role,
    })
}

/// Converts a wire location into a validated domain location.
fn parse_location(info: &LocationInfo) -> Result<Location, ApiError> {
    let location = Location::new(info.lat, info.lng).map_err(translate_domain_error)?;
    Ok(match &info.address {
        Some(address) => location.with_address(address),
        None => location,
    })
}

/// Books a new ride in the Searching state.
///
/// Requires the Owner or Admin role. The owner identity on the ride is the
/// acting owner's identifier.
///
/// # Errors
///
/// Returns an error if:
/// - the actor lacks the Owner or Admin role
/// - the ride identifier is empty, the coordinates are out of range, the
///   vehicle type is unknown, or the hourly rate is not billable
pub fn create_ride(
    request: &CreateRideRequest,
    actor: &AuthenticatedActor,
    now: OffsetDateTime,
) -> Result<(RideState, RideResponse), ApiError> {
    authorize(actor, "create_ride", &[Role::Owner, Role::Admin])?;

    validate_identifier("ride_id", &request.ride_id).map_err(translate_domain_error)?;
    validate_hourly_rate(request.hourly_rate).map_err(translate_domain_error)?;
    let vehicle_type =
        VehicleType::from_str(&request.vehicle_type).map_err(translate_domain_error)?;
    let pickup = parse_location(&request.pickup)?;
    let drop = parse_location(&request.drop)?;

    let ride = Ride::new(
        RideId::new(&request.ride_id),
        OwnerId::new(&actor.id),
        pickup,
        drop,
        request.scheduled_at,
        vehicle_type,
        request.hourly_rate,
        request.is_round_trip,
        now,
    );

    tracing::info!(ride_id = %ride.id, owner = %ride.owner, "Ride booked");

    let response = RideResponse::from(&ride);
    Ok((RideState::new(ride), response))
}

/// Applies a broker command and packages the transition for the server
/// layer.
fn apply_command(
    state: &RideState,
    command: Command,
    actor: &AuthenticatedActor,
    cause: Cause,
    now: OffsetDateTime,
    settings: &BrokerSettings,
) -> Result<ApiResult<RideResponse>, ApiError> {
    let result = apply(
        state,
        command,
        actor.to_audit_actor(),
        cause,
        now,
        settings,
    )
    .map_err(translate_core_error)?;

    let response = RideResponse::from(&result.new_state.ride);
    Ok(ApiResult {
        response,
        audit_event: result.audit_event,
        new_state: result.new_state,
        events: result.events,
    })
}

/// Extends a candidate offer to a driver.
///
/// Requires the Admin role (the matcher acts as an admin).
///
/// # Errors
///
/// Returns an error if the actor lacks the Admin role, the driver
/// identifier is empty, or the ride is not accepting offers.
pub fn offer_ride(
    state: &RideState,
    request: &OfferRideRequest,
    actor: &AuthenticatedActor,
    cause: Cause,
    now: OffsetDateTime,
    settings: &BrokerSettings,
) -> Result<ApiResult<RideResponse>, ApiError> {
    authorize(actor, "offer_ride", &[Role::Admin])?;
    validate_identifier("driver_id", &request.driver_id).map_err(translate_domain_error)?;

    apply_command(
        state,
        Command::Offer {
            driver: DriverId::new(&request.driver_id),
        },
        actor,
        cause,
        now,
        settings,
    )
}

/// Resolves a driver's accept against the broker.
///
/// Requires the Driver role; the acting driver must be the driver named in
/// the request. Losing the race surfaces as `RideNoLongerAvailable`, which
/// callers must treat as a normal outcome.
///
/// # Errors
///
/// Returns an error if the actor is not the named driver, the offer
/// expired or does not exist, or another driver already won.
pub fn accept_ride(
    state: &RideState,
    request: &AcceptRideRequest,
    actor: &AuthenticatedActor,
    cause: Cause,
    now: OffsetDateTime,
    settings: &BrokerSettings,
) -> Result<ApiResult<RideResponse>, ApiError> {
    authorize(actor, "accept_ride", &[Role::Driver])?;
    require_self(actor, "accept_ride", &request.driver_id)?;

    apply_command(
        state,
        Command::ResolveAccept {
            driver: DriverId::new(&request.driver_id),
        },
        actor,
        cause,
        now,
        settings,
    )
}

/// Resolves a driver's decline (explicit or countdown timeout).
///
/// # Errors
///
/// Returns an error if the actor is not the named driver or no pending
/// offer exists for them.
pub fn decline_ride(
    state: &RideState,
    request: &DeclineRideRequest,
    actor: &AuthenticatedActor,
    cause: Cause,
    now: OffsetDateTime,
    settings: &BrokerSettings,
) -> Result<ApiResult<RideResponse>, ApiError> {
    authorize(actor, "decline_ride", &[Role::Driver, Role::Admin])?;
    if actor.role == Role::Driver {
        require_self(actor, "decline_ride", &request.driver_id)?;
    }

    let reason = if request.timed_out {
        DeclineReason::TimedOut
    } else {
        DeclineReason::Declined
    };

    apply_command(
        state,
        Command::ResolveDecline {
            driver: DriverId::new(&request.driver_id),
            reason,
        },
        actor,
        cause,
        now,
        settings,
    )
}

/// Starts the ride on behalf of the assigned driver.
///
/// # Errors
///
/// Returns an error if the actor is not the named driver, the ride is not
/// in the Accepted state, or the named driver is not the assigned driver.
pub fn start_ride(
    state: &RideState,
    request: &StartRideRequest,
    actor: &AuthenticatedActor,
    cause: Cause,
    now: OffsetDateTime,
    settings: &BrokerSettings,
) -> Result<ApiResult<RideResponse>, ApiError> {
    authorize(actor, "start_ride", &[Role::Driver])?;
    require_self(actor, "start_ride", &request.driver_id)?;
    let at = parse_location(&request.at)?;

    apply_command(
        state,
        Command::Start {
            driver: DriverId::new(&request.driver_id),
            at,
        },
        actor,
        cause,
        now,
        settings,
    )
}

/// Completes the current leg of the ride.
///
/// For a round trip still on its outbound leg this flips the ride onto the
/// return leg; otherwise it settles the fare and completes the ride.
///
/// # Errors
///
/// Returns an error if the actor is not the named driver, the ride is not
/// active, or it was already completed.
pub fn complete_ride(
    state: &RideState,
    request: &CompleteRideRequest,
    actor: &AuthenticatedActor,
    cause: Cause,
    now: OffsetDateTime,
    settings: &BrokerSettings,
) -> Result<ApiResult<RideResponse>, ApiError> {
    authorize(actor, "complete_ride", &[Role::Driver, Role::Admin])?;
    if actor.role == Role::Driver {
        require_self(actor, "complete_ride", &request.driver_id)?;
    }
    let at = parse_location(&request.at)?;

    apply_command(
        state,
        Command::CompleteLeg {
            driver: DriverId::new(&request.driver_id),
            at,
            return_distance_km: request.return_distance_km,
        },
        actor,
        cause,
        now,
        settings,
    )
}

/// Cancels a ride that has not yet become active.
///
/// Requires the Owner or Admin role.
///
/// # Errors
///
/// Returns an error if the actor lacks the Owner or Admin role, the reason
/// is empty or too long, or the ride is already active or terminal.
pub fn cancel_ride(
    state: &RideState,
    request: &CancelRideRequest,
    actor: &AuthenticatedActor,
    cause: Cause,
    now: OffsetDateTime,
    settings: &BrokerSettings,
) -> Result<ApiResult<RideResponse>, ApiError> {
    authorize(actor, "cancel_ride", &[Role::Owner, Role::Admin])?;

    let reason = request.reason.trim();
    if reason.is_empty() {
        return Err(RequestPolicyError::EmptyField { field: "reason" }.into());
    }
    if reason.len() > MAX_REASON_LENGTH {
        return Err(RequestPolicyError::TooLong {
            field: "reason",
            max_length: MAX_REASON_LENGTH,
        }
        .into());
    }

    apply_command(
        state,
        Command::Cancel {
            reason: String::from(reason),
        },
        actor,
        cause,
        now,
        settings,
    )
}

/// Returns the ride as it currently stands.
///
/// Any authenticated actor may look a ride up.
#[must_use]
pub fn get_ride(state: &RideState) -> RideResponse {
    RideResponse::from(&state.ride)
}

/// Requires that a driver-role actor acts only as themselves.
fn require_self(
    actor: &AuthenticatedActor,
    action: &str,
    driver_id: &str,
) -> Result<(), ApiError> {
    if actor.id == driver_id {
        return Ok(());
    }
    Err(ApiError::Unauthorized {
        action: String::from(action),
        required_role: String::from("the named driver"),
    })
}
