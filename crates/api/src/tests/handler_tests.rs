// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Tests for the ride operation handlers.

use time::Duration;

use crate::error::ApiError;
use crate::request_response::{
    AcceptRideRequest, CancelRideRequest, CompleteRideRequest, DeclineRideRequest,
    OfferRideRequest, StartRideRequest,
};
use crate::{
    accept_ride, cancel_ride, complete_ride, create_ride, decline_ride, get_ride, offer_ride,
    start_ride,
};
use ride_dispatch::RideState;

use super::helpers::{
    create_test_admin, create_test_cause, create_test_driver, create_test_owner,
    create_test_request, create_test_state, drop_info, pickup_info, test_now, test_settings,
};

fn offered_state() -> RideState {
    let state = create_test_state(false);
    offer_ride(
        &state,
        &OfferRideRequest {
            driver_id: String::from("driver-1"),
        },
        &create_test_admin(),
        create_test_cause(),
        test_now(),
        &test_settings(),
    )
    .unwrap()
    .new_state
}

fn accepted_state() -> RideState {
    let state = offered_state();
    accept_ride(
        &state,
        &AcceptRideRequest {
            driver_id: String::from("driver-1"),
        },
        &create_test_driver("driver-1"),
        create_test_cause(),
        test_now(),
        &test_settings(),
    )
    .unwrap()
    .new_state
}

fn active_state() -> RideState {
    let state = accepted_state();
    start_ride(
        &state,
        &StartRideRequest {
            driver_id: String::from("driver-1"),
            at: pickup_info(),
        },
        &create_test_driver("driver-1"),
        create_test_cause(),
        test_now(),
        &test_settings(),
    )
    .unwrap()
    .new_state
}

#[test]
fn test_create_ride_starts_searching() {
    let (state, response) = create_ride(
        &create_test_request(false),
        &create_test_owner(),
        test_now(),
    )
    .unwrap();

    assert_eq!(response.status, "searching");
    assert_eq!(response.ride_id, "ride-1");
    assert_eq!(response.owner_id, "owner-1");
    assert_eq!(response.assigned_driver, None);
    assert!(state.candidates.is_empty());
}

#[test]
fn test_create_ride_rejects_bad_coordinates() {
    let mut request = create_test_request(false);
    request.pickup.lat = 91.0;

    let result = create_ride(&request, &create_test_owner(), test_now());

    assert!(matches!(result, Err(ApiError::InvalidInput { .. })));
}

#[test]
fn test_create_ride_rejects_unknown_vehicle_type() {
    let mut request = create_test_request(false);
    request.vehicle_type = String::from("rickshaw");

    let result = create_ride(&request, &create_test_owner(), test_now());

    assert!(matches!(result, Err(ApiError::InvalidInput { .. })));
}

#[test]
fn test_create_ride_rejects_non_positive_rate() {
    let mut request = create_test_request(false);
    request.hourly_rate = 0.0;

    let result = create_ride(&request, &create_test_owner(), test_now());

    assert!(matches!(result, Err(ApiError::InvalidInput { .. })));
}

#[test]
fn test_offer_then_accept_assigns_the_driver() {
    let state = offered_state();

    let result = accept_ride(
        &state,
        &AcceptRideRequest {
            driver_id: String::from("driver-1"),
        },
        &create_test_driver("driver-1"),
        create_test_cause(),
        test_now(),
        &test_settings(),
    )
    .unwrap();

    assert_eq!(result.response.status, "accepted");
    assert_eq!(
        result.response.assigned_driver,
        Some(String::from("driver-1"))
    );
    assert_eq!(result.audit_event.action.name, "ResolveAccept");
}

#[test]
fn test_losing_accept_maps_to_ride_no_longer_available() {
    let state = offered_state();
    let state = offer_ride(
        &state,
        &OfferRideRequest {
            driver_id: String::from("driver-2"),
        },
        &create_test_admin(),
        create_test_cause(),
        test_now(),
        &test_settings(),
    )
    .unwrap()
    .new_state;

    let state = accept_ride(
        &state,
        &AcceptRideRequest {
            driver_id: String::from("driver-1"),
        },
        &create_test_driver("driver-1"),
        create_test_cause(),
        test_now(),
        &test_settings(),
    )
    .unwrap()
    .new_state;

    let result = accept_ride(
        &state,
        &AcceptRideRequest {
            driver_id: String::from("driver-2"),
        },
        &create_test_driver("driver-2"),
        create_test_cause(),
        test_now(),
        &test_settings(),
    );

    assert!(matches!(
        result,
        Err(ApiError::RideNoLongerAvailable { .. })
    ));
}

#[test]
fn test_decline_with_timeout_flag() {
    let state = offered_state();

    let result = decline_ride(
        &state,
        &DeclineRideRequest {
            driver_id: String::from("driver-1"),
            timed_out: true,
        },
        &create_test_driver("driver-1"),
        create_test_cause(),
        test_now(),
        &test_settings(),
    )
    .unwrap();

    assert_eq!(result.response.status, "searching");
    assert_eq!(result.response.assigned_driver, None);
}

#[test]
fn test_complete_settles_and_reports_the_fare() {
    let state = active_state();

    let result = complete_ride(
        &state,
        &CompleteRideRequest {
            driver_id: String::from("driver-1"),
            at: drop_info(),
            return_distance_km: 0.0,
        },
        &create_test_driver("driver-1"),
        create_test_cause(),
        test_now() + Duration::minutes(90),
        &test_settings(),
    )
    .unwrap();

    assert_eq!(result.response.status, "completed");
    let fare = result.response.fare.unwrap();
    assert!((fare.final_amount - 150.0).abs() < f64::EPSILON);
    assert!((fare.driver_earnings - 135.0).abs() < f64::EPSILON);
}

#[test]
fn test_recompletion_is_a_rule_violation() {
    let state = active_state();
    let state = complete_ride(
        &state,
        &CompleteRideRequest {
            driver_id: String::from("driver-1"),
            at: drop_info(),
            return_distance_km: 0.0,
        },
        &create_test_driver("driver-1"),
        create_test_cause(),
        test_now() + Duration::hours(1),
        &test_settings(),
    )
    .unwrap()
    .new_state;

    let result = complete_ride(
        &state,
        &CompleteRideRequest {
            driver_id: String::from("driver-1"),
            at: drop_info(),
            return_distance_km: 0.0,
        },
        &create_test_driver("driver-1"),
        create_test_cause(),
        test_now() + Duration::hours(2),
        &test_settings(),
    );

    assert!(matches!(
        result,
        Err(ApiError::RideRuleViolation { rule, .. }) if rule == "settle_once"
    ));
}

#[test]
fn test_cancel_requires_a_reason() {
    let state = create_test_state(false);

    let result = cancel_ride(
        &state,
        &CancelRideRequest {
            reason: String::from("   "),
        },
        &create_test_owner(),
        create_test_cause(),
        test_now(),
        &test_settings(),
    );

    assert!(matches!(
        result,
        Err(ApiError::InvalidInput { field, .. }) if field == "reason"
    ));
}

#[test]
fn test_cancel_after_start_is_rejected() {
    let state = active_state();

    let result = cancel_ride(
        &state,
        &CancelRideRequest {
            reason: String::from("Changed plans"),
        },
        &create_test_owner(),
        create_test_cause(),
        test_now(),
        &test_settings(),
    );

    assert!(matches!(
        result,
        Err(ApiError::RideRuleViolation { rule, .. }) if rule == "cancel_before_active"
    ));
}

#[test]
fn test_get_ride_reflects_the_current_state() {
    let state = accepted_state();

    let response = get_ride(&state);

    assert_eq!(response.status, "accepted");
    assert_eq!(response.assigned_driver, Some(String::from("driver-1")));
    assert!(response.fare.is_none());
}
