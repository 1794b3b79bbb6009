// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Test helper functions and fixtures.

use ride_dispatch::{BrokerSettings, RideState};
use ride_dispatch_audit::Cause;
use time::OffsetDateTime;
use time::macros::datetime;

use crate::request_response::{CreateRideRequest, LocationInfo};
use crate::{AuthenticatedActor, Role, create_ride};

pub fn test_now() -> OffsetDateTime {
    datetime!(2026-01-10 10:00 UTC)
}

pub fn create_test_admin() -> AuthenticatedActor {
    AuthenticatedActor::new(String::from("matcher-1"), Role::Admin)
}

pub fn create_test_owner() -> AuthenticatedActor {
    AuthenticatedActor::new(String::from("owner-1"), Role::Owner)
}

pub fn create_test_driver(id: &str) -> AuthenticatedActor {
    AuthenticatedActor::new(String::from(id), Role::Driver)
}

pub fn create_test_cause() -> Cause {
    Cause::new(String::from("api-req-1"), String::from("API request"))
}

pub fn test_settings() -> BrokerSettings {
    BrokerSettings::default()
}

pub fn pickup_info() -> LocationInfo {
    LocationInfo {
        lat: 28.6139,
        lng: 77.2090,
        address: Some(String::from("Connaught Place")),
    }
}

pub fn drop_info() -> LocationInfo {
    LocationInfo {
        lat: 28.4595,
        lng: 77.0266,
        address: None,
    }
}

pub fn create_test_request(is_round_trip: bool) -> CreateRideRequest {
    CreateRideRequest {
        ride_id: String::from("ride-1"),
        pickup: pickup_info(),
        drop: drop_info(),
        scheduled_at: test_now(),
        vehicle_type: String::from("sedan"),
        hourly_rate: 100.0,
        is_round_trip,
    }
}

pub fn create_test_state(is_round_trip: bool) -> RideState {
    let (state, _) = create_ride(
        &create_test_request(is_round_trip),
        &create_test_owner(),
        test_now(),
    )
    .unwrap();
    state
}
