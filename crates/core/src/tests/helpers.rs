// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Shared fixtures for core tests.

use crate::RideState;
use ride_dispatch_audit::{Actor, Cause};
use ride_dispatch_domain::{Location, OwnerId, Ride, RideId, VehicleType};
use time::OffsetDateTime;
use time::macros::datetime;

/// Fixed "now" used across tests.
pub fn test_now() -> OffsetDateTime {
    datetime!(2026-01-10 10:00 UTC)
}

pub fn pickup() -> Location {
    Location::new(28.6139, 77.2090).unwrap()
}

pub fn drop_point() -> Location {
    Location::new(28.4595, 77.0266).unwrap()
}

pub fn create_test_actor(id: &str) -> Actor {
    Actor::new(String::from(id), String::from("driver"))
}

pub fn create_test_cause() -> Cause {
    Cause::new(String::from("req-1"), String::from("Test request"))
}

pub fn create_test_state(is_round_trip: bool) -> RideState {
    let ride = Ride::new(
        RideId::new("ride-1"),
        OwnerId::new("owner-1"),
        pickup(),
        drop_point(),
        test_now(),
        VehicleType::Sedan,
        100.0,
        is_round_trip,
        test_now(),
    );
    RideState::new(ride)
}
