// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Tests for speed ceiling enforcement and turnaround detection.

use crate::{SpeedCheck, TurnaroundDetector, ViolationMonitor};
use ride_dispatch_domain::{DriverId, Location, RideId, RideStatus};
use time::Duration;

use super::helpers::{create_test_state, drop_point, pickup, test_now};

fn monitor() -> ViolationMonitor {
    ViolationMonitor::new(60.0, Duration::seconds(30))
}

fn ride_id() -> RideId {
    RideId::new("ride-1")
}

fn driver_id() -> DriverId {
    DriverId::new("driver-1")
}

#[test]
fn test_speed_at_the_ceiling_is_within_limit() {
    let mut monitor = monitor();

    let check = monitor.check(&ride_id(), &driver_id(), 60.0, &pickup(), test_now());

    assert_eq!(check, SpeedCheck::WithinLimit);
}

#[test]
fn test_breach_records_violation_and_notifies() {
    let mut monitor = monitor();

    let check = monitor.check(&ride_id(), &driver_id(), 72.0, &pickup(), test_now());

    match check {
        SpeedCheck::Exceeded { violation, notify } => {
            assert!(notify);
            assert!((violation.speed_kmh - 72.0).abs() < f64::EPSILON);
            assert!((violation.max_allowed_kmh - 60.0).abs() < f64::EPSILON);
            assert_eq!(violation.ride_id, ride_id());
            assert_eq!(violation.occurred_at, test_now());
        }
        SpeedCheck::WithinLimit => panic!("expected a violation"),
    }
}

#[test]
fn test_violations_inside_the_debounce_window_are_recorded_not_notified() {
    let mut monitor = monitor();

    monitor.check(&ride_id(), &driver_id(), 72.0, &pickup(), test_now());
    let check = monitor.check(
        &ride_id(),
        &driver_id(),
        75.0,
        &pickup(),
        test_now() + Duration::seconds(10),
    );

    // The breach is still recorded; only the warning is suppressed.
    match check {
        SpeedCheck::Exceeded { violation, notify } => {
            assert!(!notify);
            assert!((violation.speed_kmh - 75.0).abs() < f64::EPSILON);
        }
        SpeedCheck::WithinLimit => panic!("expected a violation"),
    }
}

#[test]
fn test_notification_resumes_after_the_debounce_window() {
    let mut monitor = monitor();

    monitor.check(&ride_id(), &driver_id(), 72.0, &pickup(), test_now());
    let check = monitor.check(
        &ride_id(),
        &driver_id(),
        72.0,
        &pickup(),
        test_now() + Duration::seconds(30),
    );

    assert!(matches!(
        check,
        SpeedCheck::Exceeded { notify: true, .. }
    ));
}

#[test]
fn test_within_limit_does_not_consume_the_debounce() {
    let mut monitor = monitor();

    monitor.check(&ride_id(), &driver_id(), 72.0, &pickup(), test_now());
    monitor.check(
        &ride_id(),
        &driver_id(),
        40.0,
        &pickup(),
        test_now() + Duration::seconds(31),
    );

    // Slowing down does not reset the window. The next breach after the
    // window still notifies.
    let check = monitor.check(
        &ride_id(),
        &driver_id(),
        72.0,
        &pickup(),
        test_now() + Duration::seconds(32),
    );
    assert!(matches!(
        check,
        SpeedCheck::Exceeded { notify: true, .. }
    ));
}

#[test]
fn test_turnaround_fires_inside_the_arrival_radius() {
    let detector = TurnaroundDetector::new(0.15);
    let mut state = create_test_state(true);
    state.ride.status = RideStatus::Active;

    // Roughly 50 meters from the drop point.
    let near_drop = Location::new(28.4599, 77.0266).unwrap();
    assert!(detector.should_turn_around(&state.ride, &near_drop));
}

#[test]
fn test_turnaround_does_not_fire_outside_the_radius() {
    let detector = TurnaroundDetector::new(0.15);
    let mut state = create_test_state(true);
    state.ride.status = RideStatus::Active;

    assert!(!detector.should_turn_around(&state.ride, &pickup()));
}

#[test]
fn test_turnaround_requires_round_trip_and_active() {
    let detector = TurnaroundDetector::new(0.15);

    let mut one_way = create_test_state(false);
    one_way.ride.status = RideStatus::Active;
    assert!(!detector.should_turn_around(&one_way.ride, &drop_point()));

    let accepted = create_test_state(true);
    assert!(!detector.should_turn_around(&accepted.ride, &drop_point()));
}

#[test]
fn test_turnaround_fires_only_on_the_outbound_leg() {
    let detector = TurnaroundDetector::new(0.15);
    let mut state = create_test_state(true);
    state.ride.status = RideStatus::Active;
    state.ride.is_return_leg = true;

    assert!(!detector.should_turn_around(&state.ride, &drop_point()));
}
