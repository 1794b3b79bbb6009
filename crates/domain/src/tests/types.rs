// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::{
    AssignmentCandidate, CandidateOutcome, DomainError, DriverId, Location, OwnerId, Ride, RideId,
    RideStatus, VehicleType,
};
use std::str::FromStr;
use time::macros::datetime;

fn create_test_ride(is_round_trip: bool) -> Ride {
    let now = datetime!(2026-01-10 09:00 UTC);
    Ride::new(
        RideId::new("ride-1"),
        OwnerId::new("owner-1"),
        Location::new(28.6139, 77.2090).unwrap(),
        Location::new(28.4595, 77.0266).unwrap(),
        datetime!(2026-01-10 10:00 UTC),
        VehicleType::Sedan,
        100.0,
        is_round_trip,
        now,
    )
}

#[test]
fn test_new_ride_is_searching_with_no_driver() {
    let ride = create_test_ride(false);

    assert_eq!(ride.status, RideStatus::Searching);
    assert!(ride.assigned_driver.is_none());
    assert!(!ride.is_return_leg);
    assert!(ride.fare.is_none());
}

#[test]
fn test_status_transition_matrix() {
    use RideStatus::{Accepted, Active, Cancelled, Completed, Searching};

    assert!(Searching.can_transition_to(Accepted));
    assert!(Searching.can_transition_to(Cancelled));
    assert!(Accepted.can_transition_to(Active));
    assert!(Accepted.can_transition_to(Cancelled));
    assert!(Active.can_transition_to(Completed));

    // An active ride must end via leg completion, never cancellation.
    assert!(!Active.can_transition_to(Cancelled));
    assert!(!Searching.can_transition_to(Active));
    assert!(!Searching.can_transition_to(Completed));
    assert!(!Completed.can_transition_to(Active));
    assert!(!Cancelled.can_transition_to(Searching));
}

#[test]
fn test_terminal_statuses() {
    assert!(RideStatus::Completed.is_terminal());
    assert!(RideStatus::Cancelled.is_terminal());
    assert!(!RideStatus::Searching.is_terminal());
    assert!(!RideStatus::Accepted.is_terminal());
    assert!(!RideStatus::Active.is_terminal());
}

#[test]
fn test_driver_required_iff_assigned_statuses() {
    assert!(RideStatus::Accepted.requires_assigned_driver());
    assert!(RideStatus::Active.requires_assigned_driver());
    assert!(RideStatus::Completed.requires_assigned_driver());
    assert!(!RideStatus::Searching.requires_assigned_driver());
    assert!(!RideStatus::Cancelled.requires_assigned_driver());
}

#[test]
fn test_status_round_trips_through_strings() {
    for status in [
        RideStatus::Searching,
        RideStatus::Accepted,
        RideStatus::Active,
        RideStatus::Completed,
        RideStatus::Cancelled,
    ] {
        assert_eq!(RideStatus::from_str(status.as_str()).unwrap(), status);
    }

    assert!(matches!(
        RideStatus::from_str("ringing"),
        Err(DomainError::InvalidRideStatus(_))
    ));
}

#[test]
fn test_vehicle_type_heavy_classification() {
    assert!(VehicleType::Truck.is_heavy());
    assert!(VehicleType::Bus.is_heavy());
    assert!(!VehicleType::Sedan.is_heavy());
    assert!(!VehicleType::Hatchback.is_heavy());
    assert!(!VehicleType::Suv.is_heavy());
}

#[test]
fn test_vehicle_type_parse_rejects_unknown() {
    assert_eq!(VehicleType::from_str("truck").unwrap(), VehicleType::Truck);
    assert!(matches!(
        VehicleType::from_str("rickshaw"),
        Err(DomainError::InvalidVehicleType(_))
    ));
}

#[test]
fn test_location_rejects_out_of_range_coordinates() {
    assert!(Location::new(91.0, 0.0).is_err());
    assert!(Location::new(-91.0, 0.0).is_err());
    assert!(Location::new(0.0, 181.0).is_err());
    assert!(Location::new(0.0, -181.0).is_err());
    assert!(Location::new(f64::NAN, 0.0).is_err());
    assert!(Location::new(45.0, 90.0).is_ok());
}

#[test]
fn test_current_destination_flips_on_return_leg() {
    let mut ride = create_test_ride(true);

    assert_eq!(ride.current_destination(), &ride.drop.clone());

    ride.is_return_leg = true;
    assert_eq!(ride.current_destination(), &ride.pickup.clone());
}

#[test]
fn test_new_candidate_is_pending() {
    let offered_at = datetime!(2026-01-10 09:05 UTC);
    let candidate = AssignmentCandidate::new(
        RideId::new("ride-1"),
        DriverId::new("driver-1"),
        offered_at,
        offered_at + time::Duration::seconds(60),
    );

    assert_eq!(candidate.outcome, CandidateOutcome::Pending);
    assert!(candidate.is_pending());
}
