// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::types::RideStatus;

/// Errors that can occur during domain validation.
#[derive(Debug, Clone, PartialEq)]
pub enum DomainError {
    /// The ride is not in a state that accepts new candidate offers.
    RideNotOfferable {
        /// The ride identifier.
        ride_id: String,
        /// The current status of the ride.
        status: RideStatus,
    },
    /// Another driver already won the acceptance race for this ride.
    ///
    /// This is an expected outcome of concurrent accepts, not a fault.
    RideAlreadyAssigned {
        /// The ride identifier.
        ride_id: String,
    },
    /// The ride cannot be cancelled from its current state.
    ///
    /// Active rides must be ended via leg completion, never cancelled.
    InvalidCancelState {
        /// The ride identifier.
        ride_id: String,
        /// The current status of the ride.
        status: RideStatus,
    },
    /// The ride has already been completed and settled.
    RideAlreadyCompleted {
        /// The ride identifier.
        ride_id: String,
    },
    /// A location fix arrived with a non-increasing timestamp.
    InvalidFixOrdering {
        /// The timestamp of the previously accepted fix, in milliseconds.
        previous_ms: i64,
        /// The timestamp of the rejected fix, in milliseconds.
        received_ms: i64,
    },
    /// The candidate's offer window elapsed before the accept arrived.
    AssignmentExpired {
        /// The ride identifier.
        ride_id: String,
        /// The driver whose offer expired.
        driver_id: String,
    },
    /// No pending candidate exists for this (ride, driver) pair.
    CandidateNotFound {
        /// The ride identifier.
        ride_id: String,
        /// The driver identifier.
        driver_id: String,
    },
    /// A pending candidate already exists for this (ride, driver) pair.
    DuplicateCandidate {
        /// The ride identifier.
        ride_id: String,
        /// The driver identifier.
        driver_id: String,
    },
    /// The acting driver is not the driver assigned to the ride.
    NotAssignedDriver {
        /// The ride identifier.
        ride_id: String,
        /// The driver who attempted the action.
        driver_id: String,
    },
    /// The requested status transition is not permitted.
    InvalidStatusTransition {
        /// The current status.
        from: RideStatus,
        /// The requested status.
        to: RideStatus,
    },
    /// Latitude or longitude is outside the valid range.
    InvalidLocation {
        /// The latitude value.
        lat: f64,
        /// The longitude value.
        lng: f64,
    },
    /// The hourly rate is not a positive finite amount.
    InvalidHourlyRate {
        /// The invalid rate value.
        rate: f64,
    },
    /// The ride status string is not recognized.
    InvalidRideStatus(String),
    /// The vehicle type string is not recognized.
    InvalidVehicleType(String),
    /// An identifier is empty or malformed.
    InvalidIdentifier {
        /// The field that was invalid.
        field: &'static str,
    },
    /// The settlement window end precedes its start.
    InvalidSettlementWindow {
        /// The ride identifier.
        ride_id: String,
    },
}

impl std::fmt::Display for DomainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RideNotOfferable { ride_id, status } => {
                write!(
                    f,
                    "Ride '{ride_id}' is not offerable while {status} (offers require Searching)"
                )
            }
            Self::RideAlreadyAssigned { ride_id } => {
                write!(f, "Ride '{ride_id}' was already assigned to another driver")
            }
            Self::InvalidCancelState { ride_id, status } => {
                write!(
                    f,
                    "Ride '{ride_id}' cannot be cancelled while {status}; end it via leg completion"
                )
            }
            Self::RideAlreadyCompleted { ride_id } => {
                write!(f, "Ride '{ride_id}' is already completed and settled")
            }
            Self::InvalidFixOrdering {
                previous_ms,
                received_ms,
            } => {
                write!(
                    f,
                    "Location fix at {received_ms}ms does not advance past previous fix at {previous_ms}ms"
                )
            }
            Self::AssignmentExpired { ride_id, driver_id } => {
                write!(
                    f,
                    "Offer for ride '{ride_id}' to driver '{driver_id}' expired before resolution"
                )
            }
            Self::CandidateNotFound { ride_id, driver_id } => {
                write!(
                    f,
                    "No pending candidate for driver '{driver_id}' on ride '{ride_id}'"
                )
            }
            Self::DuplicateCandidate { ride_id, driver_id } => {
                write!(
                    f,
                    "Driver '{driver_id}' already holds a pending offer for ride '{ride_id}'"
                )
            }
            Self::NotAssignedDriver { ride_id, driver_id } => {
                write!(
                    f,
                    "Driver '{driver_id}' is not the assigned driver for ride '{ride_id}'"
                )
            }
            Self::InvalidStatusTransition { from, to } => {
                write!(f, "Invalid ride status transition: {from} -> {to}")
            }
            Self::InvalidLocation { lat, lng } => {
                write!(f, "Invalid location: lat={lat}, lng={lng}")
            }
            Self::InvalidHourlyRate { rate } => {
                write!(f, "Invalid hourly rate: {rate}. Must be positive and finite")
            }
            Self::InvalidRideStatus(value) => {
                write!(f, "Invalid ride status: '{value}'")
            }
            Self::InvalidVehicleType(value) => {
                write!(f, "Invalid vehicle type: '{value}'")
            }
            Self::InvalidIdentifier { field } => {
                write!(f, "Identifier '{field}' cannot be empty")
            }
            Self::InvalidSettlementWindow { ride_id } => {
                write!(
                    f,
                    "Ride '{ride_id}' completion time precedes its start time"
                )
            }
        }
    }
}

impl std::error::Error for DomainError {}
