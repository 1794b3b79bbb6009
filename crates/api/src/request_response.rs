// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! API request and response data transfer objects.

use ride_dispatch_domain::{FareBreakdown, Location, Ride, SpeedViolation};
use time::OffsetDateTime;

/// A location as it appears on the wire.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LocationInfo {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lng: f64,
    /// Optional display address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl From<&Location> for LocationInfo {
    fn from(location: &Location) -> Self {
        Self {
            lat: location.lat(),
            lng: location.lng(),
            address: location.address().map(String::from),
        }
    }
}

/// API request to book a new ride.
///
/// This DTO is distinct from domain types and represents the API contract.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CreateRideRequest {
    /// A client-supplied ride identifier.
    pub ride_id: String,
    /// The pickup location.
    pub pickup: LocationInfo,
    /// The drop location.
    pub drop: LocationInfo,
    /// When the ride is scheduled to begin.
    #[serde(with = "time::serde::rfc3339")]
    pub scheduled_at: OffsetDateTime,
    /// The requested vehicle type (sedan, hatchback, suv, truck, bus).
    pub vehicle_type: String,
    /// The booked hourly rate.
    pub hourly_rate: f64,
    /// Whether the ride returns to its pickup point.
    pub is_round_trip: bool,
}

/// API request to extend an offer to a driver.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct OfferRideRequest {
    /// The driver receiving the offer.
    pub driver_id: String,
}

/// API request for a driver accepting their offer.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AcceptRideRequest {
    /// The accepting driver.
    pub driver_id: String,
}

/// API request for a driver declining their offer.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DeclineRideRequest {
    /// The declining driver.
    pub driver_id: String,
    /// Whether the countdown expired rather than the driver pressing
    /// decline.
    #[serde(default)]
    pub timed_out: bool,
}

/// API request for the assigned driver starting the ride.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StartRideRequest {
    /// The assigned driver.
    pub driver_id: String,
    /// Where the ride started.
    pub at: LocationInfo,
}

/// API request for the assigned driver completing the current leg.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CompleteRideRequest {
    /// The assigned driver.
    pub driver_id: String,
    /// Where the leg ended.
    pub at: LocationInfo,
    /// Distance driven on the return leg, in km. Ignored for one-way
    /// rides and for the outbound leg of a round trip.
    #[serde(default)]
    pub return_distance_km: f64,
}

/// API request to cancel a ride before it becomes active.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CancelRideRequest {
    /// Why the ride is being cancelled.
    pub reason: String,
}

/// The settled fare as it appears on the wire.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FareBreakdownInfo {
    /// Actual elapsed ride duration in hours.
    pub ride_hours: f64,
    /// The hourly rate the ride was booked at.
    pub hourly_rate: f64,
    /// Duration charge after the billing floor or block rate.
    pub base_fare: f64,
    /// Distance driven on the return leg, in km.
    pub return_distance_km: f64,
    /// Per-kilometer charge for the return leg.
    pub return_charges: f64,
    /// The platform's cut of the final amount.
    pub platform_commission: f64,
    /// What the driver keeps.
    pub driver_earnings: f64,
    /// What the ride owner owes.
    pub final_amount: f64,
}

impl From<&FareBreakdown> for FareBreakdownInfo {
    fn from(fare: &FareBreakdown) -> Self {
        Self {
            ride_hours: fare.ride_hours,
            hourly_rate: fare.hourly_rate,
            base_fare: fare.base_fare,
            return_distance_km: fare.return_distance_km,
            return_charges: fare.return_charges,
            platform_commission: fare.platform_commission,
            driver_earnings: fare.driver_earnings,
            final_amount: fare.final_amount,
        }
    }
}

/// The ride as it appears on the wire.
///
/// Returned by every state-changing handler so clients always see the
/// resulting ride, and by the read-only lookup.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RideResponse {
    /// The ride identifier.
    pub ride_id: String,
    /// The booking owner.
    pub owner_id: String,
    /// The current ride status.
    pub status: String,
    /// The pickup location.
    pub pickup: LocationInfo,
    /// The drop location.
    pub drop: LocationInfo,
    /// When the ride is scheduled to begin.
    #[serde(with = "time::serde::rfc3339")]
    pub scheduled_at: OffsetDateTime,
    /// The requested vehicle type.
    pub vehicle_type: String,
    /// The booked hourly rate.
    pub hourly_rate: f64,
    /// Whether the ride returns to its pickup point.
    pub is_round_trip: bool,
    /// Whether a round trip is on its return leg.
    pub is_return_leg: bool,
    /// The assigned driver, when one exists.
    pub assigned_driver: Option<String>,
    /// When the ride started, when it has.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub started_at: Option<OffsetDateTime>,
    /// When the ride completed, when it has.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub completed_at: Option<OffsetDateTime>,
    /// The settled fare, once the ride completes.
    pub fare: Option<FareBreakdownInfo>,
}

impl From<&Ride> for RideResponse {
    fn from(ride: &Ride) -> Self {
        Self {
            ride_id: ride.id.value().to_string(),
            owner_id: ride.owner.value().to_string(),
            status: String::from(ride.status.as_str()),
            pickup: LocationInfo::from(&ride.pickup),
            drop: LocationInfo::from(&ride.drop),
            scheduled_at: ride.scheduled_at,
            vehicle_type: String::from(ride.vehicle_type.as_str()),
            hourly_rate: ride.hourly_rate,
            is_round_trip: ride.is_round_trip,
            is_return_leg: ride.is_return_leg,
            assigned_driver: ride
                .assigned_driver
                .as_ref()
                .map(|driver| driver.value().to_string()),
            started_at: ride.started_at,
            completed_at: ride.completed_at,
            fare: ride.fare.as_ref().map(FareBreakdownInfo::from),
        }
    }
}

/// A recorded speed violation as it appears on the wire.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ViolationInfo {
    /// The ride the violation occurred on.
    pub ride_id: String,
    /// The driver who produced it.
    pub driver_id: String,
    /// The derived speed in km/h.
    pub speed_kmh: f64,
    /// The ceiling that was breached.
    pub max_allowed_kmh: f64,
    /// Where the violation was measured.
    pub location: LocationInfo,
    /// When the violation occurred.
    #[serde(with = "time::serde::rfc3339")]
    pub occurred_at: OffsetDateTime,
}

impl From<&SpeedViolation> for ViolationInfo {
    fn from(violation: &SpeedViolation) -> Self {
        Self {
            ride_id: violation.ride_id.value().to_string(),
            driver_id: violation.driver_id.value().to_string(),
            speed_kmh: violation.speed_kmh,
            max_allowed_kmh: violation.max_allowed_kmh,
            location: LocationInfo::from(&violation.location),
            occurred_at: violation.occurred_at,
        }
    }
}
