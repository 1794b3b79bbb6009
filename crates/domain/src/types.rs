// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::error::DomainError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use time::OffsetDateTime;

/// Represents a ride identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RideId {
    /// The identifier value.
    value: String,
}

impl RideId {
    /// Creates a new `RideId`.
    ///
    /// # Arguments
    ///
    /// * `value` - The identifier value
    #[must_use]
    pub fn new(value: &str) -> Self {
        Self {
            value: value.to_string(),
        }
    }

    /// Returns the identifier value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }
}

impl std::fmt::Display for RideId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value)
    }
}

/// Represents a driver identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DriverId {
    /// The identifier value.
    value: String,
}

impl DriverId {
    /// Creates a new `DriverId`.
    ///
    /// # Arguments
    ///
    /// * `value` - The identifier value
    #[must_use]
    pub fn new(value: &str) -> Self {
        Self {
            value: value.to_string(),
        }
    }

    /// Returns the identifier value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }
}

impl std::fmt::Display for DriverId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value)
    }
}

/// Represents a ride owner (requester) identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnerId {
    /// The identifier value.
    value: String,
}

impl OwnerId {
    /// Creates a new `OwnerId`.
    ///
    /// # Arguments
    ///
    /// * `value` - The identifier value
    #[must_use]
    pub fn new(value: &str) -> Self {
        Self {
            value: value.to_string(),
        }
    }

    /// Returns the identifier value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }
}

impl std::fmt::Display for OwnerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value)
    }
}

/// A geographic point with an optional human-readable address.
///
/// Latitude and longitude are validated at construction; an invalid pair
/// never enters the system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Latitude in degrees, in `[-90, 90]`.
    lat: f64,
    /// Longitude in degrees, in `[-180, 180]`.
    lng: f64,
    /// Optional display address.
    address: Option<String>,
}

impl Location {
    /// Creates a new `Location`.
    ///
    /// # Arguments
    ///
    /// * `lat` - Latitude in degrees
    /// * `lng` - Longitude in degrees
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidLocation` if either coordinate is
    /// non-finite or outside its valid range.
    pub fn new(lat: f64, lng: f64) -> Result<Self, DomainError> {
        if !lat.is_finite() || !lng.is_finite() || !(-90.0..=90.0).contains(&lat)
            || !(-180.0..=180.0).contains(&lng)
        {
            return Err(DomainError::InvalidLocation { lat, lng });
        }
        Ok(Self {
            lat,
            lng,
            address: None,
        })
    }

    /// Attaches a display address to this location.
    #[must_use]
    pub fn with_address(mut self, address: &str) -> Self {
        self.address = Some(address.to_string());
        self
    }

    /// Returns the latitude in degrees.
    #[must_use]
    pub const fn lat(&self) -> f64 {
        self.lat
    }

    /// Returns the longitude in degrees.
    #[must_use]
    pub const fn lng(&self) -> f64 {
        self.lng
    }

    /// Returns the display address if set.
    #[must_use]
    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }
}

/// Vehicle classification for a ride.
///
/// Heavy vehicles (trucks and buses) are billed by block rate rather than
/// plain hourly billing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleType {
    /// Standard sedan.
    Sedan,
    /// Standard hatchback.
    Hatchback,
    /// Sport utility vehicle.
    Suv,
    /// Heavy goods vehicle.
    Truck,
    /// Passenger bus.
    Bus,
}

impl VehicleType {
    /// Returns the string representation of the vehicle type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Sedan => "sedan",
            Self::Hatchback => "hatchback",
            Self::Suv => "suv",
            Self::Truck => "truck",
            Self::Bus => "bus",
        }
    }

    /// Returns whether this vehicle type is billed by block rate.
    #[must_use]
    pub const fn is_heavy(&self) -> bool {
        matches!(self, Self::Truck | Self::Bus)
    }
}

impl FromStr for VehicleType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sedan" => Ok(Self::Sedan),
            "hatchback" => Ok(Self::Hatchback),
            "suv" => Ok(Self::Suv),
            "truck" => Ok(Self::Truck),
            "bus" => Ok(Self::Bus),
            _ => Err(DomainError::InvalidVehicleType(s.to_string())),
        }
    }
}

impl std::fmt::Display for VehicleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle states of a ride.
///
/// The broker is the sole owner of status transitions. Completed and
/// Cancelled are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RideStatus {
    /// Looking for a driver. Candidate offers are only valid here.
    #[default]
    Searching,
    /// A driver won the acceptance race but has not started driving.
    Accepted,
    /// The ride is underway (including a round trip's return leg).
    Active,
    /// The ride ended and the fare was settled.
    Completed,
    /// The ride was cancelled before it became active.
    Cancelled,
}

impl RideStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Searching => "searching",
            Self::Accepted => "accepted",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Returns true if this status is terminal.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Returns whether a driver must be assigned in this status.
    ///
    /// Invariant: `assigned_driver` is set if and only if this returns true.
    #[must_use]
    pub const fn requires_assigned_driver(&self) -> bool {
        matches!(self, Self::Accepted | Self::Active | Self::Completed)
    }

    /// Checks if a transition from this status to another is valid.
    ///
    /// Valid transitions are:
    /// - Searching → Accepted
    /// - Searching → Cancelled
    /// - Accepted → Active
    /// - Accepted → Cancelled
    /// - Active → Completed
    #[must_use]
    pub const fn can_transition_to(&self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Searching, Self::Accepted)
                | (Self::Searching | Self::Accepted, Self::Cancelled)
                | (Self::Accepted, Self::Active)
                | (Self::Active, Self::Completed)
        )
    }
}

impl FromStr for RideStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "searching" => Ok(Self::Searching),
            "accepted" => Ok(Self::Accepted),
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(DomainError::InvalidRideStatus(s.to_string())),
        }
    }
}

impl std::fmt::Display for RideStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One owner-to-driver booking, from assignment through settlement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ride {
    /// The ride identifier.
    pub id: RideId,
    /// The owner who requested the ride.
    pub owner: OwnerId,
    /// The current lifecycle status.
    pub status: RideStatus,
    /// The pickup location.
    pub pickup: Location,
    /// The drop location. For a round trip this is the turnaround point;
    /// billing for the return leg ends back at `pickup`.
    pub drop: Location,
    /// When the ride is scheduled to begin.
    pub scheduled_at: OffsetDateTime,
    /// The vehicle classification, which selects the billing scheme.
    pub vehicle_type: VehicleType,
    /// The hourly rate agreed for this ride.
    pub hourly_rate: f64,
    /// Whether the driver returns to the pickup point after the drop.
    pub is_round_trip: bool,
    /// Whether the driver is on the return leg. Only meaningful when
    /// `is_round_trip`; can flip to true only while Active, exactly once.
    pub is_return_leg: bool,
    /// The winning driver. Set if and only if status requires one.
    pub assigned_driver: Option<DriverId>,
    /// When the driver started the ride.
    pub started_at: Option<OffsetDateTime>,
    /// Where the driver started the ride.
    pub start_location: Option<Location>,
    /// When the ride completed.
    pub completed_at: Option<OffsetDateTime>,
    /// Where the final leg completed.
    pub end_location: Option<Location>,
    /// The settled fare. Computed exactly once at completion.
    pub fare: Option<crate::fare::FareBreakdown>,
    /// When the ride was created.
    pub created_at: OffsetDateTime,
    /// When the ride was last mutated.
    pub updated_at: OffsetDateTime,
}

impl Ride {
    /// Creates a new ride in the Searching state.
    ///
    /// # Arguments
    ///
    /// * `id` - The ride identifier
    /// * `owner` - The requesting owner
    /// * `pickup` - The pickup location
    /// * `drop` - The drop location
    /// * `scheduled_at` - When the ride should begin
    /// * `vehicle_type` - The vehicle classification
    /// * `hourly_rate` - The agreed hourly rate
    /// * `is_round_trip` - Whether a return leg is booked
    /// * `now` - The creation timestamp
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub const fn new(
        id: RideId,
        owner: OwnerId,
        pickup: Location,
        drop: Location,
        scheduled_at: OffsetDateTime,
        vehicle_type: VehicleType,
        hourly_rate: f64,
        is_round_trip: bool,
        now: OffsetDateTime,
    ) -> Self {
        Self {
            id,
            owner,
            status: RideStatus::Searching,
            pickup,
            drop,
            scheduled_at,
            vehicle_type,
            hourly_rate,
            is_round_trip,
            is_return_leg: false,
            assigned_driver: None,
            started_at: None,
            start_location: None,
            completed_at: None,
            end_location: None,
            fare: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns the location the current leg is heading toward.
    ///
    /// On the return leg of a round trip the billing drop becomes the
    /// original pickup.
    #[must_use]
    pub const fn current_destination(&self) -> &Location {
        if self.is_return_leg {
            &self.pickup
        } else {
            &self.drop
        }
    }
}

/// A recorded breach of the speed ceiling.
///
/// Immutable once created. Every breach is recorded for audit even when its
/// notification is suppressed by debouncing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeedViolation {
    /// The ride during which the breach occurred.
    pub ride_id: RideId,
    /// The driver who breached the ceiling.
    pub driver_id: DriverId,
    /// The measured speed in km/h.
    pub speed_kmh: f64,
    /// The ceiling in force at the time, in km/h.
    pub max_allowed_kmh: f64,
    /// Where the breach was measured.
    pub location: Location,
    /// When the breach was measured.
    pub occurred_at: OffsetDateTime,
}

/// Outcome states of an assignment candidate.
///
/// At most one candidate per ride ever reaches `Accepted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateOutcome {
    /// Offered and awaiting driver action.
    Pending,
    /// The driver won the acceptance race.
    Accepted,
    /// The driver explicitly declined.
    Declined,
    /// The offer window elapsed, another driver won, or the ride was
    /// cancelled while the offer was pending.
    Expired,
}

impl CandidateOutcome {
    /// Returns the string representation of the outcome.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Declined => "declined",
            Self::Expired => "expired",
        }
    }
}

impl std::fmt::Display for CandidateOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The reason a pending candidate resolved without acceptance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclineReason {
    /// The driver explicitly declined the offer.
    Declined,
    /// The offer countdown reached zero without driver action.
    TimedOut,
}

/// One driver's pending offer for a ride.
///
/// Multiple candidates may exist concurrently for one ride; the broker
/// invalidates the rest the instant one accepts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentCandidate {
    /// The ride this offer is for.
    pub ride_id: RideId,
    /// The driver the ride was offered to.
    pub driver_id: DriverId,
    /// When the offer was extended.
    pub offered_at: OffsetDateTime,
    /// When the offer lapses if unresolved.
    pub expires_at: OffsetDateTime,
    /// The resolution of this offer.
    pub outcome: CandidateOutcome,
}

impl AssignmentCandidate {
    /// Creates a new pending candidate.
    ///
    /// # Arguments
    ///
    /// * `ride_id` - The ride being offered
    /// * `driver_id` - The driver receiving the offer
    /// * `offered_at` - When the offer was extended
    /// * `expires_at` - When the offer lapses
    #[must_use]
    pub const fn new(
        ride_id: RideId,
        driver_id: DriverId,
        offered_at: OffsetDateTime,
        expires_at: OffsetDateTime,
    ) -> Self {
        Self {
            ride_id,
            driver_id,
            offered_at,
            expires_at,
            outcome: CandidateOutcome::Pending,
        }
    }

    /// Returns whether this candidate is still awaiting resolution.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self.outcome, CandidateOutcome::Pending)
    }
}
