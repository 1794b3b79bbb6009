// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

#![deny(
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    clippy::style,
    clippy::correctness,
    clippy::all,
    clippy::suspicious,
    clippy::complexity,
    clippy::perf,
    clippy::unwrap_used,
    clippy::expect_used
)]

mod error;
mod fare;
mod geo;
mod types;
mod validation;

#[cfg(test)]
mod tests;

pub use error::DomainError;
pub use fare::{
    DEFAULT_COMMISSION_RATE, DEFAULT_RETURN_PER_KM_RATE, FareBreakdown, FareParams,
    HEAVY_BLOCK_HOURS, HEAVY_OVERTIME_MULTIPLIER, MIN_BILLED_HOURS, settle,
};
pub use geo::{GeoFix, SpeedSample, SpeedTracker, haversine_km};
pub use types::{
    AssignmentCandidate, CandidateOutcome, DeclineReason, DriverId, Location, OwnerId, Ride,
    RideId, RideStatus, SpeedViolation, VehicleType,
};
pub use validation::{validate_hourly_rate, validate_identifier};
