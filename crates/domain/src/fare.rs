// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Fare settlement at ride completion.
//!
//! Settlement runs exactly once, at the Active → Completed transition.
//! Standard vehicles bill actual elapsed hours with a one-hour floor; heavy
//! vehicles bill a flat eight-hour block with an overtime rate beyond it.
//! The platform commission is a split of the final amount, not an addition
//! to it.

use crate::error::DomainError;
use crate::types::{RideId, VehicleType};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Minimum billable duration for standard vehicles, in hours.
pub const MIN_BILLED_HOURS: f64 = 1.0;

/// Block length for heavy-vehicle billing, in hours.
pub const HEAVY_BLOCK_HOURS: f64 = 8.0;

/// Overtime multiplier applied to the hourly rate beyond a heavy block.
pub const HEAVY_OVERTIME_MULTIPLIER: f64 = 1.5;

/// Default platform commission as a fraction of the final amount.
pub const DEFAULT_COMMISSION_RATE: f64 = 0.10;

/// Default per-kilometer rate for return-leg charges.
pub const DEFAULT_RETURN_PER_KM_RATE: f64 = 10.0;

const SECONDS_PER_HOUR: f64 = 3600.0;

/// Tunable settlement parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FareParams {
    /// Per-kilometer rate applied to return-leg distance.
    pub return_per_km_rate: f64,
    /// Platform commission as a fraction of the final amount.
    pub commission_rate: f64,
}

impl Default for FareParams {
    fn default() -> Self {
        Self {
            return_per_km_rate: DEFAULT_RETURN_PER_KM_RATE,
            commission_rate: DEFAULT_COMMISSION_RATE,
        }
    }
}

/// The settled charge for a completed ride.
///
/// Immutable once computed; re-settlement of a completed ride is rejected
/// upstream with `RideAlreadyCompleted`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FareBreakdown {
    /// The ride this breakdown settles.
    pub ride_id: RideId,
    /// Actual elapsed ride duration in hours.
    pub ride_hours: f64,
    /// The hourly rate the ride was booked at.
    pub hourly_rate: f64,
    /// Duration charge after the billing floor or block rate.
    pub base_fare: f64,
    /// Distance driven on the return leg, in km. Zero for one-way rides.
    pub return_distance_km: f64,
    /// Per-kilometer charge for the return leg.
    pub return_charges: f64,
    /// The platform's cut of the final amount.
    pub platform_commission: f64,
    /// What the driver keeps: final amount minus commission.
    pub driver_earnings: f64,
    /// What the ride owner owes: base fare plus return charges.
    pub final_amount: f64,
}

/// Rounds a currency amount to two decimal places.
fn round_currency(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Computes the duration charge for the billed hours.
///
/// Standard vehicles: actual hours with a [`MIN_BILLED_HOURS`] floor.
/// Heavy vehicles: a flat [`HEAVY_BLOCK_HOURS`] block at the hourly rate,
/// plus overtime hours at [`HEAVY_OVERTIME_MULTIPLIER`] times the rate.
fn duration_charge(ride_hours: f64, hourly_rate: f64, vehicle_type: VehicleType) -> f64 {
    if vehicle_type.is_heavy() {
        let block_amount = HEAVY_BLOCK_HOURS * hourly_rate;
        if ride_hours <= HEAVY_BLOCK_HOURS {
            block_amount
        } else {
            let overtime_hours = ride_hours - HEAVY_BLOCK_HOURS;
            block_amount + overtime_hours * hourly_rate * HEAVY_OVERTIME_MULTIPLIER
        }
    } else {
        ride_hours.max(MIN_BILLED_HOURS) * hourly_rate
    }
}

/// Settles the fare for a completed ride.
///
/// # Arguments
///
/// * `ride_id` - The ride being settled
/// * `started_at` - When the driver started the ride
/// * `completed_at` - When the final leg completed
/// * `hourly_rate` - The booked hourly rate
/// * `vehicle_type` - Selects hourly versus block billing
/// * `return_distance_km` - Distance driven on the return leg, zero if none
/// * `params` - Commission and return-rate tunables
///
/// # Errors
///
/// Returns an error if:
/// - `completed_at` precedes `started_at`
/// - the hourly rate is not positive and finite
pub fn settle(
    ride_id: &RideId,
    started_at: OffsetDateTime,
    completed_at: OffsetDateTime,
    hourly_rate: f64,
    vehicle_type: VehicleType,
    return_distance_km: f64,
    params: &FareParams,
) -> Result<FareBreakdown, DomainError> {
    if completed_at < started_at {
        return Err(DomainError::InvalidSettlementWindow {
            ride_id: ride_id.value().to_string(),
        });
    }
    if !hourly_rate.is_finite() || hourly_rate <= 0.0 {
        return Err(DomainError::InvalidHourlyRate { rate: hourly_rate });
    }

    let ride_hours = (completed_at - started_at).as_seconds_f64() / SECONDS_PER_HOUR;
    let base_fare = duration_charge(ride_hours, hourly_rate, vehicle_type);
    let return_charges = return_distance_km * params.return_per_km_rate;

    let final_amount = base_fare + return_charges;
    let platform_commission = final_amount * params.commission_rate;
    let driver_earnings = final_amount - platform_commission;

    Ok(FareBreakdown {
        ride_id: ride_id.clone(),
        ride_hours,
        hourly_rate,
        base_fare: round_currency(base_fare),
        return_distance_km,
        return_charges: round_currency(return_charges),
        platform_commission: round_currency(platform_commission),
        driver_earnings: round_currency(driver_earnings),
        final_amount: round_currency(final_amount),
    })
}
