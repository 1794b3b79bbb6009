// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::{DomainError, FareParams, RideId, VehicleType, settle};
use time::macros::datetime;

fn ride_id() -> RideId {
    RideId::new("ride-1")
}

/// Contract scenario: rate 100, 10:00 → 11:30, no return leg.
#[test]
fn test_ninety_minute_sedan_ride() {
    let breakdown = settle(
        &ride_id(),
        datetime!(2026-01-10 10:00 UTC),
        datetime!(2026-01-10 11:30 UTC),
        100.0,
        VehicleType::Sedan,
        0.0,
        &FareParams::default(),
    )
    .unwrap();

    assert!((breakdown.ride_hours - 1.5).abs() < 1e-9);
    assert!((breakdown.base_fare - 150.0).abs() < 1e-9);
    assert!((breakdown.return_charges - 0.0).abs() < 1e-9);
    assert!((breakdown.platform_commission - 15.0).abs() < 1e-9);
    assert!((breakdown.driver_earnings - 135.0).abs() < 1e-9);
    assert!((breakdown.final_amount - 150.0).abs() < 1e-9);
}

/// A ride shorter than an hour still bills the one-hour floor.
#[test]
fn test_short_ride_bills_minimum_hour() {
    let breakdown = settle(
        &ride_id(),
        datetime!(2026-01-10 10:00 UTC),
        datetime!(2026-01-10 10:20 UTC),
        120.0,
        VehicleType::Hatchback,
        0.0,
        &FareParams::default(),
    )
    .unwrap();

    assert!((breakdown.base_fare - 120.0).abs() < 1e-9);
    // Recorded hours stay actual even when the floor applies.
    assert!((breakdown.ride_hours - (1.0 / 3.0)).abs() < 1e-6);
}

#[test]
fn test_return_charges_and_commission_split() {
    let breakdown = settle(
        &ride_id(),
        datetime!(2026-01-10 10:00 UTC),
        datetime!(2026-01-10 12:00 UTC),
        100.0,
        VehicleType::Suv,
        12.5,
        &FareParams::default(),
    )
    .unwrap();

    // base 200 + return 12.5 * 10.0 = 125 => final 325
    assert!((breakdown.return_charges - 125.0).abs() < 1e-9);
    assert!((breakdown.final_amount - 325.0).abs() < 1e-9);
    assert!((breakdown.platform_commission - 32.5).abs() < 1e-9);
    assert!((breakdown.driver_earnings - 292.5).abs() < 1e-9);
    // Commission is a split of the final amount, never an addition.
    assert!(
        (breakdown.driver_earnings + breakdown.platform_commission - breakdown.final_amount).abs()
            < 1e-9
    );
}

/// A heavy vehicle bills a flat eight-hour block even for shorter rides.
#[test]
fn test_heavy_vehicle_block_rate() {
    let breakdown = settle(
        &ride_id(),
        datetime!(2026-01-10 08:00 UTC),
        datetime!(2026-01-10 11:00 UTC),
        50.0,
        VehicleType::Truck,
        0.0,
        &FareParams::default(),
    )
    .unwrap();

    assert!((breakdown.base_fare - 400.0).abs() < 1e-9);
}

/// Beyond the block, heavy hours bill at 1.5x the hourly rate.
#[test]
fn test_heavy_vehicle_overtime_beyond_block() {
    let breakdown = settle(
        &ride_id(),
        datetime!(2026-01-10 08:00 UTC),
        datetime!(2026-01-10 18:00 UTC),
        50.0,
        VehicleType::Bus,
        0.0,
        &FareParams::default(),
    )
    .unwrap();

    // 8h block at 400 + 2h overtime at 75/h = 550
    assert!((breakdown.base_fare - 550.0).abs() < 1e-9);
}

#[test]
fn test_settlement_rejects_reversed_window() {
    let result = settle(
        &ride_id(),
        datetime!(2026-01-10 12:00 UTC),
        datetime!(2026-01-10 10:00 UTC),
        100.0,
        VehicleType::Sedan,
        0.0,
        &FareParams::default(),
    );

    assert!(matches!(
        result,
        Err(DomainError::InvalidSettlementWindow { .. })
    ));
}

#[test]
fn test_settlement_rejects_non_positive_rate() {
    let result = settle(
        &ride_id(),
        datetime!(2026-01-10 10:00 UTC),
        datetime!(2026-01-10 11:00 UTC),
        0.0,
        VehicleType::Sedan,
        0.0,
        &FareParams::default(),
    );

    assert!(matches!(result, Err(DomainError::InvalidHourlyRate { .. })));
}
