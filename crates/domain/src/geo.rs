// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Great-circle distance and per-driver speed derivation.
//!
//! Speed is derived purely from consecutive fixes: haversine distance over
//! elapsed wall-clock time. Fixes must arrive with strictly increasing
//! timestamps; anything else is rejected rather than risk division
//! artifacts from a near-zero elapsed time.

use crate::error::DomainError;
use crate::types::{DriverId, Location, RideId};
use serde::{Deserialize, Serialize};

/// Mean Earth radius in kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0;

const MS_PER_HOUR: f64 = 3_600_000.0;

/// Computes the great-circle (haversine) distance between two points, in km.
#[must_use]
pub fn haversine_km(a: &Location, b: &Location) -> f64 {
    let (lat1, lon1) = (a.lat().to_radians(), a.lng().to_radians());
    let (lat2, lon2) = (b.lat().to_radians(), b.lng().to_radians());
    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;
    let sin_dlat = (dlat * 0.5).sin();
    let sin_dlon = (dlon * 0.5).sin();
    let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlon * sin_dlon;
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_KM * c
}

/// A single device location fix attributed to a driver on a ride.
///
/// Fixes are ephemeral: only the most recent accepted fix is retained, for
/// deriving the next speed sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoFix {
    /// The driver that produced the fix.
    pub driver_id: DriverId,
    /// The ride the fix is attributed to.
    pub ride_id: RideId,
    /// The fix position.
    pub location: Location,
    /// Device timestamp in milliseconds since the Unix epoch.
    pub timestamp_ms: i64,
}

/// The result of ingesting one fix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedSample {
    /// Instantaneous speed in km/h. `None` for the first fix of a leg
    /// stream, which has no prior point.
    pub speed_kmh: Option<f64>,
    /// Distance covered since the previous accepted fix, in km.
    pub segment_km: f64,
    /// Cumulative distance for the current leg, in km.
    pub leg_distance_km: f64,
}

/// Per-driver speed and distance derivation over a fix stream.
///
/// One tracker exists per driver while a ride is active. `begin_leg` resets
/// the cumulative leg distance at the turnaround so the return-leg distance
/// can be billed separately.
#[derive(Debug, Clone, Default)]
pub struct SpeedTracker {
    /// The last accepted fix position and timestamp.
    last: Option<(Location, i64)>,
    /// Cumulative distance over the current leg, in km.
    leg_distance_km: f64,
}

impl SpeedTracker {
    /// Creates a tracker with no prior fix.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            last: None,
            leg_distance_km: 0.0,
        }
    }

    /// Ingests a fix, deriving speed from the previous accepted fix.
    ///
    /// # Arguments
    ///
    /// * `location` - The fix position
    /// * `timestamp_ms` - The fix timestamp in milliseconds
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidFixOrdering` if the timestamp does not
    /// strictly advance past the previous accepted fix. The rejected fix is
    /// not retained.
    pub fn ingest(
        &mut self,
        location: Location,
        timestamp_ms: i64,
    ) -> Result<SpeedSample, DomainError> {
        let Some((previous_location, previous_ms)) = self.last.take() else {
            self.last = Some((location, timestamp_ms));
            return Ok(SpeedSample {
                speed_kmh: None,
                segment_km: 0.0,
                leg_distance_km: self.leg_distance_km,
            });
        };

        if timestamp_ms <= previous_ms {
            // Restore the accepted fix; the out-of-order one is dropped.
            self.last = Some((previous_location, previous_ms));
            return Err(DomainError::InvalidFixOrdering {
                previous_ms,
                received_ms: timestamp_ms,
            });
        }

        let segment_km = haversine_km(&previous_location, &location);
        let elapsed_hours = (timestamp_ms - previous_ms) as f64 / MS_PER_HOUR;
        let speed_kmh = segment_km / elapsed_hours;

        self.leg_distance_km += segment_km;
        self.last = Some((location, timestamp_ms));

        Ok(SpeedSample {
            speed_kmh: Some(speed_kmh),
            segment_km,
            leg_distance_km: self.leg_distance_km,
        })
    }

    /// Resets the cumulative leg distance, keeping the last fix.
    ///
    /// Called at the turnaround so the return leg accumulates from zero.
    pub const fn begin_leg(&mut self) {
        self.leg_distance_km = 0.0;
    }

    /// Returns the cumulative distance for the current leg, in km.
    #[must_use]
    pub const fn leg_distance_km(&self) -> f64 {
        self.leg_distance_km
    }

    /// Returns the last accepted fix position, if any.
    #[must_use]
    pub const fn last_position(&self) -> Option<&Location> {
        match &self.last {
            Some((location, _)) => Some(location),
            None => None,
        }
    }
}
