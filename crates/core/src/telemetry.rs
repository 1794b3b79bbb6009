// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Speed ceiling enforcement and round-trip turnaround detection.
//!
//! Both operate on derived speed samples from the GPS fix stream of an
//! active ride. Violations are always recorded; only their notifications
//! are debounced, so a driver continuously over the limit cannot flood the
//! channel.

use ride_dispatch_domain::{DriverId, Location, Ride, RideId, RideStatus, SpeedViolation,
    haversine_km};
use time::{Duration, OffsetDateTime};

/// Default speed ceiling in km/h.
pub const DEFAULT_SPEED_LIMIT_KMH: f64 = 60.0;

/// Default minimum interval between violation notifications.
pub const DEFAULT_DEBOUNCE: Duration = Duration::seconds(30);

/// Default arrival tolerance around the drop point, in km.
pub const DEFAULT_ARRIVAL_RADIUS_KM: f64 = 0.15;

/// The outcome of checking one speed sample against the ceiling.
#[derive(Debug, Clone, PartialEq)]
pub enum SpeedCheck {
    /// The sample is at or under the ceiling.
    WithinLimit,
    /// The sample breached the ceiling.
    Exceeded {
        /// The violation record, to be appended to the audit trail
        /// unconditionally.
        violation: SpeedViolation,
        /// Whether a warning notification should go out, or is suppressed
        /// by the debounce window.
        notify: bool,
    },
}

/// Applies the speed ceiling to a ride's speed samples, debouncing
/// notifications.
///
/// One monitor exists per ride. The monitor records every breach; the
/// `notify` flag only governs whether the owner/admin channel hears about
/// this particular one.
#[derive(Debug, Clone)]
pub struct ViolationMonitor {
    /// The ceiling in km/h.
    max_allowed_kmh: f64,
    /// Minimum interval between notifications.
    debounce: Duration,
    /// When the last notification went out.
    last_notified: Option<OffsetDateTime>,
}

impl ViolationMonitor {
    /// Creates a monitor with the given ceiling and debounce window.
    #[must_use]
    pub const fn new(max_allowed_kmh: f64, debounce: Duration) -> Self {
        Self {
            max_allowed_kmh,
            debounce,
            last_notified: None,
        }
    }

    /// Returns the ceiling in km/h.
    #[must_use]
    pub const fn max_allowed_kmh(&self) -> f64 {
        self.max_allowed_kmh
    }

    /// Checks one speed sample.
    ///
    /// # Arguments
    ///
    /// * `ride_id` - The active ride the sample belongs to
    /// * `driver_id` - The driver who produced the sample
    /// * `speed_kmh` - The derived speed
    /// * `location` - Where the sample was measured
    /// * `now` - The server-side timestamp
    pub fn check(
        &mut self,
        ride_id: &RideId,
        driver_id: &DriverId,
        speed_kmh: f64,
        location: &Location,
        now: OffsetDateTime,
    ) -> SpeedCheck {
        if speed_kmh <= self.max_allowed_kmh {
            return SpeedCheck::WithinLimit;
        }

        let notify = self
            .last_notified
            .is_none_or(|last| now - last >= self.debounce);
        if notify {
            self.last_notified = Some(now);
        }

        SpeedCheck::Exceeded {
            violation: SpeedViolation {
                ride_id: ride_id.clone(),
                driver_id: driver_id.clone(),
                speed_kmh,
                max_allowed_kmh: self.max_allowed_kmh,
                location: location.clone(),
                occurred_at: now,
            },
            notify,
        }
    }
}

impl Default for ViolationMonitor {
    fn default() -> Self {
        Self::new(DEFAULT_SPEED_LIMIT_KMH, DEFAULT_DEBOUNCE)
    }
}

/// Detects when a round-trip ride reaches its drop point.
///
/// Only fires while the ride is active, round trip, and still on the
/// outbound leg; the caller then issues `CompleteLeg` through the broker,
/// which flips the ride onto its return leg.
#[derive(Debug, Clone, Copy)]
pub struct TurnaroundDetector {
    /// Arrival tolerance around the drop point, in km.
    arrival_radius_km: f64,
}

impl TurnaroundDetector {
    /// Creates a detector with the given arrival radius.
    #[must_use]
    pub const fn new(arrival_radius_km: f64) -> Self {
        Self { arrival_radius_km }
    }

    /// Returns whether the position triggers the turnaround for this ride.
    #[must_use]
    pub fn should_turn_around(&self, ride: &Ride, position: &Location) -> bool {
        ride.is_round_trip
            && ride.status == RideStatus::Active
            && !ride.is_return_leg
            && haversine_km(position, &ride.drop) <= self.arrival_radius_km
    }
}

impl Default for TurnaroundDetector {
    fn default() -> Self {
        Self::new(DEFAULT_ARRIVAL_RADIUS_KM)
    }
}
