// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Per-ride serialized dispatch over the pure broker.
//!
//! The dispatcher owns the canonical ride states. Every transition for a
//! ride goes through that ride's mutex, which is what decides acceptance
//! races: the first accept to take the lock wins. Different rides share
//! nothing and proceed in parallel.
//!
//! GPS fixes take a per-driver tracker lock for speed derivation and touch
//! the ride lock only for the violation and turnaround checks.

use std::collections::HashMap;
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use ride_dispatch::{
    BrokerSettings, Command, RideEvent, RideState, SpeedCheck, TurnaroundDetector,
    ViolationMonitor, apply,
};
use ride_dispatch_api::{
    ApiError, ApiResult, RideResponse, translate_core_error, translate_domain_error,
};
use ride_dispatch_audit::{Action, Actor, AuditEvent, AuditLog, Cause};
use ride_dispatch_domain::{
    GeoFix, RideStatus, SpeedSample, SpeedTracker, SpeedViolation,
};

/// Dispatcher tunables, assembled from the CLI in `main`.
#[derive(Debug, Clone, Copy)]
pub struct DispatchConfig {
    /// Broker tunables (offer window, fare parameters).
    pub broker: BrokerSettings,
    /// Speed ceiling in km/h.
    pub speed_limit_kmh: f64,
    /// Minimum interval between violation notifications.
    pub debounce: time::Duration,
    /// Arrival tolerance around the drop point, in km.
    pub arrival_radius_km: f64,
}

/// Everything the dispatcher tracks for one ride.
struct RideEntry {
    /// The canonical ride state.
    state: RideState,
    /// The per-ride speed ceiling monitor.
    monitor: ViolationMonitor,
    /// Every recorded violation, in occurrence order.
    violations: Vec<SpeedViolation>,
}

/// What one ingested fix produced, for the caller to render.
#[derive(Debug)]
pub struct FixReport {
    /// The derived speed sample.
    pub sample: SpeedSample,
    /// A recorded violation, and whether to notify about it.
    pub violation: Option<(SpeedViolation, bool)>,
    /// Events from a turnaround triggered by this fix.
    pub turnaround_events: Vec<RideEvent>,
}

/// The canonical ride registry with per-ride serialization.
pub struct Dispatcher {
    /// Ride states keyed by ride id.
    rides: RwLock<HashMap<String, Arc<Mutex<RideEntry>>>>,
    /// Per-driver speed trackers keyed by driver id.
    trackers: RwLock<HashMap<String, Arc<Mutex<SpeedTracker>>>>,
    /// Dispatcher tunables.
    config: DispatchConfig,
    /// The turnaround detector shared by all rides.
    turnaround: TurnaroundDetector,
    /// The append-only audit timeline.
    audit: Arc<AuditLog>,
}

impl Dispatcher {
    /// Creates an empty dispatcher.
    #[must_use]
    pub fn new(config: DispatchConfig, audit: Arc<AuditLog>) -> Self {
        Self {
            rides: RwLock::new(HashMap::new()),
            trackers: RwLock::new(HashMap::new()),
            turnaround: TurnaroundDetector::new(config.arrival_radius_km),
            config,
            audit,
        }
    }

    /// Returns the broker settings handlers must apply transitions with.
    #[must_use]
    pub const fn broker_settings(&self) -> &BrokerSettings {
        &self.config.broker
    }

    /// Registers a newly booked ride.
    ///
    /// # Errors
    ///
    /// Returns an error if a ride with this id already exists.
    pub async fn insert(&self, state: RideState) -> Result<(), ApiError> {
        let ride_id = state.ride.id.value().to_string();
        let mut rides = self.rides.write().await;
        if rides.contains_key(&ride_id) {
            return Err(ApiError::RideRuleViolation {
                rule: String::from("unique_ride_id"),
                message: format!("Ride '{ride_id}' already exists"),
            });
        }
        rides.insert(
            ride_id,
            Arc::new(Mutex::new(RideEntry {
                state,
                monitor: ViolationMonitor::new(self.config.speed_limit_kmh, self.config.debounce),
                violations: Vec::new(),
            })),
        );
        Ok(())
    }

    /// Looks a ride entry up.
    async fn entry(&self, ride_id: &str) -> Result<Arc<Mutex<RideEntry>>, ApiError> {
        let rides = self.rides.read().await;
        rides
            .get(ride_id)
            .cloned()
            .ok_or_else(|| ApiError::ResourceNotFound {
                resource_type: String::from("Ride"),
                message: format!("Ride '{ride_id}' does not exist"),
            })
    }

    /// Runs a transition under the ride's lock and commits the result.
    ///
    /// The closure sees a consistent snapshot; if it succeeds, the new
    /// state replaces the old one and the audit event is appended, all
    /// before the lock is released.
    ///
    /// # Errors
    ///
    /// Returns the closure's error untouched; the state is unchanged.
    pub async fn transition<F>(
        &self,
        ride_id: &str,
        operation: F,
    ) -> Result<ApiResult<RideResponse>, ApiError>
    where
        F: FnOnce(&RideState) -> Result<ApiResult<RideResponse>, ApiError>,
    {
        let entry = self.entry(ride_id).await?;
        let mut entry = entry.lock().await;

        let result = operation(&entry.state)?;
        entry.state = result.new_state.clone();
        self.audit.append(result.audit_event.clone());
        Ok(result)
    }

    /// Returns the current state of a ride.
    ///
    /// # Errors
    ///
    /// Returns an error if the ride does not exist.
    pub async fn snapshot(&self, ride_id: &str) -> Result<RideState, ApiError> {
        let entry = self.entry(ride_id).await?;
        let entry = entry.lock().await;
        Ok(entry.state.clone())
    }

    /// Returns all recorded violations for a ride, in occurrence order.
    ///
    /// # Errors
    ///
    /// Returns an error if the ride does not exist.
    pub async fn violations(&self, ride_id: &str) -> Result<Vec<SpeedViolation>, ApiError> {
        let entry = self.entry(ride_id).await?;
        let entry = entry.lock().await;
        Ok(entry.violations.clone())
    }

    /// Ingests one GPS fix from the assigned driver of an active ride.
    ///
    /// Derives the speed sample under the driver's tracker lock, then
    /// applies the ceiling check and the turnaround check under the ride
    /// lock. Every breach is recorded and audited; only its notification
    /// is subject to the debounce. A fix that lands within the arrival
    /// radius of a round trip's drop point completes the outbound leg.
    ///
    /// # Errors
    ///
    /// Returns an error if the ride does not exist, is not active, the
    /// sender is not the assigned driver, or the fix timestamp does not
    /// advance.
    pub async fn ingest_fix(
        &self,
        fix: &GeoFix,
        now: OffsetDateTime,
    ) -> Result<FixReport, ApiError> {
        let entry = self.entry(fix.ride_id.value()).await?;

        // Ride-scoped validation first so stray fixes never feed a tracker.
        {
            let entry = entry.lock().await;
            if entry.state.ride.status != RideStatus::Active {
                return Err(ApiError::RideRuleViolation {
                    rule: String::from("fixes_require_active"),
                    message: format!(
                        "Ride '{}' is not active; dropping location fix",
                        fix.ride_id
                    ),
                });
            }
            if entry.state.ride.assigned_driver.as_ref() != Some(&fix.driver_id) {
                return Err(ApiError::RideRuleViolation {
                    rule: String::from("assigned_driver_only"),
                    message: format!(
                        "Driver '{}' is not the assigned driver for ride '{}'",
                        fix.driver_id, fix.ride_id
                    ),
                });
            }
        }

        let tracker = self.tracker(fix.driver_id.value()).await;
        let sample = {
            let mut tracker = tracker.lock().await;
            tracker
                .ingest(fix.location.clone(), fix.timestamp_ms)
                .map_err(translate_domain_error)?
        };

        let mut entry_guard = entry.lock().await;

        let ride_key = entry_guard.state.ride.id.clone();
        let entry_mut = &mut *entry_guard;
        let violation = sample.speed_kmh.and_then(|speed_kmh| {
            match entry_mut
                .monitor
                .check(&ride_key, &fix.driver_id, speed_kmh, &fix.location, now)
            {
                SpeedCheck::WithinLimit => None,
                SpeedCheck::Exceeded { violation, notify } => Some((violation, notify)),
            }
        });

        if let Some((violation, notify)) = &violation {
            entry_mut.violations.push(violation.clone());
            self.audit
                .append(violation_audit_event(&entry_mut.state, violation, now));
            if *notify {
                warn!(
                    ride_id = %fix.ride_id,
                    driver_id = %fix.driver_id,
                    speed_kmh = violation.speed_kmh,
                    "Speed ceiling breached"
                );
            } else {
                debug!(
                    ride_id = %fix.ride_id,
                    driver_id = %fix.driver_id,
                    "Speed violation recorded (debounced)"
                );
            }
        }

        let mut turnaround_events = Vec::new();
        if self
            .turnaround
            .should_turn_around(&entry_guard.state.ride, &fix.location)
        {
            let result = apply(
                &entry_guard.state,
                Command::CompleteLeg {
                    driver: fix.driver_id.clone(),
                    at: fix.location.clone(),
                    return_distance_km: 0.0,
                },
                Actor::system(),
                Cause::new(
                    String::from("geo-fix"),
                    String::from("Arrival within turnaround radius"),
                ),
                now,
                &self.config.broker,
            )
            .map_err(translate_core_error)?;

            entry_guard.state = result.new_state.clone();
            self.audit.append(result.audit_event.clone());
            turnaround_events = result.events;

            // The return leg bills its own distance.
            let mut tracker = tracker.lock().await;
            tracker.begin_leg();
            info!(
                ride_id = %fix.ride_id,
                driver_id = %fix.driver_id,
                "Round trip turned around"
            );
        }

        Ok(FixReport {
            sample,
            violation,
            turnaround_events,
        })
    }

    /// Returns the cumulative distance of the driver's current leg, in km.
    pub async fn leg_distance_km(&self, driver_id: &str) -> f64 {
        let trackers = self.trackers.read().await;
        match trackers.get(driver_id) {
            Some(tracker) => tracker.lock().await.leg_distance_km(),
            None => 0.0,
        }
    }

    /// Fetches or creates the driver's speed tracker.
    async fn tracker(&self, driver_id: &str) -> Arc<Mutex<SpeedTracker>> {
        {
            let trackers = self.trackers.read().await;
            if let Some(tracker) = trackers.get(driver_id) {
                return tracker.clone();
            }
        }
        let mut trackers = self.trackers.write().await;
        trackers
            .entry(driver_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(SpeedTracker::new())))
            .clone()
    }
}

/// Builds the audit record for one speed violation.
fn violation_audit_event(
    state: &RideState,
    violation: &SpeedViolation,
    now: OffsetDateTime,
) -> AuditEvent {
    let snapshot = state.to_snapshot();
    AuditEvent::new(
        Actor::system(),
        Cause::new(
            String::from("geo-fix"),
            String::from("Derived speed exceeded the ceiling"),
        ),
        Action::new(
            String::from("SpeedViolation"),
            Some(format!(
                "Driver '{}' at {:.1} km/h against a {:.1} km/h ceiling",
                violation.driver_id, violation.speed_kmh, violation.max_allowed_kmh
            )),
        ),
        snapshot.clone(),
        snapshot,
        state.ride.id.clone(),
        now,
    )
}
