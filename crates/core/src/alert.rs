// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Per-candidate alert session: countdown, alert pulse, and accept/decline
//! resolution.
//!
//! The session is a pure state machine. Inputs come from the driver, the
//! one-second tick source, and the broker (grant/loss/invalidation);
//! outputs are effects the runtime renders through an alert sink and the
//! dispatch API. The countdown runs on the client side of the channel so a
//! driver is never left ringing if the channel silently drops messages —
//! the broker enforces its own offer expiry independently.

use ride_dispatch_domain::{DeclineReason, DriverId, Location, RideId, haversine_km};

/// Offer countdown length in seconds.
pub const COUNTDOWN_SECS: u32 = 60;

/// Seconds between audible/haptic alert pulses while ringing.
pub const PULSE_PERIOD_SECS: u32 = 4;

/// Average speed assumed for the decision-support duration estimate, km/h.
pub const ESTIMATE_AVG_SPEED_KMH: f64 = 40.0;

/// Straight-line decision-support estimate shown while ringing.
///
/// Never used for billing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RideEstimate {
    /// Straight-line pickup to drop distance, in km.
    pub distance_km: f64,
    /// Rough duration at the assumed average speed, in minutes.
    pub duration_mins: f64,
}

impl RideEstimate {
    /// Computes the estimate for a pickup/drop pair.
    #[must_use]
    pub fn between(pickup: &Location, drop: &Location) -> Self {
        let distance_km = haversine_km(pickup, drop);
        let duration_mins = distance_km / ESTIMATE_AVG_SPEED_KMH * 60.0;
        Self {
            distance_km,
            duration_mins,
        }
    }
}

/// Alert session states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertState {
    /// Counting down, pulsing the alert, awaiting driver action.
    Ringing,
    /// Accept submitted; awaiting the broker's race decision.
    Accepting,
    /// Final. No further inputs have any effect.
    Resolved(Resolution),
}

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// This driver won the assignment.
    Won,
    /// Another driver won the race. Distinct from a user decline: the UI
    /// shows "ride no longer available", not an error.
    Lost,
    /// The driver explicitly declined.
    Declined,
    /// The countdown reached zero without driver action.
    TimedOut,
    /// The broker withdrew the offer (expiry or ride cancellation).
    Invalidated,
}

/// Inputs to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertInput {
    /// One second elapsed.
    Tick,
    /// The driver pressed accept.
    Accept,
    /// The driver pressed decline.
    Decline,
    /// The broker granted the accept.
    AcceptGranted,
    /// The broker reported the race as already won by someone else.
    AcceptLost,
    /// The broker withdrew the offer.
    Invalidate,
}

/// Effects the runtime must render for an input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertEffect {
    /// Fire one audible/haptic pulse.
    Pulse,
    /// Stop the audible/haptic alert immediately.
    StopAlert,
    /// Submit `resolveAccept` to the broker.
    SubmitAccept,
    /// Submit `resolveDecline` to the broker.
    SubmitDecline(DeclineReason),
    /// Dismiss the alert UI with the given resolution.
    Dismiss(Resolution),
}

/// Per-candidate alert lifecycle.
///
/// Created when an offer arrives; driven by one-second ticks until
/// resolved. Pulse and countdown stop the instant the session leaves
/// `Ringing`, whatever the cause.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertSession {
    /// The offered ride.
    pub ride_id: RideId,
    /// The driver holding the offer.
    pub driver_id: DriverId,
    /// The current state.
    pub state: AlertState,
    /// Seconds left on the countdown.
    pub remaining_secs: u32,
    /// The decision-support estimate displayed while ringing.
    pub estimate: RideEstimate,
    /// Seconds since the last pulse fired.
    secs_since_pulse: u32,
}

impl AlertSession {
    /// Opens a session for a new offer, returning the initial effects
    /// (the first alert pulse).
    ///
    /// # Arguments
    ///
    /// * `ride_id` - The offered ride
    /// * `driver_id` - The driver receiving the offer
    /// * `pickup` - The pickup location, for the estimate
    /// * `drop` - The drop location, for the estimate
    #[must_use]
    pub fn open(
        ride_id: RideId,
        driver_id: DriverId,
        pickup: &Location,
        drop: &Location,
    ) -> (Self, Vec<AlertEffect>) {
        let session = Self {
            ride_id,
            driver_id,
            state: AlertState::Ringing,
            remaining_secs: COUNTDOWN_SECS,
            estimate: RideEstimate::between(pickup, drop),
            secs_since_pulse: 0,
        };
        (session, vec![AlertEffect::Pulse])
    }

    /// Returns whether the session reached a final state.
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        matches!(self.state, AlertState::Resolved(_))
    }

    /// Feeds one input through the machine, returning the effects to render.
    ///
    /// Inputs arriving after resolution are ignored.
    pub fn handle(&mut self, input: AlertInput) -> Vec<AlertEffect> {
        match (self.state, input) {
            (AlertState::Ringing, AlertInput::Tick) => {
                self.remaining_secs = self.remaining_secs.saturating_sub(1);
                if self.remaining_secs == 0 {
                    self.state = AlertState::Resolved(Resolution::TimedOut);
                    return vec![
                        AlertEffect::StopAlert,
                        AlertEffect::SubmitDecline(DeclineReason::TimedOut),
                        AlertEffect::Dismiss(Resolution::TimedOut),
                    ];
                }
                self.secs_since_pulse += 1;
                if self.secs_since_pulse >= PULSE_PERIOD_SECS {
                    self.secs_since_pulse = 0;
                    return vec![AlertEffect::Pulse];
                }
                Vec::new()
            }
            (AlertState::Ringing, AlertInput::Accept) => {
                self.state = AlertState::Accepting;
                vec![AlertEffect::StopAlert, AlertEffect::SubmitAccept]
            }
            (AlertState::Ringing, AlertInput::Decline) => {
                self.state = AlertState::Resolved(Resolution::Declined);
                vec![
                    AlertEffect::StopAlert,
                    AlertEffect::SubmitDecline(DeclineReason::Declined),
                    AlertEffect::Dismiss(Resolution::Declined),
                ]
            }
            // The broker's decision can arrive while still Ringing: an
            // accept submitted out-of-band (over HTTP) resolves the race
            // before this session ever saw an Accept input. The alert must
            // still stop on the spot.
            (AlertState::Ringing, AlertInput::AcceptGranted) => {
                self.state = AlertState::Resolved(Resolution::Won);
                vec![AlertEffect::StopAlert, AlertEffect::Dismiss(Resolution::Won)]
            }
            (AlertState::Ringing, AlertInput::AcceptLost) => {
                self.state = AlertState::Resolved(Resolution::Lost);
                vec![AlertEffect::StopAlert, AlertEffect::Dismiss(Resolution::Lost)]
            }
            (AlertState::Accepting, AlertInput::AcceptGranted) => {
                self.state = AlertState::Resolved(Resolution::Won);
                vec![AlertEffect::Dismiss(Resolution::Won)]
            }
            (AlertState::Accepting, AlertInput::AcceptLost) => {
                self.state = AlertState::Resolved(Resolution::Lost);
                vec![AlertEffect::Dismiss(Resolution::Lost)]
            }
            (AlertState::Ringing | AlertState::Accepting, AlertInput::Invalidate) => {
                self.state = AlertState::Resolved(Resolution::Invalidated);
                vec![
                    AlertEffect::StopAlert,
                    AlertEffect::Dismiss(Resolution::Invalidated),
                ]
            }
            // Everything else is a no-op: resolved sessions absorb inputs,
            // and ticks during Accepting neither pulse nor time out.
            _ => Vec::new(),
        }
    }
}
