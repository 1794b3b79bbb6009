// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::command::Command;
use crate::error::CoreError;
use crate::state::{RideEvent, RideState, TransitionResult, WithdrawReason};
use ride_dispatch_audit::{Action, Actor, AuditEvent, Cause};
use ride_dispatch_domain::{
    AssignmentCandidate, CandidateOutcome, DeclineReason, DomainError, FareParams, RideStatus,
    settle,
};
use time::{Duration, OffsetDateTime};

/// Tunable broker parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BrokerSettings {
    /// How long a candidate offer stays open.
    pub offer_window: Duration,
    /// Fare settlement tunables.
    pub fare: FareParams,
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            offer_window: Duration::seconds(60),
            fare: FareParams::default(),
        }
    }
}

/// Builds the audit event for a completed transition.
fn build_audit(
    actor: Actor,
    cause: Cause,
    action_name: &str,
    details: Option<String>,
    before: &RideState,
    after: &RideState,
    now: OffsetDateTime,
) -> AuditEvent {
    AuditEvent::new(
        actor,
        cause,
        Action::new(String::from(action_name), details),
        before.to_snapshot(),
        after.to_snapshot(),
        before.ride.id.clone(),
        now,
    )
}

/// Applies a command to the current ride state, producing a new state, the
/// emitted events, and an audit event.
///
/// This function is pure: callers serialize invocations per ride (single
/// writer), which is what decides acceptance races. The first
/// `ResolveAccept` to reach this point wins, regardless of any timestamps
/// the clients put on the wire.
///
/// # Arguments
///
/// * `state` - The current ride state (immutable)
/// * `command` - The command to apply
/// * `actor` - The actor performing this action
/// * `cause` - The cause or reason for this action
/// * `now` - The authoritative server-side timestamp
/// * `settings` - Broker tunables (offer window, fare parameters)
///
/// # Returns
///
/// * `Ok(TransitionResult)` containing the new state, events, and audit event
/// * `Err(CoreError)` if the command is invalid; the state is untouched
///
/// # Errors
///
/// Returns an error if the command violates ride lifecycle rules. Of note:
/// `RideAlreadyAssigned` is the expected loss branch of the acceptance race
/// and callers must treat it as a normal outcome, not a fault.
#[allow(clippy::too_many_lines)]
pub fn apply(
    state: &RideState,
    command: Command,
    actor: Actor,
    cause: Cause,
    now: OffsetDateTime,
    settings: &BrokerSettings,
) -> Result<TransitionResult, CoreError> {
    let action_name = command.action_name();
    match command {
        Command::Offer { driver } => {
            if state.ride.status != RideStatus::Searching {
                return Err(DomainError::RideNotOfferable {
                    ride_id: state.ride.id.value().to_string(),
                    status: state.ride.status,
                }
                .into());
            }
            let already_pending = state
                .candidates
                .iter()
                .any(|candidate| candidate.driver_id == driver && candidate.is_pending());
            if already_pending {
                return Err(DomainError::DuplicateCandidate {
                    ride_id: state.ride.id.value().to_string(),
                    driver_id: driver.value().to_string(),
                }
                .into());
            }

            let expires_at = now + settings.offer_window;
            let candidate =
                AssignmentCandidate::new(state.ride.id.clone(), driver.clone(), now, expires_at);

            let mut new_state = state.clone();
            new_state.candidates.push(candidate);

            let events = vec![RideEvent::OfferExtended {
                ride_id: state.ride.id.clone(),
                driver_id: driver.clone(),
                expires_at,
            }];
            let audit_event = build_audit(
                actor,
                cause,
                action_name,
                Some(format!("Offered ride to driver '{driver}'")),
                state,
                &new_state,
                now,
            );

            Ok(TransitionResult {
                new_state,
                events,
                audit_event,
            })
        }
        Command::ResolveAccept { driver } => {
            match state.ride.status {
                RideStatus::Searching => {}
                RideStatus::Accepted | RideStatus::Active | RideStatus::Completed => {
                    return Err(DomainError::RideAlreadyAssigned {
                        ride_id: state.ride.id.value().to_string(),
                    }
                    .into());
                }
                RideStatus::Cancelled => {
                    return Err(DomainError::RideNotOfferable {
                        ride_id: state.ride.id.value().to_string(),
                        status: state.ride.status,
                    }
                    .into());
                }
            }

            let candidate = state
                .candidates
                .iter()
                .find(|candidate| candidate.driver_id == driver && candidate.is_pending())
                .ok_or_else(|| DomainError::CandidateNotFound {
                    ride_id: state.ride.id.value().to_string(),
                    driver_id: driver.value().to_string(),
                })?;

            // The broker enforces offer expiry on its own clock; a client
            // that never heard "expired" must not be able to win late.
            if now >= candidate.expires_at {
                return Err(DomainError::AssignmentExpired {
                    ride_id: state.ride.id.value().to_string(),
                    driver_id: driver.value().to_string(),
                }
                .into());
            }

            let mut new_state = state.clone();
            let mut events = vec![RideEvent::AssignmentWon {
                ride_id: state.ride.id.clone(),
                driver_id: driver.clone(),
            }];

            for candidate in &mut new_state.candidates {
                if candidate.driver_id == driver {
                    candidate.outcome = CandidateOutcome::Accepted;
                } else if candidate.is_pending() {
                    candidate.outcome = CandidateOutcome::Expired;
                    events.push(RideEvent::AssignmentWithdrawn {
                        ride_id: state.ride.id.clone(),
                        driver_id: candidate.driver_id.clone(),
                        reason: WithdrawReason::AnotherDriverAccepted,
                    });
                }
            }

            new_state.ride.status = RideStatus::Accepted;
            new_state.ride.assigned_driver = Some(driver.clone());
            new_state.ride.updated_at = now;

            let audit_event = build_audit(
                actor,
                cause,
                action_name,
                Some(format!("Driver '{driver}' won the assignment")),
                state,
                &new_state,
                now,
            );

            Ok(TransitionResult {
                new_state,
                events,
                audit_event,
            })
        }
        Command::ResolveDecline { driver, reason } => {
            let position = state
                .candidates
                .iter()
                .position(|candidate| candidate.driver_id == driver && candidate.is_pending())
                .ok_or_else(|| DomainError::CandidateNotFound {
                    ride_id: state.ride.id.value().to_string(),
                    driver_id: driver.value().to_string(),
                })?;

            let mut new_state = state.clone();
            new_state.candidates[position].outcome = match reason {
                DeclineReason::Declined => CandidateOutcome::Declined,
                DeclineReason::TimedOut => CandidateOutcome::Expired,
            };

            // The ride stays Searching; further offers are an external
            // re-broadcast policy decision.
            let events = vec![RideEvent::CandidateDeclined {
                ride_id: state.ride.id.clone(),
                driver_id: driver.clone(),
                reason,
            }];
            let audit_event = build_audit(
                actor,
                cause,
                action_name,
                Some(format!("Driver '{driver}' declined ({reason:?})")),
                state,
                &new_state,
                now,
            );

            Ok(TransitionResult {
                new_state,
                events,
                audit_event,
            })
        }
        Command::Start { driver, at } => {
            if !state
                .ride
                .status
                .can_transition_to(RideStatus::Active)
            {
                return Err(DomainError::InvalidStatusTransition {
                    from: state.ride.status,
                    to: RideStatus::Active,
                }
                .into());
            }
            if state.ride.assigned_driver.as_ref() != Some(&driver) {
                return Err(DomainError::NotAssignedDriver {
                    ride_id: state.ride.id.value().to_string(),
                    driver_id: driver.value().to_string(),
                }
                .into());
            }

            let mut new_state = state.clone();
            new_state.ride.status = RideStatus::Active;
            new_state.ride.started_at = Some(now);
            new_state.ride.start_location = Some(at);
            new_state.ride.updated_at = now;

            let events = vec![RideEvent::RideStarted {
                ride_id: state.ride.id.clone(),
                driver_id: driver.clone(),
            }];
            let audit_event = build_audit(
                actor,
                cause,
                action_name,
                Some(format!("Driver '{driver}' started the ride")),
                state,
                &new_state,
                now,
            );

            Ok(TransitionResult {
                new_state,
                events,
                audit_event,
            })
        }
        Command::CompleteLeg {
            driver,
            at,
            return_distance_km,
        } => {
            if state.ride.status == RideStatus::Completed {
                return Err(DomainError::RideAlreadyCompleted {
                    ride_id: state.ride.id.value().to_string(),
                }
                .into());
            }
            if state.ride.status != RideStatus::Active {
                return Err(DomainError::InvalidStatusTransition {
                    from: state.ride.status,
                    to: RideStatus::Completed,
                }
                .into());
            }
            if state.ride.assigned_driver.as_ref() != Some(&driver) {
                return Err(DomainError::NotAssignedDriver {
                    ride_id: state.ride.id.value().to_string(),
                    driver_id: driver.value().to_string(),
                }
                .into());
            }

            let mut new_state = state.clone();

            if state.ride.is_round_trip && !state.ride.is_return_leg {
                // Turnaround: the ride continues Active on the return leg.
                new_state.ride.is_return_leg = true;
                new_state.ride.updated_at = now;

                let events = vec![RideEvent::Turnaround {
                    ride_id: state.ride.id.clone(),
                }];
                let audit_event = build_audit(
                    actor,
                    cause,
                    action_name,
                    Some(String::from("Reached drop point; return leg begins")),
                    state,
                    &new_state,
                    now,
                );

                return Ok(TransitionResult {
                    new_state,
                    events,
                    audit_event,
                });
            }

            let started_at = state.ride.started_at.ok_or_else(|| {
                CoreError::Internal(format!(
                    "active ride '{}' has no start time",
                    state.ride.id
                ))
            })?;
            let billed_return_km = if state.ride.is_return_leg {
                return_distance_km
            } else {
                0.0
            };
            let fare = settle(
                &state.ride.id,
                started_at,
                now,
                state.ride.hourly_rate,
                state.ride.vehicle_type,
                billed_return_km,
                &settings.fare,
            )?;

            new_state.ride.status = RideStatus::Completed;
            new_state.ride.completed_at = Some(now);
            new_state.ride.end_location = Some(at);
            new_state.ride.fare = Some(fare.clone());
            new_state.ride.updated_at = now;

            let events = vec![RideEvent::RideCompleted {
                ride_id: state.ride.id.clone(),
                fare,
            }];
            let audit_event = build_audit(
                actor,
                cause,
                action_name,
                Some(format!("Ride completed by driver '{driver}'")),
                state,
                &new_state,
                now,
            );

            Ok(TransitionResult {
                new_state,
                events,
                audit_event,
            })
        }
        Command::Cancel { reason } => {
            if !state
                .ride
                .status
                .can_transition_to(RideStatus::Cancelled)
            {
                return Err(DomainError::InvalidCancelState {
                    ride_id: state.ride.id.value().to_string(),
                    status: state.ride.status,
                }
                .into());
            }

            let mut new_state = state.clone();
            let mut events = Vec::new();

            for candidate in &mut new_state.candidates {
                if candidate.is_pending() {
                    candidate.outcome = CandidateOutcome::Expired;
                    events.push(RideEvent::AssignmentWithdrawn {
                        ride_id: state.ride.id.clone(),
                        driver_id: candidate.driver_id.clone(),
                        reason: WithdrawReason::RideCancelled,
                    });
                }
            }

            new_state.ride.status = RideStatus::Cancelled;
            // Cancelled rides carry no assignment.
            new_state.ride.assigned_driver = None;
            new_state.ride.updated_at = now;

            events.push(RideEvent::RideCancelled {
                ride_id: state.ride.id.clone(),
                reason: reason.clone(),
            });
            let audit_event = build_audit(
                actor,
                cause,
                action_name,
                Some(format!("Ride cancelled: {reason}")),
                state,
                &new_state,
                now,
            );

            Ok(TransitionResult {
                new_state,
                events,
                audit_event,
            })
        }
        Command::ExpireCandidate { driver } => {
            let position = state
                .candidates
                .iter()
                .position(|candidate| candidate.driver_id == driver && candidate.is_pending())
                .ok_or_else(|| DomainError::CandidateNotFound {
                    ride_id: state.ride.id.value().to_string(),
                    driver_id: driver.value().to_string(),
                })?;

            let mut new_state = state.clone();
            new_state.candidates[position].outcome = CandidateOutcome::Expired;

            let events = vec![RideEvent::AssignmentWithdrawn {
                ride_id: state.ride.id.clone(),
                driver_id: driver.clone(),
                reason: WithdrawReason::OfferExpired,
            }];
            let audit_event = build_audit(
                actor,
                cause,
                action_name,
                Some(format!("Offer to driver '{driver}' expired")),
                state,
                &new_state,
                now,
            );

            Ok(TransitionResult {
                new_state,
                events,
                audit_event,
            })
        }
    }
}
