// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use ride_dispatch_audit::{AuditEvent, StateSnapshot};
use ride_dispatch_domain::{
    AssignmentCandidate, DeclineReason, DriverId, FareBreakdown, Ride, RideId,
};
use time::OffsetDateTime;

/// The complete dispatch state scoped to a single ride.
///
/// The broker owns ride status transitions exclusively; all mutations to a
/// ride and its candidate set are serialized through [`crate::apply`].
#[derive(Debug, Clone, PartialEq)]
pub struct RideState {
    /// The ride itself.
    pub ride: Ride,
    /// All candidates ever offered for this ride, in offer order.
    pub candidates: Vec<AssignmentCandidate>,
}

impl RideState {
    /// Creates dispatch state for a newly created ride.
    #[must_use]
    pub const fn new(ride: Ride) -> Self {
        Self {
            ride,
            candidates: Vec::new(),
        }
    }

    /// Returns the most recent candidate for a driver, if one was ever
    /// offered. A driver who declined can be offered the ride again, so
    /// the latest entry is the live one.
    #[must_use]
    pub fn candidate_for(&self, driver: &DriverId) -> Option<&AssignmentCandidate> {
        self.candidates
            .iter()
            .rev()
            .find(|candidate| &candidate.driver_id == driver)
    }

    /// Returns whether any candidate is still pending.
    #[must_use]
    pub fn has_pending_candidates(&self) -> bool {
        self.candidates.iter().any(AssignmentCandidate::is_pending)
    }

    /// Converts the state to a snapshot for audit purposes.
    #[must_use]
    pub fn to_snapshot(&self) -> StateSnapshot {
        StateSnapshot::new(format!(
            "ride={},status={},driver={},candidates={}",
            self.ride.id,
            self.ride.status,
            self.ride
                .assigned_driver
                .as_ref()
                .map_or("none", DriverId::value),
            self.candidates.len()
        ))
    }
}

/// The reason a pending candidate was withdrawn without driver action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WithdrawReason {
    /// Another driver won the acceptance race.
    AnotherDriverAccepted,
    /// The offer window elapsed server-side.
    OfferExpired,
    /// The ride was cancelled while the offer was pending.
    RideCancelled,
}

/// Facts emitted by a successful transition.
///
/// Events describe what changed; the server renders them onto the realtime
/// channel. They are informational and never authoritative.
#[derive(Debug, Clone, PartialEq)]
pub enum RideEvent {
    /// An offer was extended to a driver.
    OfferExtended {
        /// The ride being offered.
        ride_id: RideId,
        /// The driver receiving the offer.
        driver_id: DriverId,
        /// When the offer lapses.
        expires_at: OffsetDateTime,
    },
    /// A driver won the acceptance race.
    AssignmentWon {
        /// The ride.
        ride_id: RideId,
        /// The winning driver.
        driver_id: DriverId,
    },
    /// A pending offer was withdrawn; the holder must dismiss their alert.
    AssignmentWithdrawn {
        /// The ride.
        ride_id: RideId,
        /// The driver whose offer was withdrawn.
        driver_id: DriverId,
        /// Why the offer was withdrawn.
        reason: WithdrawReason,
    },
    /// A driver declined their offer or let it time out.
    CandidateDeclined {
        /// The ride.
        ride_id: RideId,
        /// The declining driver.
        driver_id: DriverId,
        /// Whether this was an explicit decline or a timeout.
        reason: DeclineReason,
    },
    /// The assigned driver started the ride.
    RideStarted {
        /// The ride.
        ride_id: RideId,
        /// The assigned driver.
        driver_id: DriverId,
    },
    /// A round-trip ride reached its drop point and flipped onto the
    /// return leg. The ride stays active.
    Turnaround {
        /// The ride.
        ride_id: RideId,
    },
    /// The ride completed and its fare was settled.
    RideCompleted {
        /// The ride.
        ride_id: RideId,
        /// The settled fare.
        fare: FareBreakdown,
    },
    /// The ride was cancelled before it became active.
    RideCancelled {
        /// The ride.
        ride_id: RideId,
        /// The cancellation reason.
        reason: String,
    },
}

/// The result of a successful state transition.
///
/// Transitions are atomic: they either succeed completely or fail without
/// side effects.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionResult {
    /// The new state after the transition.
    pub new_state: RideState,
    /// Facts emitted by the transition, for the realtime channel.
    pub events: Vec<RideEvent>,
    /// The audit event recording this transition.
    pub audit_event: AuditEvent,
}
