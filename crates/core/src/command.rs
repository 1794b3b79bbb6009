// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use ride_dispatch_domain::{DeclineReason, DriverId, Location};

/// A command represents driver, owner, or system intent as data only.
///
/// Commands are the only way to request ride state changes. Acceptance
/// races are decided by the order commands reach the serialization point,
/// never by timestamps embedded in the command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Offer the ride to a candidate driver.
    Offer {
        /// The driver to offer the ride to.
        driver: DriverId,
    },
    /// A driver attempts to accept their pending offer. First to arrive
    /// wins; all other pending candidates are expired on success.
    ResolveAccept {
        /// The accepting driver.
        driver: DriverId,
    },
    /// A driver declines their pending offer, or their countdown lapsed.
    ResolveDecline {
        /// The declining driver.
        driver: DriverId,
        /// Whether the driver declined or the countdown timed out.
        reason: DeclineReason,
    },
    /// The assigned driver starts the ride.
    Start {
        /// The starting driver. Must be the assigned driver.
        driver: DriverId,
        /// Where the ride started.
        at: Location,
    },
    /// The assigned driver reaches the current leg's destination.
    ///
    /// For a round trip that has not turned around yet this flips the ride
    /// onto its return leg; otherwise it completes the ride and settles the
    /// fare.
    CompleteLeg {
        /// The completing driver. Must be the assigned driver.
        driver: DriverId,
        /// Where the leg completed.
        at: Location,
        /// Distance driven on the return leg, in km. Zero when completing
        /// the outbound leg or a one-way ride.
        return_distance_km: f64,
    },
    /// Cancel the ride. Valid only before it becomes active.
    Cancel {
        /// A human-readable cancellation reason.
        reason: String,
    },
    /// Expire a candidate whose offer window lapsed server-side.
    ExpireCandidate {
        /// The driver whose offer lapsed.
        driver: DriverId,
    },
}

impl Command {
    /// Returns the audit action name for this command.
    #[must_use]
    pub const fn action_name(&self) -> &'static str {
        match self {
            Self::Offer { .. } => "Offer",
            Self::ResolveAccept { .. } => "ResolveAccept",
            Self::ResolveDecline { .. } => "ResolveDecline",
            Self::Start { .. } => "Start",
            Self::CompleteLeg { .. } => "CompleteLeg",
            Self::Cancel { .. } => "Cancel",
            Self::ExpireCandidate { .. } => "ExpireCandidate",
        }
    }
}
