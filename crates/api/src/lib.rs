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
    clippy::all
)]

use ride_dispatch_audit::Actor;

pub mod error;
pub mod handlers;
pub mod request_response;

#[cfg(test)]
mod tests;

pub use error::{ApiError, translate_core_error, translate_domain_error};
pub use handlers::{
    ApiResult, accept_ride, cancel_ride, complete_ride, create_ride, decline_ride, get_ride,
    offer_ride, start_ride,
};
pub use request_response::{
    AcceptRideRequest, CancelRideRequest, CompleteRideRequest, CreateRideRequest,
    DeclineRideRequest, FareBreakdownInfo, LocationInfo, OfferRideRequest, RideResponse,
    StartRideRequest, ViolationInfo,
};

/// Actor roles for authorization.
///
/// Roles determine what actions an authenticated actor may perform on a
/// ride. Ride owners book and cancel; drivers resolve offers and run the
/// ride; admins hold structural and corrective authority (including the
/// matcher that extends offers).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Admin role: operators and the offer matcher.
    Admin,
    /// Owner role: the account that booked the ride.
    Owner,
    /// Driver role: drivers resolving offers and driving rides.
    Driver,
}

impl Role {
    /// Returns the role name used on audit events.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Owner => "owner",
            Self::Driver => "driver",
        }
    }
}

/// An authenticated actor with an associated role.
///
/// Authentication itself happens upstream; handlers receive the already
/// verified identity and enforce the role rules per operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedActor {
    /// The unique identifier for this actor.
    pub id: String,
    /// The role assigned to this actor.
    pub role: Role,
}

impl AuthenticatedActor {
    /// Creates a new authenticated actor.
    ///
    /// # Arguments
    ///
    /// * `id` - The unique identifier for this actor
    /// * `role` - The role assigned to this actor
    #[must_use]
    pub const fn new(id: String, role: Role) -> Self {
        Self { id, role }
    }

    /// Converts this authenticated actor into an audit Actor.
    #[must_use]
    pub fn to_audit_actor(&self) -> Actor {
        Actor::new(self.id.clone(), String::from(self.role.as_str()))
    }
}
