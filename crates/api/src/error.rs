// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Error types for the API layer.

use ride_dispatch::CoreError;
use ride_dispatch_domain::DomainError;
use thiserror::Error;

/// Request-shape policy errors.
///
/// These cover constraints on the API contract itself, before any domain
/// validation runs.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestPolicyError {
    /// A required text field was empty.
    #[error("Field '{field}' must not be empty")]
    EmptyField {
        /// The offending field.
        field: &'static str,
    },

    /// A text field exceeded its maximum length.
    #[error("Field '{field}' must be at most {max_length} characters long")]
    TooLong {
        /// The offending field.
        field: &'static str,
        /// The maximum accepted length.
        max_length: usize,
    },
}

/// API-level errors.
///
/// These are distinct from domain/core errors and represent the API contract.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiError {
    /// Authorization failed - the actor does not have permission.
    Unauthorized {
        /// The action that was attempted.
        action: String,
        /// The role required for this action.
        required_role: String,
    },
    /// Another driver already won the acceptance race.
    ///
    /// Kept distinct from other rule violations so clients can render
    /// "ride no longer available" instead of an error.
    RideNoLongerAvailable {
        /// The ride identifier.
        ride_id: String,
    },
    /// A ride lifecycle rule was violated.
    RideRuleViolation {
        /// The rule that was violated.
        rule: String,
        /// A human-readable description of the violation.
        message: String,
    },
    /// Invalid input was provided.
    InvalidInput {
        /// The field that was invalid.
        field: String,
        /// A human-readable description of the error.
        message: String,
    },
    /// A requested resource was not found.
    ResourceNotFound {
        /// The type of resource that was not found.
        resource_type: String,
        /// A human-readable description of what was not found.
        message: String,
    },
    /// An internal error occurred.
    Internal {
        /// A description of the internal error.
        message: String,
    },
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unauthorized {
                action,
                required_role,
            } => {
                write!(f, "Unauthorized: '{action}' requires {required_role} role")
            }
            Self::RideNoLongerAvailable { ride_id } => {
                write!(f, "Ride '{ride_id}' is no longer available")
            }
            Self::RideRuleViolation { rule, message } => {
                write!(f, "Ride rule violation ({rule}): {message}")
            }
            Self::InvalidInput { field, message } => {
                write!(f, "Invalid input for field '{field}': {message}")
            }
            Self::ResourceNotFound {
                resource_type,
                message,
            } => {
                write!(f, "{resource_type} not found: {message}")
            }
            Self::Internal { message } => {
                write!(f, "Internal error: {message}")
            }
        }
    }
}

impl std::error::Error for ApiError {}

impl From<RequestPolicyError> for ApiError {
    fn from(err: RequestPolicyError) -> Self {
        let field = match &err {
            RequestPolicyError::EmptyField { field }
            | RequestPolicyError::TooLong { field, .. } => *field,
        };
        Self::InvalidInput {
            field: String::from(field),
            message: err.to_string(),
        }
    }
}

/// Translates a domain error into an API error.
///
/// This translation is explicit and ensures domain errors are not leaked
/// directly.
#[must_use]
pub fn translate_domain_error(err: DomainError) -> ApiError {
    match err {
        DomainError::RideNotOfferable { ride_id, status } => ApiError::RideRuleViolation {
            rule: String::from("offer_requires_searching"),
            message: format!("Ride '{ride_id}' is not accepting offers while {status}"),
        },
        DomainError::RideAlreadyAssigned { ride_id } => {
            ApiError::RideNoLongerAvailable { ride_id }
        }
        DomainError::InvalidCancelState { ride_id, status } => ApiError::RideRuleViolation {
            rule: String::from("cancel_before_active"),
            message: format!("Ride '{ride_id}' cannot be cancelled while {status}"),
        },
        DomainError::RideAlreadyCompleted { ride_id } => ApiError::RideRuleViolation {
            rule: String::from("settle_once"),
            message: format!("Ride '{ride_id}' is already completed and settled"),
        },
        DomainError::InvalidFixOrdering {
            previous_ms,
            received_ms,
        } => ApiError::InvalidInput {
            field: String::from("timestamp_ms"),
            message: format!(
                "Fix timestamp {received_ms}ms does not advance past {previous_ms}ms"
            ),
        },
        DomainError::AssignmentExpired { ride_id, driver_id } => ApiError::RideRuleViolation {
            rule: String::from("offer_window"),
            message: format!(
                "Offer for ride '{ride_id}' to driver '{driver_id}' expired before resolution"
            ),
        },
        DomainError::CandidateNotFound { ride_id, driver_id } => ApiError::ResourceNotFound {
            resource_type: String::from("Candidate"),
            message: format!("No pending offer for driver '{driver_id}' on ride '{ride_id}'"),
        },
        DomainError::DuplicateCandidate { ride_id, driver_id } => ApiError::RideRuleViolation {
            rule: String::from("one_pending_offer_per_driver"),
            message: format!(
                "Driver '{driver_id}' already holds a pending offer for ride '{ride_id}'"
            ),
        },
        DomainError::NotAssignedDriver { ride_id, driver_id } => ApiError::RideRuleViolation {
            rule: String::from("assigned_driver_only"),
            message: format!(
                "Driver '{driver_id}' is not the assigned driver for ride '{ride_id}'"
            ),
        },
        DomainError::InvalidStatusTransition { from, to } => ApiError::RideRuleViolation {
            rule: String::from("status_transition"),
            message: format!("Ride status cannot move from {from} to {to}"),
        },
        DomainError::InvalidLocation { lat, lng } => ApiError::InvalidInput {
            field: String::from("location"),
            message: format!("Coordinates ({lat}, {lng}) are out of range"),
        },
        DomainError::InvalidHourlyRate { rate } => ApiError::InvalidInput {
            field: String::from("hourly_rate"),
            message: format!("Invalid hourly rate: {rate}. Must be positive and finite"),
        },
        DomainError::InvalidRideStatus(value) => ApiError::InvalidInput {
            field: String::from("status"),
            message: format!("Unknown ride status '{value}'"),
        },
        DomainError::InvalidVehicleType(value) => ApiError::InvalidInput {
            field: String::from("vehicle_type"),
            message: format!("Unknown vehicle type '{value}'"),
        },
        DomainError::InvalidIdentifier { field } => ApiError::InvalidInput {
            field: String::from(field),
            message: format!("Identifier '{field}' cannot be empty"),
        },
        DomainError::InvalidSettlementWindow { ride_id } => ApiError::Internal {
            message: format!("Ride '{ride_id}' completion time precedes its start time"),
        },
    }
}

/// Translates a core error into an API error.
///
/// This translation is explicit and ensures core errors are not leaked
/// directly.
#[must_use]
pub fn translate_core_error(err: CoreError) -> ApiError {
    match err {
        CoreError::DomainViolation(domain_err) => translate_domain_error(domain_err),
        CoreError::Internal(msg) => ApiError::Internal {
            message: format!("Internal error: {msg}"),
        },
    }
}
