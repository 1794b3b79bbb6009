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
    clippy::all,
    clippy::suspicious,
    clippy::complexity,
    clippy::perf,
    clippy::unwrap_used,
    clippy::expect_used
)]

mod alert;
mod apply;
mod command;
mod error;
mod state;
mod telemetry;

#[cfg(test)]
mod tests;

// Re-export public types and functions
pub use alert::{
    AlertEffect, AlertInput, AlertSession, AlertState, COUNTDOWN_SECS, ESTIMATE_AVG_SPEED_KMH,
    PULSE_PERIOD_SECS, Resolution, RideEstimate,
};
pub use apply::{BrokerSettings, apply};
pub use command::Command;
pub use error::CoreError;
pub use state::{RideEvent, RideState, TransitionResult, WithdrawReason};
pub use telemetry::{
    DEFAULT_ARRIVAL_RADIUS_KM, DEFAULT_DEBOUNCE, DEFAULT_SPEED_LIMIT_KMH, SpeedCheck,
    TurnaroundDetector, ViolationMonitor,
};
