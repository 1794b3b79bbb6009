// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Tests for the driver-side alert session machine.

use crate::{
    AlertEffect, AlertInput, AlertSession, AlertState, COUNTDOWN_SECS, PULSE_PERIOD_SECS,
    Resolution, RideEstimate,
};
use ride_dispatch_domain::{DeclineReason, DriverId, RideId};

use super::helpers::{drop_point, pickup};

fn open_session() -> AlertSession {
    let (session, effects) = AlertSession::open(
        RideId::new("ride-1"),
        DriverId::new("driver-1"),
        &pickup(),
        &drop_point(),
    );
    assert_eq!(effects, vec![AlertEffect::Pulse]);
    session
}

#[test]
fn test_open_starts_ringing_with_full_countdown() {
    let session = open_session();

    assert_eq!(session.state, AlertState::Ringing);
    assert_eq!(session.remaining_secs, COUNTDOWN_SECS);
    assert!(session.estimate.distance_km > 0.0);
}

#[test]
fn test_pulse_fires_on_the_pulse_period() {
    let mut session = open_session();

    // The opening pulse already fired; the next lands after a full period.
    for _ in 0..PULSE_PERIOD_SECS - 1 {
        assert_eq!(session.handle(AlertInput::Tick), Vec::new());
    }
    assert_eq!(session.handle(AlertInput::Tick), vec![AlertEffect::Pulse]);
}

#[test]
fn test_countdown_times_out_with_auto_decline() {
    let mut session = open_session();

    let mut last_effects = Vec::new();
    for _ in 0..COUNTDOWN_SECS {
        last_effects = session.handle(AlertInput::Tick);
    }

    assert_eq!(session.state, AlertState::Resolved(Resolution::TimedOut));
    assert_eq!(
        last_effects,
        vec![
            AlertEffect::StopAlert,
            AlertEffect::SubmitDecline(DeclineReason::TimedOut),
            AlertEffect::Dismiss(Resolution::TimedOut),
        ]
    );
}

#[test]
fn test_accept_stops_alert_and_submits() {
    let mut session = open_session();

    let effects = session.handle(AlertInput::Accept);

    assert_eq!(session.state, AlertState::Accepting);
    assert_eq!(
        effects,
        vec![AlertEffect::StopAlert, AlertEffect::SubmitAccept]
    );
}

#[test]
fn test_accept_granted_resolves_won() {
    let mut session = open_session();
    session.handle(AlertInput::Accept);

    let effects = session.handle(AlertInput::AcceptGranted);

    assert_eq!(session.state, AlertState::Resolved(Resolution::Won));
    assert_eq!(effects, vec![AlertEffect::Dismiss(Resolution::Won)]);
}

#[test]
fn test_accept_lost_is_distinct_from_decline() {
    let mut session = open_session();
    session.handle(AlertInput::Accept);

    let effects = session.handle(AlertInput::AcceptLost);

    assert_eq!(session.state, AlertState::Resolved(Resolution::Lost));
    assert_eq!(effects, vec![AlertEffect::Dismiss(Resolution::Lost)]);
}

#[test]
fn test_grant_while_ringing_stops_alert_and_resolves_won() {
    // An accept submitted out-of-band resolves the race before the
    // session ever saw an Accept input.
    let mut session = open_session();

    let effects = session.handle(AlertInput::AcceptGranted);

    assert_eq!(session.state, AlertState::Resolved(Resolution::Won));
    assert_eq!(
        effects,
        vec![AlertEffect::StopAlert, AlertEffect::Dismiss(Resolution::Won)]
    );

    // No further ticks pulse or time out.
    for _ in 0..COUNTDOWN_SECS {
        assert_eq!(session.handle(AlertInput::Tick), Vec::new());
    }
}

#[test]
fn test_loss_while_ringing_stops_alert_and_resolves_lost() {
    let mut session = open_session();

    let effects = session.handle(AlertInput::AcceptLost);

    assert_eq!(session.state, AlertState::Resolved(Resolution::Lost));
    assert_eq!(
        effects,
        vec![AlertEffect::StopAlert, AlertEffect::Dismiss(Resolution::Lost)]
    );
}

#[test]
fn test_decline_resolves_immediately() {
    let mut session = open_session();

    let effects = session.handle(AlertInput::Decline);

    assert_eq!(session.state, AlertState::Resolved(Resolution::Declined));
    assert_eq!(
        effects,
        vec![
            AlertEffect::StopAlert,
            AlertEffect::SubmitDecline(DeclineReason::Declined),
            AlertEffect::Dismiss(Resolution::Declined),
        ]
    );
}

#[test]
fn test_invalidate_while_ringing_stops_everything() {
    let mut session = open_session();

    let effects = session.handle(AlertInput::Invalidate);

    assert_eq!(session.state, AlertState::Resolved(Resolution::Invalidated));
    assert_eq!(
        effects,
        vec![
            AlertEffect::StopAlert,
            AlertEffect::Dismiss(Resolution::Invalidated),
        ]
    );

    // No further ticks pulse or time out.
    assert_eq!(session.handle(AlertInput::Tick), Vec::new());
}

#[test]
fn test_ticks_while_accepting_neither_pulse_nor_time_out() {
    let mut session = open_session();
    session.handle(AlertInput::Accept);

    for _ in 0..COUNTDOWN_SECS * 2 {
        assert_eq!(session.handle(AlertInput::Tick), Vec::new());
    }
    assert_eq!(session.state, AlertState::Accepting);
}

#[test]
fn test_resolved_sessions_absorb_inputs() {
    let mut session = open_session();
    session.handle(AlertInput::Decline);

    assert_eq!(session.handle(AlertInput::Accept), Vec::new());
    assert_eq!(session.handle(AlertInput::AcceptGranted), Vec::new());
    assert!(session.is_resolved());
}

#[test]
fn test_estimate_uses_the_assumed_average_speed() {
    let estimate = RideEstimate::between(&pickup(), &drop_point());

    let expected_mins = estimate.distance_km / 40.0 * 60.0;
    assert!((estimate.duration_mins - expected_mins).abs() < 1e-9);
}
