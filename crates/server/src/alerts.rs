// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Server-side driver of per-offer alert sessions.
//!
//! Each extended offer gets one [`AlertSession`] and one task feeding it
//! one-second ticks. The session decides what happens; this module renders
//! its effects: pulses go out over the realtime channel, timeouts are
//! submitted to the broker as candidate expiry, and resolutions tear the
//! task down.
//!
//! HTTP resolutions (accept, decline) reach the broker directly through
//! their handlers; the handlers then notify the runtime so the session
//! stops ringing. A submit effect that finds the candidate already
//! resolved is therefore a normal race, not an error.

use std::collections::HashMap;
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, warn};

use ride_dispatch::{
    AlertEffect, AlertInput, AlertSession, Command, RideEvent, RideState, apply,
};
use ride_dispatch_api::{ApiError, ApiResult, RideResponse, translate_core_error};
use ride_dispatch_audit::{Actor, Cause};
use ride_dispatch_domain::{DeclineReason, DriverId};

use crate::dispatch::Dispatcher;
use crate::live::{ChannelRegistry, ServerEvent, publish_ride_events};

/// One session per (ride, driver) pair.
type SessionKey = (String, String);

/// A live session's input sender and its registration token.
struct SessionHandle {
    tx: mpsc::UnboundedSender<AlertInput>,
    token: u64,
}

/// Owns the live alert sessions and their ticking tasks.
pub struct AlertRuntime {
    /// Input senders for the live session tasks.
    sessions: Mutex<HashMap<SessionKey, SessionHandle>>,
    /// Monotonic session token source.
    next_token: std::sync::atomic::AtomicU64,
    /// The realtime channel, for pulses.
    registry: Arc<ChannelRegistry>,
    /// The canonical registry, for broker submissions.
    dispatcher: Arc<Dispatcher>,
}

impl AlertRuntime {
    /// Creates a runtime with no live sessions.
    #[must_use]
    pub fn new(registry: Arc<ChannelRegistry>, dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            next_token: std::sync::atomic::AtomicU64::new(1),
            registry,
            dispatcher,
        }
    }

    /// Opens an alert session for a freshly extended offer and starts its
    /// ticking task.
    ///
    /// Returns the session's decision-support estimate so the caller can
    /// attach it to the `new_assignment` event.
    pub async fn open(
        self: &Arc<Self>,
        state: &RideState,
        driver_id: &DriverId,
    ) -> ride_dispatch::RideEstimate {
        let (session, effects) = AlertSession::open(
            state.ride.id.clone(),
            driver_id.clone(),
            &state.ride.pickup,
            &state.ride.drop,
        );
        let estimate = session.estimate;

        let key = (
            state.ride.id.value().to_string(),
            driver_id.value().to_string(),
        );
        let (tx, rx) = mpsc::unbounded_channel();
        let token = self
            .next_token
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        {
            let mut sessions = self.sessions.lock().await;
            if sessions
                .insert(key.clone(), SessionHandle { tx, token })
                .is_some()
            {
                // A re-offer after a decline; the old task is resolved and
                // dies once its sender is dropped.
                debug!(ride_id = %key.0, driver_id = %key.1, "Replacing prior alert session");
            }
        }

        info!(ride_id = %key.0, driver_id = %key.1, "Alert session opened");
        let runtime = Arc::clone(self);
        tokio::spawn(async move {
            runtime.run_session(key, token, session, effects, rx).await;
        });

        estimate
    }

    /// Sends an input to a live session, if one exists.
    ///
    /// A missing session is normal: the offer may have been extended
    /// before a server restart, or the session may have just resolved.
    pub async fn notify(&self, ride_id: &str, driver_id: &str, input: AlertInput) {
        let sessions = self.sessions.lock().await;
        let key = (ride_id.to_string(), driver_id.to_string());
        if let Some(handle) = sessions.get(&key) {
            let _ = handle.tx.send(input);
        } else {
            debug!(ride_id, driver_id, ?input, "No live alert session for input");
        }
    }

    /// Invalidates the sessions of every driver whose offer a transition
    /// withdrew.
    pub async fn invalidate_withdrawn(&self, events: &[RideEvent]) {
        for event in events {
            if let RideEvent::AssignmentWithdrawn {
                ride_id, driver_id, ..
            } = event
            {
                self.notify(ride_id.value(), driver_id.value(), AlertInput::Invalidate)
                    .await;
            }
        }
    }

    /// Returns the number of live sessions.
    pub async fn live_sessions(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Drives one session until it resolves.
    async fn run_session(
        self: Arc<Self>,
        key: SessionKey,
        token: u64,
        mut session: AlertSession,
        initial_effects: Vec<AlertEffect>,
        mut rx: mpsc::UnboundedReceiver<AlertInput>,
    ) {
        self.render(&session, &initial_effects).await;

        let mut interval = tokio::time::interval(std::time::Duration::from_secs(1));
        // The first tick resolves immediately; the countdown starts after
        // a full second.
        interval.tick().await;

        while !session.is_resolved() {
            let input = tokio::select! {
                _ = interval.tick() => AlertInput::Tick,
                input = rx.recv() => match input {
                    Some(input) => input,
                    None => AlertInput::Invalidate,
                },
            };
            let effects = session.handle(input);
            self.render(&session, &effects).await;
        }

        let mut sessions = self.sessions.lock().await;
        if sessions
            .get(&key)
            .is_some_and(|handle| handle.token == token)
        {
            sessions.remove(&key);
        }
        debug!(ride_id = %key.0, driver_id = %key.1, "Alert session closed");
    }

    /// Renders session effects.
    async fn render(&self, session: &AlertSession, effects: &[AlertEffect]) {
        for effect in effects {
            match effect {
                AlertEffect::Pulse => {
                    self.registry
                        .send(
                            session.driver_id.value(),
                            ServerEvent::AlertPulse {
                                ride_id: session.ride_id.value().to_string(),
                                remaining_secs: session.remaining_secs,
                            },
                        )
                        .await;
                }
                // Clients silence the alert when they see the terminal
                // event for the offer; nothing extra goes on the wire.
                AlertEffect::StopAlert | AlertEffect::Dismiss(_) => {}
                // Accepts are submitted by the HTTP accept handler before
                // the session ever sees the input.
                AlertEffect::SubmitAccept => {}
                AlertEffect::SubmitDecline(reason) => {
                    self.submit_decline(session, *reason).await;
                }
            }
        }
    }

    /// Submits a decline or expiry to the broker on the session's behalf.
    async fn submit_decline(&self, session: &AlertSession, reason: DeclineReason) {
        let driver = session.driver_id.clone();
        let command = match reason {
            DeclineReason::TimedOut => Command::ExpireCandidate { driver },
            DeclineReason::Declined => Command::ResolveDecline { driver, reason },
        };
        let cause = Cause::new(
            String::from("alert-session"),
            String::from("Offer countdown resolved without broker acknowledgment"),
        );
        let now = OffsetDateTime::now_utc();
        let settings = self.dispatcher.broker_settings();

        let outcome = self
            .dispatcher
            .transition(session.ride_id.value(), |state| {
                let result = apply(state, command, Actor::system(), cause, now, settings)
                    .map_err(translate_core_error)?;
                Ok(ApiResult {
                    response: RideResponse::from(&result.new_state.ride),
                    audit_event: result.audit_event,
                    new_state: result.new_state,
                    events: result.events,
                })
            })
            .await;

        match outcome {
            Ok(result) => {
                publish_ride_events(
                    &self.registry,
                    &result.new_state.ride.owner,
                    &result.events,
                )
                .await;
            }
            Err(ApiError::ResourceNotFound { .. }) => {
                // The candidate resolved over HTTP first; the session just
                // had not heard yet.
                debug!(
                    ride_id = %session.ride_id,
                    driver_id = %session.driver_id,
                    "Candidate already resolved, skipping submission"
                );
            }
            Err(e) => {
                warn!(
                    ride_id = %session.ride_id,
                    driver_id = %session.driver_id,
                    error = %e,
                    "Failed to submit alert resolution"
                );
            }
        }
    }
}
