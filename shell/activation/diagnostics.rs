/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Diagnostic event stream for route registration and activation ingress.
//!
//! Events are a side channel only. Nothing in the routing path reads them
//! back, and a slow or vanished subscriber cannot affect an outcome.

use register_diagnostics::{BusSnapshot, DiagnosticBus};
use serde::Serialize;
use serde_json::Value;
use url::Url;

use super::envelope::{ActivationEnvelope, ActivationId};

pub const CHANNEL_ROUTE_REGISTRATION_ATTEMPT: &str = "activation.route.registration_attempt";
pub const CHANNEL_ACTIVATION_NORMALIZED: &str = "activation.ingress.normalized";
pub const CHANNEL_ACTIVATION_POLICY_DENIED: &str = "activation.ingress.policy_denied";
pub const CHANNEL_ACTIVATION_DUPLICATE_SUPPRESSED: &str = "activation.ingress.duplicate_suppressed";
pub const CHANNEL_ACTIVATION_DISPATCHED: &str = "activation.ingress.dispatched";
pub const CHANNEL_ACTIVATION_NO_MATCHING_ROUTE: &str = "activation.ingress.no_matching_route";

pub const OUTCOME_ACCEPTED: &str = "accepted";
pub const OUTCOME_REJECTED: &str = "rejected";
pub const OUTCOME_NORMALIZED: &str = "normalized";
pub const OUTCOME_NO_MATCH: &str = "no-match";
pub const OUTCOME_DENIED: &str = "denied";
pub const OUTCOME_DUPLICATE: &str = "duplicate";
pub const OUTCOME_DELIVERED: &str = "delivered";
pub const OUTCOME_NO_ACTIVE_PRIMARY: &str = "no-active-primary";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DiagnosticEventType {
    RegistrationAttempt,
    ActivationNormalized,
    PolicyDenied,
    DuplicateSuppressed,
    Dispatched,
    NoMatchingRoute,
}

impl DiagnosticEventType {
    pub fn channel_id(self) -> &'static str {
        match self {
            Self::RegistrationAttempt => CHANNEL_ROUTE_REGISTRATION_ATTEMPT,
            Self::ActivationNormalized => CHANNEL_ACTIVATION_NORMALIZED,
            Self::PolicyDenied => CHANNEL_ACTIVATION_POLICY_DENIED,
            Self::DuplicateSuppressed => CHANNEL_ACTIVATION_DUPLICATE_SUPPRESSED,
            Self::Dispatched => CHANNEL_ACTIVATION_DISPATCHED,
            Self::NoMatchingRoute => CHANNEL_ACTIVATION_NO_MATCHING_ROUTE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivationDiagnosticEvent {
    pub correlation_id: ActivationId,
    pub event_type: DiagnosticEventType,
    pub channel_id: &'static str,
    pub outcome: &'static str,
    pub reason: Option<String>,
    pub route: Option<String>,
    pub raw_uri: Option<Url>,
}

impl ActivationDiagnosticEvent {
    pub fn new(
        correlation_id: ActivationId,
        event_type: DiagnosticEventType,
        outcome: &'static str,
    ) -> Self {
        Self {
            correlation_id,
            event_type,
            channel_id: event_type.channel_id(),
            outcome,
            reason: None,
            route: None,
            raw_uri: None,
        }
    }

    /// Event attributed to an activation, carrying its route and raw uri.
    pub fn for_envelope(
        envelope: &ActivationEnvelope,
        event_type: DiagnosticEventType,
        outcome: &'static str,
    ) -> Self {
        Self {
            route: Some(envelope.route().to_string()),
            raw_uri: Some(envelope.raw_uri().clone()),
            ..Self::new(envelope.activation_id(), event_type, outcome)
        }
    }

    pub fn with_reason(mut self, reason: Option<impl Into<String>>) -> Self {
        self.reason = reason.map(Into::into);
        self
    }

    pub fn to_json(&self) -> Value {
        // Every field serializes infallibly; Null only if that stops holding.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Publisher for [`ActivationDiagnosticEvent`]s. Clones share subscribers.
#[derive(Debug, Clone, Default)]
pub struct ActivationDiagnostics {
    bus: DiagnosticBus<ActivationDiagnosticEvent>,
}

impl ActivationDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> crossbeam_channel::Receiver<ActivationDiagnosticEvent> {
        self.bus.subscribe()
    }

    pub fn emit(&self, event: ActivationDiagnosticEvent) {
        log::debug!(
            "{} [{}] outcome={} reason={} route={}",
            event.channel_id,
            event.correlation_id,
            event.outcome,
            event.reason.as_deref().unwrap_or("-"),
            event.route.as_deref().unwrap_or("-"),
        );
        self.bus.emit(event);
    }

    pub fn snapshot(&self) -> BusSnapshot {
        self.bus.snapshot()
    }
}
