/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Deep-link registration service.
//!
//! Ties the route registry, admission gate and ownership coordinator into one
//! ingress pipeline:
//!
//! 1. normalize the launch uri into an [`ActivationEnvelope`]
//! 2. find the owning identity by `(scheme, host)`
//! 3. evaluate the admission policy, if any
//! 4. acquire the replay slot for the idempotency key
//! 5. forward an [`ActivationRequest`] to the identity's primary owner
//!
//! Each step short-circuits to one [`IngressOutcome`]. A matched route whose
//! identity has no live primary is reported as [`IngressOutcome::NoMatchingRoute`],
//! same as an unmatched one; the diagnostic reason tells them apart.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::Receiver;
use tokio_util::sync::CancellationToken;
use url::Url;

use super::admission::{AdmissionPolicy, DEFAULT_REPLAY_WINDOW, ReplayWindow};
use super::coordinator::{ForwardOutcome, OwnershipCoordinator, REASON_NO_ACTIVE_PRIMARY};
use super::diagnostics::{
    ActivationDiagnosticEvent, ActivationDiagnostics, DiagnosticEventType, OUTCOME_DELIVERED,
    OUTCOME_DENIED, OUTCOME_DUPLICATE, OUTCOME_NO_ACTIVE_PRIMARY, OUTCOME_NO_MATCH,
    OUTCOME_NORMALIZED,
};
use super::envelope::{ActivationEnvelope, ActivationSource, normalize};
use super::error::ActivationError;
use super::request::ActivationRequest;
use crate::registries::atomic::deep_link_route::{
    RouteDeclaration, RouteRegistration, RouteRegistry,
};

pub const REASON_POLICY_DENIED: &str = "policy-denied";
pub const REASON_DUPLICATE: &str = "duplicate-within-replay-window";
pub const REASON_NO_MATCHING_ROUTE: &str = "no-matching-route";

/// Terminal result of one ingress attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngressOutcome {
    Dispatched,
    PolicyDenied(String),
    Duplicate,
    NoMatchingRoute,
}

impl IngressOutcome {
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Dispatched => None,
            Self::PolicyDenied(reason) => Some(reason),
            Self::Duplicate => Some(REASON_DUPLICATE),
            Self::NoMatchingRoute => Some(REASON_NO_MATCHING_ROUTE),
        }
    }

    pub fn is_dispatched(&self) -> bool {
        matches!(self, Self::Dispatched)
    }
}

impl fmt::Display for IngressOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dispatched => f.write_str("dispatched"),
            Self::PolicyDenied(reason) => write!(f, "policy-denied ({reason})"),
            Self::Duplicate => f.write_str("duplicate"),
            Self::NoMatchingRoute => f.write_str("no-matching-route"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistrationServiceConfig {
    pub replay_window: Duration,
}

impl Default for RegistrationServiceConfig {
    fn default() -> Self {
        Self {
            replay_window: DEFAULT_REPLAY_WINDOW,
        }
    }
}

pub struct RegistrationService {
    routes: RouteRegistry,
    replay: ReplayWindow,
    policy: Option<Arc<dyn AdmissionPolicy>>,
    coordinator: OwnershipCoordinator,
    diagnostics: ActivationDiagnostics,
}

impl RegistrationService {
    /// A service with its own coordinator. Use [`Self::with_coordinator`] to
    /// share one coordinator between services or with secondary registrations.
    pub fn new(config: RegistrationServiceConfig) -> Self {
        Self::with_coordinator(config, OwnershipCoordinator::new())
    }

    pub fn with_coordinator(
        config: RegistrationServiceConfig,
        coordinator: OwnershipCoordinator,
    ) -> Self {
        let diagnostics = ActivationDiagnostics::new();
        Self {
            routes: RouteRegistry::new(diagnostics.clone()),
            replay: ReplayWindow::new(config.replay_window),
            policy: None,
            coordinator,
            diagnostics,
        }
    }

    pub fn with_policy(mut self, policy: Arc<dyn AdmissionPolicy>) -> Self {
        self.policy = Some(policy);
        self
    }

    pub fn coordinator(&self) -> &OwnershipCoordinator {
        &self.coordinator
    }

    pub fn routes(&self) -> &RouteRegistry {
        &self.routes
    }

    pub fn diagnostics(&self) -> &ActivationDiagnostics {
        &self.diagnostics
    }

    pub fn subscribe_diagnostics(&self) -> Receiver<ActivationDiagnosticEvent> {
        self.diagnostics.subscribe()
    }

    pub fn register_route(&self, declaration: RouteDeclaration) -> RouteRegistration {
        self.routes.register(declaration)
    }

    /// Run one launch event through the pipeline.
    ///
    /// `cancel` is honoured only on entry, before any state changes. A handler
    /// failure is returned as [`ActivationError::Handler`]; the replay slot
    /// stays spent either way.
    pub async fn ingest_activation(
        &self,
        raw_uri: &Url,
        source: ActivationSource,
        cancel: &CancellationToken,
    ) -> Result<IngressOutcome, ActivationError> {
        if cancel.is_cancelled() {
            return Err(ActivationError::Cancelled);
        }

        let envelope = normalize(raw_uri, source);
        self.emit(&envelope, DiagnosticEventType::ActivationNormalized, OUTCOME_NORMALIZED, None);

        let Some(app_identity) = self.routes.lookup(&envelope.scheme(), &envelope.host()) else {
            self.emit(&envelope, DiagnosticEventType::NoMatchingRoute, OUTCOME_NO_MATCH, None);
            return Ok(IngressOutcome::NoMatchingRoute);
        };

        if let Some(policy) = &self.policy {
            let decision = policy.evaluate(&envelope);
            if !decision.is_allowed() {
                let reason = decision
                    .deny_reason()
                    .unwrap_or(REASON_POLICY_DENIED)
                    .to_string();
                self.emit(
                    &envelope,
                    DiagnosticEventType::PolicyDenied,
                    OUTCOME_DENIED,
                    Some(&reason),
                );
                return Ok(IngressOutcome::PolicyDenied(reason));
            }
        }

        if !self.replay.try_acquire(envelope.idempotency_key()) {
            log::debug!(
                "activation {} suppressed: {} already seen within {:?}",
                envelope.activation_id(),
                envelope.idempotency_key(),
                self.replay.window()
            );
            self.emit(
                &envelope,
                DiagnosticEventType::DuplicateSuppressed,
                OUTCOME_DUPLICATE,
                Some(REASON_DUPLICATE),
            );
            return Ok(IngressOutcome::Duplicate);
        }

        let request = ActivationRequest::from_envelope(&envelope);
        let forwarded = self
            .coordinator
            .forward_committed(&app_identity, request, cancel)
            .await?;

        match forwarded {
            ForwardOutcome::Delivered => {
                self.emit(&envelope, DiagnosticEventType::Dispatched, OUTCOME_DELIVERED, None);
                Ok(IngressOutcome::Dispatched)
            }
            ForwardOutcome::NoActivePrimary => {
                log::warn!(
                    "activation {} for {} not delivered: {app_identity} has no active primary",
                    envelope.activation_id(),
                    envelope.route()
                );
                self.emit(
                    &envelope,
                    DiagnosticEventType::NoMatchingRoute,
                    OUTCOME_NO_ACTIVE_PRIMARY,
                    Some(REASON_NO_ACTIVE_PRIMARY),
                );
                Ok(IngressOutcome::NoMatchingRoute)
            }
        }
    }

    fn emit(
        &self,
        envelope: &ActivationEnvelope,
        event_type: DiagnosticEventType,
        outcome: &'static str,
        reason: Option<&str>,
    ) {
        self.diagnostics.emit(
            ActivationDiagnosticEvent::for_envelope(envelope, event_type, outcome)
                .with_reason(reason),
        );
    }
}

impl Default for RegistrationService {
    fn default() -> Self {
        Self::new(RegistrationServiceConfig::default())
    }
}
