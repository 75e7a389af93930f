/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Deep-link route declarations, keyed by application identity.
//!
//! The registry is additive for the life of the process. Writers serialize on
//! a mutex and publish a fresh snapshot; lookups read the current snapshot
//! without taking that mutex, so a lookup racing a registration may or may not
//! see the new declaration.

use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;

use crate::shell::activation::diagnostics::{
    ActivationDiagnosticEvent, ActivationDiagnostics, DiagnosticEventType, OUTCOME_ACCEPTED,
    OUTCOME_REJECTED,
};
use crate::shell::activation::envelope::ActivationId;
use crate::shell::activation::error::ActivationError;

pub const REJECT_DUPLICATE_DECLARATION: &str = "duplicate-declaration";

/// A scheme (and optional host) an application identity accepts launches for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteDeclaration {
    app_identity: String,
    scheme: String,
    host_pattern: Option<String>,
}

impl RouteDeclaration {
    /// Identity is trimmed, scheme and host pattern lower-cased. Identity and
    /// scheme must be non-empty; `None` as host pattern accepts any host.
    pub fn new(
        app_identity: &str,
        scheme: &str,
        host_pattern: Option<&str>,
    ) -> Result<Self, ActivationError> {
        let app_identity = app_identity.trim();
        if app_identity.is_empty() {
            return Err(ActivationError::EmptyAppIdentity);
        }
        let scheme = scheme.trim();
        if scheme.is_empty() {
            return Err(ActivationError::EmptyScheme);
        }

        Ok(Self {
            app_identity: app_identity.to_string(),
            scheme: scheme.to_ascii_lowercase(),
            host_pattern: host_pattern.map(str::to_ascii_lowercase),
        })
    }

    pub fn app_identity(&self) -> &str {
        &self.app_identity
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn host_pattern(&self) -> Option<&str> {
        self.host_pattern.as_deref()
    }

    /// `scheme` is expected lower-cased; host comparison ignores ASCII case.
    pub fn matches(&self, scheme: &str, host: &str) -> bool {
        if self.scheme != scheme {
            return false;
        }
        self.host_pattern
            .as_deref()
            .is_none_or(|pattern| pattern.eq_ignore_ascii_case(host))
    }

    fn collides_with(&self, other: &RouteDeclaration) -> bool {
        self.app_identity == other.app_identity
            && self.scheme == other.scheme
            && self.host_pattern == other.host_pattern
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteRegistration {
    Accepted,
    Rejected(String),
}

impl RouteRegistration {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Accepted => None,
            Self::Rejected(reason) => Some(reason),
        }
    }
}

pub struct RouteRegistry {
    /// Declarations in registration order across all identities.
    snapshot: ArcSwap<Vec<RouteDeclaration>>,
    write_lock: Mutex<()>,
    diagnostics: ActivationDiagnostics,
}

impl RouteRegistry {
    pub fn new(diagnostics: ActivationDiagnostics) -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(Vec::new()),
            write_lock: Mutex::new(()),
            diagnostics,
        }
    }

    pub fn register(&self, declaration: RouteDeclaration) -> RouteRegistration {
        let correlation_id = ActivationId::new();

        let outcome = {
            let _guard = self.write_lock.lock();
            let current = self.snapshot.load_full();
            if current
                .iter()
                .any(|existing| existing.collides_with(&declaration))
            {
                RouteRegistration::Rejected(REJECT_DUPLICATE_DECLARATION.to_string())
            } else {
                let mut next = Vec::with_capacity(current.len() + 1);
                next.extend(current.iter().cloned());
                next.push(declaration.clone());
                self.snapshot.store(Arc::new(next));
                RouteRegistration::Accepted
            }
        };

        let event = match &outcome {
            RouteRegistration::Accepted => {
                log::debug!(
                    "route accepted: {} -> {}://{}",
                    declaration.app_identity,
                    declaration.scheme,
                    declaration.host_pattern.as_deref().unwrap_or("*")
                );
                ActivationDiagnosticEvent::new(
                    correlation_id,
                    DiagnosticEventType::RegistrationAttempt,
                    OUTCOME_ACCEPTED,
                )
            }
            RouteRegistration::Rejected(reason) => {
                log::warn!(
                    "route rejected ({reason}): {} -> {}://{}",
                    declaration.app_identity,
                    declaration.scheme,
                    declaration.host_pattern.as_deref().unwrap_or("*")
                );
                ActivationDiagnosticEvent::new(
                    correlation_id,
                    DiagnosticEventType::RegistrationAttempt,
                    OUTCOME_REJECTED,
                )
                .with_reason(Some(reason.as_str()))
            }
        };
        self.diagnostics.emit(event);

        outcome
    }

    /// First declaration (in registration order) matching `scheme` and `host`.
    /// Probe values are lower-cased before comparison.
    pub fn lookup(&self, scheme: &str, host: &str) -> Option<String> {
        let scheme = scheme.to_ascii_lowercase();
        self.snapshot
            .load()
            .iter()
            .find(|declaration| declaration.matches(&scheme, host))
            .map(|declaration| declaration.app_identity.clone())
    }

    pub fn declarations_for(&self, app_identity: &str) -> Vec<RouteDeclaration> {
        let app_identity = app_identity.trim();
        self.snapshot
            .load()
            .iter()
            .filter(|declaration| declaration.app_identity == app_identity)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.snapshot.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for RouteRegistry {
    fn default() -> Self {
        Self::new(ActivationDiagnostics::new())
    }
}
