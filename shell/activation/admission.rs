/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Admission gate: a pluggable policy plus a time-windowed replay cache.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

use super::envelope::{ActivationEnvelope, ActivationSource};

pub const DEFAULT_REPLAY_WINDOW: Duration = Duration::from_secs(5);
pub const DENY_SOURCE_NOT_ALLOWED: &str = "source-not-allowed";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmissionDecision {
    allowed: bool,
    deny_reason: Option<String>,
}

impl AdmissionDecision {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            deny_reason: None,
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            deny_reason: Some(reason.into()),
        }
    }

    /// Deny without giving a reason.
    pub fn deny_silently() -> Self {
        Self {
            allowed: false,
            deny_reason: None,
        }
    }

    pub fn is_allowed(&self) -> bool {
        self.allowed
    }

    pub fn deny_reason(&self) -> Option<&str> {
        self.deny_reason.as_deref()
    }
}

/// Decides whether a normalized activation may proceed to dispatch.
pub trait AdmissionPolicy: Send + Sync {
    fn evaluate(&self, envelope: &ActivationEnvelope) -> AdmissionDecision;
}

impl<F> AdmissionPolicy for F
where
    F: Fn(&ActivationEnvelope) -> AdmissionDecision + Send + Sync,
{
    fn evaluate(&self, envelope: &ActivationEnvelope) -> AdmissionDecision {
        self(envelope)
    }
}

/// Admits only activations from the listed sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceAllowlistPolicy {
    allowed: HashSet<ActivationSource>,
}

impl SourceAllowlistPolicy {
    pub fn new(allowed: impl IntoIterator<Item = ActivationSource>) -> Self {
        Self {
            allowed: allowed.into_iter().collect(),
        }
    }
}

impl AdmissionPolicy for SourceAllowlistPolicy {
    fn evaluate(&self, envelope: &ActivationEnvelope) -> AdmissionDecision {
        if self.allowed.contains(&envelope.source()) {
            AdmissionDecision::allow()
        } else {
            AdmissionDecision::deny(DENY_SOURCE_NOT_ALLOWED)
        }
    }
}

/// Idempotency keys seen within the last `window`.
///
/// Ages are measured on the tokio clock, so paused-time tests can step past
/// the window.
///
/// A key is spent as soon as a slot is acquired, whatever happens downstream;
/// retrying within the window reads as a duplicate.
#[derive(Debug)]
pub struct ReplayWindow {
    window: Duration,
    seen: Mutex<HashMap<String, Instant>>,
}

impl ReplayWindow {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            seen: Mutex::new(HashMap::new()),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// `true` if the key was free and is now held; `false` for a duplicate.
    pub fn try_acquire(&self, idempotency_key: &str) -> bool {
        self.try_acquire_at(idempotency_key, Instant::now())
    }

    pub(crate) fn try_acquire_at(&self, idempotency_key: &str, now: Instant) -> bool {
        let mut seen = self.seen.lock();
        // Full sweep on every attempt; the live set stays small.
        seen.retain(|_, acquired_at| now.saturating_duration_since(*acquired_at) <= self.window);

        if seen.contains_key(idempotency_key) {
            return false;
        }
        seen.insert(idempotency_key.to_string(), now);
        true
    }

    pub fn live_keys(&self) -> usize {
        self.seen.lock().len()
    }
}

impl Default for ReplayWindow {
    fn default() -> Self {
        Self::new(DEFAULT_REPLAY_WINDOW)
    }
}
