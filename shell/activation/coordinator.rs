/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Primary-owner arbitration for application identities.
//!
//! Each identity has at most one primary owner. The first registration claims
//! the slot and holds it until its handle is disposed; later registrations get
//! a secondary handle and are never promoted. A secondary that wants the slot
//! registers again after the primary lets go.
//!
//! Forwarding awaits the primary's handler inline. There is no queue and no
//! backpressure here, so a slow handler stalls its caller, and concurrent
//! forwards to one owner run concurrently.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::future::BoxFuture;
use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::error::{ActivationError, HandlerError};
use super::request::ActivationRequest;

pub const REASON_NO_ACTIVE_PRIMARY: &str = "no-active-primary";

pub type HandlerFuture = BoxFuture<'static, Result<(), HandlerError>>;

/// Executes activations for the identity it owns.
///
/// The cancellation token is the forwarding caller's. A handler may watch it,
/// but the coordinator never aborts a handler once it has been invoked.
pub trait PrimaryHandler: Send + Sync {
    fn handle(&self, request: ActivationRequest, cancel: CancellationToken) -> HandlerFuture;
}

impl<F, Fut> PrimaryHandler for F
where
    F: Fn(ActivationRequest, CancellationToken) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    fn handle(&self, request: ActivationRequest, cancel: CancellationToken) -> HandlerFuture {
        Box::pin(self(request, cancel))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegistrationId(Uuid);

impl RegistrationId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for RegistrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardOutcome {
    Delivered,
    NoActivePrimary,
}

impl ForwardOutcome {
    pub fn reason(self) -> Option<&'static str> {
        match self {
            Self::Delivered => None,
            Self::NoActivePrimary => Some(REASON_NO_ACTIVE_PRIMARY),
        }
    }
}

struct PrimaryOwner {
    registration_id: RegistrationId,
    handler: Arc<dyn PrimaryHandler>,
}

/// Identity -> primary owner table. Clones share the same table.
#[derive(Clone, Default)]
pub struct OwnershipCoordinator {
    owners: Arc<RwLock<HashMap<String, PrimaryOwner>>>,
}

impl OwnershipCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the primary slot for `app_identity` if it is free.
    ///
    /// Always returns a handle; `is_primary()` reports whether the claim won.
    pub fn register<H>(
        &self,
        app_identity: &str,
        handler: H,
    ) -> Result<RegistrationHandle, ActivationError>
    where
        H: PrimaryHandler + 'static,
    {
        let app_identity = normalize_identity(app_identity)?;
        let registration_id = RegistrationId::new();

        let is_primary = match self.owners.write().entry(app_identity.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(PrimaryOwner {
                    registration_id,
                    handler: Arc::new(handler),
                });
                true
            }
        };

        log::debug!(
            "activation registration {registration_id} for {app_identity}: {}",
            if is_primary { "primary" } else { "secondary" }
        );

        Ok(RegistrationHandle {
            coordinator: self.clone(),
            app_identity,
            registration_id,
            is_primary,
            disposed: AtomicBool::new(false),
        })
    }

    /// Deliver `request` to the live primary of `app_identity` and wait for it.
    ///
    /// `cancel` is checked once, before the owner is looked up. Handler
    /// failures come back as [`ActivationError::Handler`].
    pub async fn forward(
        &self,
        app_identity: &str,
        request: ActivationRequest,
        cancel: &CancellationToken,
    ) -> Result<ForwardOutcome, ActivationError> {
        if cancel.is_cancelled() {
            return Err(ActivationError::Cancelled);
        }
        self.forward_committed(app_identity, request, cancel).await
    }

    /// [`Self::forward`] without the cancellation checkpoint, for callers that
    /// already passed their own and have committed state since.
    pub(crate) async fn forward_committed(
        &self,
        app_identity: &str,
        request: ActivationRequest,
        cancel: &CancellationToken,
    ) -> Result<ForwardOutcome, ActivationError> {
        let handler = {
            let owners = self.owners.read();
            match owners.get(app_identity.trim()) {
                Some(owner) => Arc::clone(&owner.handler),
                None => return Ok(ForwardOutcome::NoActivePrimary),
            }
        };

        handler
            .handle(request, cancel.clone())
            .await
            .map_err(ActivationError::Handler)?;
        Ok(ForwardOutcome::Delivered)
    }

    pub fn has_primary(&self, app_identity: &str) -> bool {
        self.owners.read().contains_key(app_identity.trim())
    }

    pub fn primary_registration(&self, app_identity: &str) -> Option<RegistrationId> {
        self.owners
            .read()
            .get(app_identity.trim())
            .map(|owner| owner.registration_id)
    }

    /// Remove the owner only if `registration_id` still holds the slot.
    fn release(&self, app_identity: &str, registration_id: RegistrationId) -> bool {
        let mut owners = self.owners.write();
        match owners.entry(app_identity.to_string()) {
            Entry::Occupied(owner) if owner.get().registration_id == registration_id => {
                owner.remove();
                true
            }
            _ => false,
        }
    }
}

impl fmt::Debug for OwnershipCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let owners = self.owners.read();
        f.debug_struct("OwnershipCoordinator")
            .field("identities", &owners.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn normalize_identity(app_identity: &str) -> Result<String, ActivationError> {
    let trimmed = app_identity.trim();
    if trimmed.is_empty() {
        return Err(ActivationError::EmptyAppIdentity);
    }
    Ok(trimmed.to_string())
}

/// A candidate owner's registration. Dropping it disposes it.
pub struct RegistrationHandle {
    coordinator: OwnershipCoordinator,
    app_identity: String,
    registration_id: RegistrationId,
    is_primary: bool,
    disposed: AtomicBool,
}

impl RegistrationHandle {
    pub fn app_identity(&self) -> &str {
        &self.app_identity
    }

    pub fn registration_id(&self) -> RegistrationId {
        self.registration_id
    }

    /// Fixed when the handle was created.
    pub fn is_primary(&self) -> bool {
        self.is_primary
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Forward through the coordinator to whichever registration is primary
    /// for this handle's identity, which may be this one.
    pub async fn forward(
        &self,
        request: ActivationRequest,
        cancel: &CancellationToken,
    ) -> Result<ForwardOutcome, ActivationError> {
        if self.is_disposed() {
            return Err(ActivationError::Disposed);
        }
        self.coordinator
            .forward(&self.app_identity, request, cancel)
            .await
    }

    /// Release the primary slot if this registration still holds it.
    /// Idempotent.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        if self
            .coordinator
            .release(&self.app_identity, self.registration_id)
        {
            log::debug!(
                "activation registration {} released primary slot for {}",
                self.registration_id,
                self.app_identity
            );
        }
    }
}

impl Drop for RegistrationHandle {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for RegistrationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationHandle")
            .field("app_identity", &self.app_identity)
            .field("registration_id", &self.registration_id)
            .field("is_primary", &self.is_primary)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
