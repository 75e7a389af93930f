/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Deep-link activation admission and single-owner routing.

pub mod admission;
pub mod coordinator;
pub mod diagnostics;
pub mod entrypoint;
pub mod envelope;
pub mod error;
pub mod request;
pub mod service;

pub use admission::{AdmissionDecision, AdmissionPolicy, ReplayWindow, SourceAllowlistPolicy};
pub use coordinator::{
    ForwardOutcome, OwnershipCoordinator, PrimaryHandler, RegistrationHandle, RegistrationId,
};
pub use diagnostics::{ActivationDiagnosticEvent, ActivationDiagnostics, DiagnosticEventType};
pub use entrypoint::{PlatformEntryDescriptor, PlatformSupport, handle_platform_activation};
pub use envelope::{ActivationEnvelope, ActivationId, ActivationSource, normalize};
pub use error::{ActivationError, HandlerError};
pub use request::ActivationRequest;
pub use service::{IngressOutcome, RegistrationService, RegistrationServiceConfig};
