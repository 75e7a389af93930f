/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Deep-link activation routing for the Graphshell host.
//!
//! A launch uri enters through [`RegistrationService::ingest_activation`] (or
//! [`handle_platform_activation`] for raw platform strings), is matched to the
//! app identity that declared its scheme, passes the admission policy and the
//! replay window, and is forwarded to that identity's single primary owner.

pub mod registries;
pub mod shell;

pub use registries::atomic::deep_link_route::{RouteDeclaration, RouteRegistration, RouteRegistry};
pub use shell::activation::{
    ActivationDiagnosticEvent, ActivationEnvelope, ActivationError, ActivationRequest,
    ActivationSource, AdmissionDecision, AdmissionPolicy, ForwardOutcome, HandlerError,
    IngressOutcome, OwnershipCoordinator, PrimaryHandler, RegistrationHandle,
    RegistrationService, RegistrationServiceConfig, handle_platform_activation,
};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
