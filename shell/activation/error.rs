/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use thiserror::Error;

/// Failure raised by a primary activation handler.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Contract violations and handler faults.
///
/// Expected routing outcomes (no route, denied, duplicate) are never errors;
/// see [`IngressOutcome`](super::service::IngressOutcome).
#[derive(Debug, Error)]
pub enum ActivationError {
    #[error("app identity must not be empty")]
    EmptyAppIdentity,
    #[error("scheme must not be empty")]
    EmptyScheme,
    #[error("route must not be empty")]
    EmptyRoute,
    #[error("uri must be absolute: {0}")]
    RelativeUri(String),
    #[error("invalid uri {0:?}")]
    InvalidUri(String),
    #[error("activation cancelled before dispatch")]
    Cancelled,
    #[error("registration handle already disposed")]
    Disposed,
    #[error("primary activation handler failed")]
    Handler(#[source] HandlerError),
    #[error("invalid activation config: {0}")]
    Config(String),
}
