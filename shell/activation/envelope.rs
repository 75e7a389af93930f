/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Canonical activation envelopes.
//!
//! Every launch URI is normalized exactly once into an [`ActivationEnvelope`].
//! Two launches of the same logical link share an idempotency key even though
//! each gets its own activation id and timestamp.

use std::fmt;

use serde::Serialize;
use time::OffsetDateTime;
use url::Url;
use uuid::Uuid;

use super::error::ActivationError;

/// Where a launch event came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ActivationSource {
    /// OS protocol handler launch.
    ProtocolLaunch = 0,
    /// Forwarded from a secondary instance of the same app.
    SecondaryForward = 1,
    /// Injected programmatically by the host.
    HostInjected = 2,
}

impl ActivationSource {
    pub const ALL: [ActivationSource; 3] = [
        Self::ProtocolLaunch,
        Self::SecondaryForward,
        Self::HostInjected,
    ];

    pub fn ordinal(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::ProtocolLaunch => "ProtocolLaunch",
            Self::SecondaryForward => "SecondaryForward",
            Self::HostInjected => "HostInjected",
        }
    }
}

impl fmt::Display for ActivationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Unique id of one activation attempt. Also the diagnostics correlation id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ActivationId(Uuid);

impl ActivationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ActivationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ActivationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationEnvelope {
    activation_id: ActivationId,
    route: String,
    raw_uri: Url,
    source: ActivationSource,
    occurred_at: OffsetDateTime,
    idempotency_key: String,
}

impl ActivationEnvelope {
    /// Build an envelope from already-canonical parts. A parsed [`Url`] is
    /// always absolute, so only the route needs checking.
    pub fn new(
        activation_id: ActivationId,
        route: impl Into<String>,
        raw_uri: Url,
        source: ActivationSource,
        occurred_at: OffsetDateTime,
    ) -> Result<Self, ActivationError> {
        let route = route.into();
        if route.is_empty() {
            return Err(ActivationError::EmptyRoute);
        }
        let idempotency_key = idempotency_key(&route, raw_uri.query(), source);
        Ok(Self {
            activation_id,
            route,
            raw_uri,
            source,
            occurred_at,
            idempotency_key,
        })
    }

    pub fn activation_id(&self) -> ActivationId {
        self.activation_id
    }

    /// Lower-cased `scheme://host/path` with trailing slashes trimmed.
    pub fn route(&self) -> &str {
        &self.route
    }

    pub fn raw_uri(&self) -> &Url {
        &self.raw_uri
    }

    pub fn source(&self) -> ActivationSource {
        self.source
    }

    pub fn occurred_at(&self) -> OffsetDateTime {
        self.occurred_at
    }

    pub fn idempotency_key(&self) -> &str {
        &self.idempotency_key
    }

    /// Lower-cased scheme of the raw uri.
    pub fn scheme(&self) -> String {
        self.raw_uri.scheme().to_ascii_lowercase()
    }

    /// Lower-cased host of the raw uri, empty when the uri has none.
    pub fn host(&self) -> String {
        self.raw_uri
            .host_str()
            .unwrap_or_default()
            .to_ascii_lowercase()
    }
}

/// `route|?query|ordinal`; the query keeps its leading `?` and is empty when absent.
fn idempotency_key(route: &str, query: Option<&str>, source: ActivationSource) -> String {
    let query = query.map(|query| format!("?{query}")).unwrap_or_default();
    format!("{route}|{query}|{ordinal}", ordinal = source.ordinal())
}

/// Canonical route for a uri: `scheme://host/path`, lower-cased, trailing `/`
/// trimmed and an empty path written as `/`.
pub fn canonical_route(uri: &Url) -> String {
    let scheme = uri.scheme().to_ascii_lowercase();
    let host = uri.host_str().unwrap_or_default().to_ascii_lowercase();
    let path = uri.path().trim_end_matches('/').to_ascii_lowercase();

    let path = if path.is_empty() {
        "/".to_string()
    } else if path.starts_with('/') {
        path
    } else {
        format!("/{path}")
    };

    format!("{scheme}://{host}{path}")
}

/// Normalize a launch uri into a fresh envelope.
///
/// Total over any parsed [`Url`]: the `url` crate only produces absolute uris,
/// so the only caller-contract check left is at string parsing time (see
/// [`parse_absolute_uri`]).
pub fn normalize(raw_uri: &Url, source: ActivationSource) -> ActivationEnvelope {
    let route = canonical_route(raw_uri);
    let idempotency_key = idempotency_key(&route, raw_uri.query(), source);
    // canonical_route never returns an empty string, so this skips `new`.
    ActivationEnvelope {
        activation_id: ActivationId::new(),
        route,
        raw_uri: raw_uri.clone(),
        source,
        occurred_at: OffsetDateTime::now_utc(),
        idempotency_key,
    }
}

/// Parse a string that must be an absolute uri.
pub fn parse_absolute_uri(raw: &str) -> Result<Url, ActivationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ActivationError::InvalidUri(raw.to_string()));
    }
    Url::parse(trimmed).map_err(|error| match error {
        url::ParseError::RelativeUrlWithoutBase => ActivationError::RelativeUri(raw.to_string()),
        _ => ActivationError::InvalidUri(raw.to_string()),
    })
}
