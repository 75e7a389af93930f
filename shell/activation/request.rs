/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::collections::BTreeMap;

use time::OffsetDateTime;
use url::Url;

use super::envelope::ActivationEnvelope;

pub const METADATA_SOURCE: &str = "deeplink.source";
pub const METADATA_IDEMPOTENCY_KEY: &str = "deeplink.idempotencyKey";
pub const METADATA_ROUTE: &str = "deeplink.route";

/// Payload handed to the primary owner's handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationRequest {
    deep_link_uri: Url,
    metadata: BTreeMap<String, String>,
    received_at: OffsetDateTime,
}

impl ActivationRequest {
    /// `received_at` defaults to now. Later duplicates of a metadata key win.
    pub fn new<I, K, V>(
        deep_link_uri: Url,
        metadata: I,
        received_at: Option<OffsetDateTime>,
    ) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            deep_link_uri,
            metadata: metadata
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
            received_at: received_at.unwrap_or_else(OffsetDateTime::now_utc),
        }
    }

    pub fn from_envelope(envelope: &ActivationEnvelope) -> Self {
        Self::new(
            envelope.raw_uri().clone(),
            [
                (METADATA_SOURCE, envelope.source().name().to_string()),
                (
                    METADATA_IDEMPOTENCY_KEY,
                    envelope.idempotency_key().to_string(),
                ),
                (METADATA_ROUTE, envelope.route().to_string()),
            ],
            None,
        )
    }

    pub fn deep_link_uri(&self) -> &Url {
        &self.deep_link_uri
    }

    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    pub fn received_at(&self) -> OffsetDateTime {
        self.received_at
    }
}
