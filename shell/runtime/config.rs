/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Host-side router configuration.
//!
//! ```toml
//! replay_window_ms = 5000
//! allowed_sources = ["protocol", "forward"]
//!
//! [[routes]]
//! app = "notes"
//! scheme = "notes"
//! host = "open"
//! ```

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::registries::atomic::deep_link_route::RouteDeclaration;
use crate::shell::activation::admission::{DEFAULT_REPLAY_WINDOW, SourceAllowlistPolicy};
use crate::shell::activation::envelope::ActivationSource;
use crate::shell::activation::error::ActivationError;
use crate::shell::activation::service::{RegistrationService, RegistrationServiceConfig};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouteEntry {
    pub app: String,
    pub scheme: String,
    #[serde(default)]
    pub host: Option<String>,
}

impl RouteEntry {
    /// Parse `APP=SCHEME` or `APP=SCHEME:HOST`.
    pub fn parse(raw: &str) -> Result<Self, ActivationError> {
        let Some((app, target)) = raw.split_once('=') else {
            return Err(ActivationError::Config(format!(
                "route {raw:?} is not APP=SCHEME[:HOST]"
            )));
        };
        let (scheme, host) = match target.split_once(':') {
            Some((scheme, host)) if !host.is_empty() => (scheme, Some(host.to_string())),
            Some((scheme, _)) => (scheme, None),
            None => (target, None),
        };
        Ok(Self {
            app: app.to_string(),
            scheme: scheme.to_string(),
            host,
        })
    }

    pub fn to_declaration(&self) -> Result<RouteDeclaration, ActivationError> {
        RouteDeclaration::new(&self.app, &self.scheme, self.host.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouterConfig {
    #[serde(default = "default_replay_window_ms")]
    pub replay_window_ms: u64,
    #[serde(default)]
    pub routes: Vec<RouteEntry>,
    #[serde(default)]
    pub allowed_sources: Option<Vec<String>>,
}

fn default_replay_window_ms() -> u64 {
    DEFAULT_REPLAY_WINDOW.as_millis() as u64
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            replay_window_ms: default_replay_window_ms(),
            routes: Vec::new(),
            allowed_sources: None,
        }
    }
}

impl RouterConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ActivationError> {
        toml::from_str(raw).map_err(|error| ActivationError::Config(error.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self, ActivationError> {
        let raw = fs::read_to_string(path).map_err(|error| {
            ActivationError::Config(format!("failed to read {}: {error}", path.display()))
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn replay_window(&self) -> Duration {
        Duration::from_millis(self.replay_window_ms)
    }

    pub fn allowed_sources(&self) -> Result<Option<Vec<ActivationSource>>, ActivationError> {
        self.allowed_sources
            .as_ref()
            .map(|names| {
                names
                    .iter()
                    .map(|name| parse_source(name))
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()
    }

    /// Build a service and register every configured route. Rejected
    /// (duplicate) routes are logged by the registry and skipped.
    pub fn build_service(&self) -> Result<RegistrationService, ActivationError> {
        let declarations = self
            .routes
            .iter()
            .map(RouteEntry::to_declaration)
            .collect::<Result<Vec<_>, _>>()?;

        let mut service = RegistrationService::new(RegistrationServiceConfig {
            replay_window: self.replay_window(),
        });
        if let Some(sources) = self.allowed_sources()? {
            service = service.with_policy(Arc::new(SourceAllowlistPolicy::new(sources)));
        }
        for declaration in declarations {
            service.register_route(declaration);
        }
        Ok(service)
    }

    pub fn app_identities(&self) -> Vec<String> {
        let mut identities: Vec<String> = Vec::new();
        for entry in &self.routes {
            let app = entry.app.trim();
            if !identities.iter().any(|known| known == app) {
                identities.push(app.to_string());
            }
        }
        identities
    }
}

/// Accepts short names (`protocol`, `forward`, `host`) and variant names.
pub fn parse_source(name: &str) -> Result<ActivationSource, ActivationError> {
    let trimmed = name.trim();
    let short = match trimmed.to_ascii_lowercase().as_str() {
        "protocol" | "protocol-launch" => Some(ActivationSource::ProtocolLaunch),
        "forward" | "secondary-forward" => Some(ActivationSource::SecondaryForward),
        "host" | "host-injected" => Some(ActivationSource::HostInjected),
        _ => None,
    };
    short
        .or_else(|| {
            ActivationSource::ALL
                .into_iter()
                .find(|source| source.name().eq_ignore_ascii_case(trimmed))
        })
        .ok_or_else(|| ActivationError::Config(format!("unknown activation source {name:?}")))
}
