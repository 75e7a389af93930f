/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Entry point for platform launch glue.
//!
//! OS integration code hands over whatever string the platform delivered. A
//! string that does not parse as an absolute uri is unroutable, not an error.

use tokio_util::sync::CancellationToken;

use super::envelope::{ActivationSource, parse_absolute_uri};
use super::error::ActivationError;
use super::service::{IngressOutcome, RegistrationService};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformSupport {
    Supported,
    NotSupported,
}

/// How a platform delivers protocol launches to the host process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformEntryDescriptor {
    pub platform_name: &'static str,
    pub support: PlatformSupport,
    pub entrypoint_description: Option<&'static str>,
}

impl PlatformEntryDescriptor {
    pub const WINDOWS: Self = Self::supported(
        "Windows",
        "Protocol activation via command-line URI argument or AppLifecycle activation.",
    );
    pub const MACOS: Self = Self::supported(
        "macOS",
        "Protocol activation via NSApplicationDelegate application:openURLs: callback.",
    );
    pub const IOS: Self = Self::supported(
        "iOS",
        "Protocol activation via UIApplicationDelegate application:openURL:options: callback.",
    );
    pub const ANDROID: Self = Self::supported(
        "Android",
        "Protocol activation via Intent with ACTION_VIEW and data URI.",
    );
    pub const LINUX: Self = Self::supported(
        "Linux",
        "Protocol activation via xdg-open / .desktop handler or DBus Activate signal.",
    );

    const fn supported(platform_name: &'static str, description: &'static str) -> Self {
        Self {
            platform_name,
            support: PlatformSupport::Supported,
            entrypoint_description: Some(description),
        }
    }

    pub fn all() -> &'static [PlatformEntryDescriptor] {
        &PLATFORM_DESCRIPTORS
    }

    /// Descriptor for the platform this binary was compiled for.
    pub fn current() -> Option<PlatformEntryDescriptor> {
        let name = match std::env::consts::OS {
            "windows" => "Windows",
            "macos" => "macOS",
            "ios" => "iOS",
            "android" => "Android",
            "linux" => "Linux",
            _ => return None,
        };
        Self::all()
            .iter()
            .copied()
            .find(|descriptor| descriptor.platform_name == name)
    }
}

static PLATFORM_DESCRIPTORS: [PlatformEntryDescriptor; 5] = [
    PlatformEntryDescriptor::WINDOWS,
    PlatformEntryDescriptor::MACOS,
    PlatformEntryDescriptor::IOS,
    PlatformEntryDescriptor::ANDROID,
    PlatformEntryDescriptor::LINUX,
];

/// Parse a platform-supplied uri string and ingest it.
///
/// Empty, relative or malformed strings come back as
/// [`IngressOutcome::NoMatchingRoute`]. Cancellation and handler failures still
/// surface as errors.
pub async fn handle_platform_activation(
    service: &RegistrationService,
    raw_uri: &str,
    source: ActivationSource,
    cancel: &CancellationToken,
) -> Result<IngressOutcome, ActivationError> {
    let uri = match parse_absolute_uri(raw_uri) {
        Ok(uri) => uri,
        Err(error) => {
            log::debug!("platform activation ignored: {error}");
            return Ok(IngressOutcome::NoMatchingRoute);
        }
    };
    service.ingest_activation(&uri, source, cancel).await
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::registries::atomic::deep_link_route::RouteDeclaration;
    use crate::shell::activation::error::HandlerError;
    use crate::shell::activation::request::ActivationRequest;

    #[test]
    fn descriptors_cover_every_supported_platform() {
        let all = PlatformEntryDescriptor::all();

        assert_eq!(all.len(), 5);
        for name in ["Windows", "macOS", "iOS", "Android", "Linux"] {
            assert!(all.iter().any(|descriptor| descriptor.platform_name == name));
        }
        assert!(all.iter().all(|descriptor| descriptor.support == PlatformSupport::Supported));
    }

    #[test]
    fn current_platform_resolves_from_the_table() {
        let expected = match std::env::consts::OS {
            "windows" => Some(PlatformEntryDescriptor::WINDOWS),
            "macos" => Some(PlatformEntryDescriptor::MACOS),
            "ios" => Some(PlatformEntryDescriptor::IOS),
            "android" => Some(PlatformEntryDescriptor::ANDROID),
            "linux" => Some(PlatformEntryDescriptor::LINUX),
            _ => None,
        };

        assert_eq!(PlatformEntryDescriptor::current(), expected);
    }

    #[tokio::test]
    async fn valid_platform_string_is_ingested() {
        let service = RegistrationService::default();
        service.register_route(
            RouteDeclaration::new("app1", "myapp", None).expect("declaration should be valid"),
        );
        let count = Arc::new(AtomicUsize::new(0));
        let handler_count = Arc::clone(&count);
        let _primary = service
            .coordinator()
            .register("app1", move |_request: ActivationRequest, _cancel: CancellationToken| {
                let count = Arc::clone(&handler_count);
                async move {
                    count.fetch_add(1, Ordering::SeqCst);
                    Ok::<(), HandlerError>(())
                }
            })
            .expect("register primary");

        let outcome = handle_platform_activation(
            &service,
            "myapp://host/from-platform",
            ActivationSource::ProtocolLaunch,
            &CancellationToken::new(),
        )
        .await
        .expect("ingest should succeed");

        assert_eq!(outcome, IngressOutcome::Dispatched);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unparseable_platform_string_is_unroutable() {
        let service = RegistrationService::default();

        for raw in ["", "not a uri", "/relative/path"] {
            let outcome = handle_platform_activation(
                &service,
                raw,
                ActivationSource::ProtocolLaunch,
                &CancellationToken::new(),
            )
            .await
            .expect("unparseable input should not error");
            assert_eq!(outcome, IngressOutcome::NoMatchingRoute);
        }
    }
}
