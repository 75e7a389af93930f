/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Command-line host for the activation router.
//!
//! Registers the configured routes, claims the primary slot for each app
//! identity with a handler that logs what it receives, then ingests every
//! uri argument in order and prints one outcome per line.

use std::path::PathBuf;
use std::process::ExitCode;

use bpaf::Bpaf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use crate::shell::activation::coordinator::RegistrationHandle;
use crate::shell::activation::entrypoint::{PlatformEntryDescriptor, handle_platform_activation};
use crate::shell::activation::error::{ActivationError, HandlerError};
use crate::shell::activation::request::{ActivationRequest, METADATA_ROUTE};
use crate::shell::activation::service::RegistrationService;
use crate::shell::runtime::config::{RouteEntry, RouterConfig, parse_source};

#[derive(Debug, Clone, Bpaf)]
#[bpaf(options, version)]
/// Route deep-link activations to registered primary handlers
pub struct CliOptions {
    /// TOML router configuration file
    #[bpaf(long, short, argument("PATH"))]
    pub config: Option<PathBuf>,
    /// Route declaration, may be repeated
    #[bpaf(long("route"), short('r'), argument("APP=SCHEME[:HOST]"))]
    pub routes: Vec<String>,
    /// Replay window in milliseconds, overrides the config file
    #[bpaf(long("replay-window-ms"), argument("MS"))]
    pub replay_window_ms: Option<u64>,
    /// Activation source: protocol, forward or host
    #[bpaf(long, argument("SOURCE"), fallback("protocol".to_string()))]
    pub source: String,
    /// Launch uris to ingest, in order
    #[bpaf(positional("URI"))]
    pub uris: Vec<String>,
}

pub fn main() -> ExitCode {
    init_tracing();

    let options = cli_options().run();
    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(error) => {
            log::error!("failed to start async runtime: {error}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(options)) {
        Ok(_) => ExitCode::SUCCESS,
        Err(error) => {
            log::error!("{error}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // Also bridges `log` records from the library into the subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn resolve_config(options: &CliOptions) -> Result<RouterConfig, ActivationError> {
    let mut config = match &options.config {
        Some(path) => RouterConfig::load(path)?,
        None => RouterConfig::default(),
    };
    for route in &options.routes {
        config.routes.push(RouteEntry::parse(route)?);
    }
    if let Some(replay_window_ms) = options.replay_window_ms {
        config.replay_window_ms = replay_window_ms;
    }
    Ok(config)
}

/// Returns how many uris were dispatched.
async fn run(options: CliOptions) -> Result<usize, ActivationError> {
    let config = resolve_config(&options)?;
    let source = parse_source(&options.source)?;
    let service = config.build_service()?;
    let _primaries = register_logging_primaries(&service, &config)?;

    match PlatformEntryDescriptor::current() {
        Some(platform) => log::debug!(
            "{} launch entry: {}",
            platform.platform_name,
            platform.entrypoint_description.unwrap_or("-")
        ),
        None => log::debug!("no platform launch entry for {}", std::env::consts::OS),
    }

    let cancel = CancellationToken::new();
    let mut dispatched = 0;
    for raw in &options.uris {
        let outcome = handle_platform_activation(&service, raw, source, &cancel).await?;
        if outcome.is_dispatched() {
            dispatched += 1;
        }
        println!("{raw}\t{outcome}");
    }
    log::info!("{dispatched} of {} activations dispatched", options.uris.len());
    Ok(dispatched)
}

fn register_logging_primaries(
    service: &RegistrationService,
    config: &RouterConfig,
) -> Result<Vec<RegistrationHandle>, ActivationError> {
    config
        .app_identities()
        .into_iter()
        .map(|app_identity| {
            let owner = app_identity.clone();
            service.coordinator().register(
                &app_identity,
                move |request: ActivationRequest, _cancel: CancellationToken| {
                    log::info!(
                        "{owner} handling {} (route {})",
                        request.deep_link_uri(),
                        request.metadata_value(METADATA_ROUTE).unwrap_or("-")
                    );
                    async { Ok::<(), HandlerError>(()) }
                },
            )
        })
        .collect()
}
