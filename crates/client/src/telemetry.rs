//! Logging and error-tracking setup for applications embedding the client.
//!
//! ```rust,ignore
//! let config = ClientConfig::from_env()?;
//! let _sentry_guard = telemetry::init(&config);
//! ```

use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::ClientConfig;

/// Filter used when `RUST_LOG` is not set.
pub const DEFAULT_LOG_FILTER: &str = "basket_client=info";

/// Initialize Sentry and tracing.
///
/// Returns the Sentry guard when a DSN is configured; it must be kept alive
/// for events to be flushed.
pub fn init(config: &ClientConfig) -> Option<sentry::ClientInitGuard> {
    let guard = init_sentry(config);
    init_tracing();
    guard
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
#[must_use]
pub fn init_sentry(config: &ClientConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    if guard.is_enabled() {
        tracing::info!("Sentry error tracking initialized");
    }

    Some(guard)
}

/// Install the global tracing subscriber with `EnvFilter` and Sentry layers.
///
/// Returns `false` if a global subscriber was already set.
pub fn init_tracing() -> bool {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .try_init()
        .is_ok()
}

/// Send warnings and errors to Sentry as events, info and debug as breadcrumbs.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}
