//! Tracing subscriber setup

use crate::config::{DeploymentMode, Settings};
use tracing_subscriber::EnvFilter;

/// Install a formatting subscriber for the given settings.
///
/// `RUST_LOG` takes precedence over the mode-derived default. Calling this
/// more than once is harmless; only the first call installs a subscriber.
pub fn init(settings: &Settings) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(settings.mode)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}

/// Default filter directive for a deployment mode
pub fn default_directive(mode: DeploymentMode) -> &'static str {
    match mode {
        DeploymentMode::Development => "sealed_storage=debug",
        DeploymentMode::Production | DeploymentMode::Test => "sealed_storage=info",
    }
}
