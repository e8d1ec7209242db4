//! Tracing subscriber setup.

use anyhow::Context as _;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LogConfig;

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `config.filter`.
///
/// # Errors
///
/// Fails if the filter does not parse or a global subscriber is already set.
pub fn init_tracing(config: &LogConfig) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.filter)
            .with_context(|| format!("invalid log filter {:?}", config.filter))?,
    };

    let subscriber = tracing_subscriber::registry().with(filter);
    if config.json {
        subscriber
            .with(fmt::layer().json())
            .try_init()
            .context("failed to install tracing subscriber")?;
    } else {
        subscriber
            .with(fmt::layer())
            .try_init()
            .context("failed to install tracing subscriber")?;
    }

    tracing::debug!(json = config.json, "tracing initialized");
    Ok(())
}
