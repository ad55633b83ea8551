//! Process-wide tracing setup for the binary.

use thiserror::Error;
use tracing::Subscriber;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter};

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Failed to install log bridge: {0}")]
    Bridge(#[from] log::SetLoggerError),

    #[error("Failed to install tracing subscriber: {0}")]
    Subscriber(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// Builds the filter from `RUST_LOG`, falling back to `default_filter`.
pub fn env_filter(default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
}

/// Installs a global fmt subscriber (plain or JSON lines) and routes `log`
/// records through it. Can only succeed once per process.
pub fn init(default_filter: &str, json: bool) -> Result<(), LoggingError> {
    let filter = env_filter(default_filter);
    let fmt_layer = fmt::layer().with_target(true);

    if json {
        install(tracing_subscriber::registry().with(filter).with(fmt_layer.json()))?;
    } else {
        install(tracing_subscriber::registry().with(filter).with(fmt_layer))?;
    }

    tracing_log::LogTracer::init()?;
    Ok(())
}

fn install<S>(subscriber: S) -> Result<(), LoggingError>
where
    S: Subscriber + Send + Sync + 'static,
{
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}
