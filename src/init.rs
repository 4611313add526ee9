use crate::error::InitError;
use crate::layer::LoggerLayer;
use crate::logger::{Logger, LoggerConfig};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

/// Install a global `tracing` subscriber that writes every event through
/// `logger`.
///
/// **Parameters**
/// - `logger`: destination for events emitted with the `tracing` macros.
///
/// **Returns**
/// - `Err(InitError::SetGlobalDefault)` if a global subscriber is already set.
///
/// **Effects**
///
/// This installs a [`Registry`] combined with [`LoggerLayer`] as the global
/// default subscriber, so `tracing` events from libraries end up in the same
/// JSON stream as records logged through the [`Logger`] directly.
pub fn init_tracing(logger: Logger) -> Result<(), InitError> {
    let subscriber = Registry::default().with(LoggerLayer::new(logger));
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

/// Build a [`Logger`] from the environment and install it for `tracing`.
///
/// **Behavior**
///
/// Equivalent to [`LoggerConfig::from_env`], [`Logger::new`] and
/// [`init_tracing`]. Returns the logger for direct use. This is the
/// recommended entrypoint for typical microservices.
pub fn init_from_env() -> Result<Logger, Box<dyn std::error::Error + Send + Sync>> {
    let logger = Logger::new(LoggerConfig::from_env()?);
    init_tracing(logger.clone())?;
    Ok(logger)
}
