//! Environment variable names used by this crate for configuring a
//! [`LoggerConfig`] from a service's runtime environment.
//!
//! These are purely helpers; [`Logger::new`](crate::logger::Logger::new)
//! never reads the environment itself.

use crate::error::ConfigError;
use crate::level::Level;
use crate::logger::LoggerConfig;

/// GCP project used to qualify trace IDs.
pub const LOG_PROJECT_ID_ENV: &str = "LOG_PROJECT_ID";

/// Fallback project variable set by Google tooling.
pub const GOOGLE_CLOUD_PROJECT_ENV: &str = "GOOGLE_CLOUD_PROJECT";

/// Logical service name written to `serviceContext.service`.
pub const LOG_SERVICE_NAME_ENV: &str = "LOG_SERVICE_NAME";

/// Fallback service name set by Cloud Run.
pub const K_SERVICE_ENV: &str = "K_SERVICE";

/// Minimum level, e.g. `debug` or `WARNING`.
pub const LOG_LEVEL_ENV: &str = "LOG_LEVEL";

impl LoggerConfig {
    /// Build a config from the process environment.
    ///
    /// Unset variables keep their [`Default`] values; an unparsable
    /// `LOG_LEVEL` is an error.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`LoggerConfig::from_env`] with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |keys: &[&str]| {
            keys.iter()
                .filter_map(|k| lookup(*k))
                .find(|v| !v.trim().is_empty())
        };

        let min_level = match get(&[LOG_LEVEL_ENV]) {
            Some(name) => name
                .parse::<Level>()
                .map_err(|source| ConfigError::Level {
                    var: LOG_LEVEL_ENV,
                    source,
                })?,
            None => Level::Info,
        };

        Ok(LoggerConfig {
            project_id: get(&[LOG_PROJECT_ID_ENV, GOOGLE_CLOUD_PROJECT_ENV]),
            service_name: get(&[LOG_SERVICE_NAME_ENV, K_SERVICE_ENV]).unwrap_or_default(),
            min_level,
            ..LoggerConfig::default()
        })
    }
}
