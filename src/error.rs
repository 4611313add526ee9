/// Boxed error used by the HTTP round-tripper seam.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Error returned by a [`RecordHandler`](crate::handler::RecordHandler)
/// when a record could not be written.
#[derive(thiserror::Error, Debug)]
pub enum HandlerError {
    #[error("failed to encode log record: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to write log record: {0}")]
    Io(#[from] std::io::Error),

    #[error("log writer lock poisoned")]
    Poisoned,
}

/// Error returned when a level name cannot be parsed.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown log level: {0}")]
pub struct ParseLevelError(pub String);

/// Error type returned when loading a [`LoggerConfig`](crate::logger::LoggerConfig)
/// from the environment.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("invalid {var}: {source}")]
    Level {
        var: &'static str,
        #[source]
        source: ParseLevelError,
    },
}

/// Error type returned when installing the `tracing` bridge.
#[derive(thiserror::Error, Debug)]
pub enum InitError {
    #[error("a global tracing subscriber is already installed")]
    SetGlobalDefault(#[from] tracing::subscriber::SetGlobalDefaultError),
}
