use fareflow_core::config::{LogFormat, LoggingConfig};
use thiserror::Error;
use tracing::Level;

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("a global tracing subscriber is already installed")]
    AlreadyInitialized,
}

/// Installs the process-wide fmt subscriber. An unrecognised level falls
/// back to `info`.
pub fn init_logging(config: &LoggingConfig) -> Result<(), TelemetryError> {
    let log_level = config.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt().with_target(false).with_max_level(log_level);

    let installed = match config.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|_| TelemetryError::AlreadyInitialized)
}
