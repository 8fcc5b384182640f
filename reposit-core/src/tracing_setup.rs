use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{layer::SubscriberExt, EnvFilter, Registry};

use crate::config::RepositConfig;

/// Filter used when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "info,sqlx=warn";

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable single-line output.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

impl LogFormat {
    /// Read `logging.format` (`pretty` or `json`) from the configuration.
    pub fn from_config<T>(config: &RepositConfig<T>) -> Self {
        match config.get_or("logging.format", String::new()).to_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

/// Install the global `tracing` subscriber, failing if one is already set.
///
/// Respects `RUST_LOG`, falling back to [`DEFAULT_FILTER`].
pub fn try_init_tracing(format: LogFormat) -> Result<(), TryInitError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    match format {
        LogFormat::Json => Registry::default()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(false),
            )
            .try_init(),
        LogFormat::Pretty => Registry::default()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init(),
    }
}

/// Initialise the global `tracing` subscriber with a pretty `fmt` layer.
///
/// Call this once, at the very start of `main`. A second call is ignored.
pub fn init_tracing() {
    if let Err(err) = try_init_tracing(LogFormat::Pretty) {
        tracing::debug!(error = %err, "tracing subscriber already installed");
    }
}
