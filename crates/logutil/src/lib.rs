//! Utilities for logging.

use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// How verbose logging should be when `RUST_LOG` isn't set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    #[default]
    Info,
    Debug,
    Trace,
}

impl From<Verbosity> for Level {
    fn from(value: Verbosity) -> Self {
        match value {
            Verbosity::Info => Level::INFO,
            Verbosity::Debug => Level::DEBUG,
            Verbosity::Trace => Level::TRACE,
        }
    }
}

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoggingMode {
    /// Human readable, one line per event.
    #[default]
    Compact,
    /// Newline delimited json.
    Json,
}

fn env_filter(default: Level) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(default.into())
        .from_env_lossy()
}

/// Configure the global logger.
///
/// Directives in `RUST_LOG` take precedence over `verbosity`. Calling this more
/// than once is a no-op.
pub fn configure_global_logger(verbosity: Verbosity, mode: LoggingMode) {
    let filter = env_filter(verbosity.into());

    let result = match mode {
        LoggingMode::Compact => {
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter)
                .compact()
                .finish();
            tracing::subscriber::set_global_default(subscriber)
        }
        LoggingMode::Json => {
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter)
                .json()
                .with_current_span(true)
                .finish();
            tracing::subscriber::set_global_default(subscriber)
        }
    };

    // Already set, probably from another test or an embedding application.
    let _ = result;
}

/// Initialize logging for tests.
///
/// Output is routed through the test writer so it's only shown for failing
/// tests.
pub fn init_test() {
    let subscriber = FmtSubscriber::builder()
        .with_test_writer()
        .with_env_filter(env_filter(Level::DEBUG))
        .with_file(true)
        .with_line_number(true)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}
