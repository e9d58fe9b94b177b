//! Logging setup for the binary

use crate::config::LoggingSettings;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter with the precedence `--verbose` > `RUST_LOG` > `logging.level`
pub fn build_filter(logging: &LoggingSettings) -> EnvFilter {
    if logging.verbose {
        EnvFilter::new("debug")
    } else if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new(&logging.level)
    }
}

/// Install the global subscriber, writing to stderr so stdout stays parseable
pub fn init_logging(logging: &LoggingSettings) {
    // A subscriber may already be installed (tests); keep it
    let _ = tracing_subscriber::registry()
        .with(build_filter(logging))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
