//! Logging initialization
//!
//! Installs the global `tracing` subscriber. Output goes to stderr so that
//! command output on stdout stays clean for scripting.

use std::sync::Once;

use tracing_subscriber::{util::SubscriberInitExt, EnvFilter};

use crate::config::LogFormat;

/// Environment variable holding the log filter directives
pub const LOG_ENV: &str = "ENCORE_LOG";

const DEFAULT_FILTER: &str = "encore=info";

static INIT_ONCE: Once = Once::new();

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Initialize the global subscriber
///
/// Only the first call has any effect.
pub fn init(format: LogFormat) {
    INIT_ONCE.call_once(|| {
        let result = match format {
            LogFormat::Pretty => tracing_subscriber::fmt()
                .with_env_filter(env_filter())
                .with_writer(std::io::stderr)
                .with_target(false)
                .finish()
                .try_init(),
            LogFormat::Json => tracing_subscriber::fmt()
                .json()
                .with_env_filter(env_filter())
                .with_writer(std::io::stderr)
                .finish()
                .try_init(),
        };
        if let Err(e) = result {
            eprintln!("warning: logging already initialized: {}", e);
        }
    });
}
