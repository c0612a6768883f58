//! # Telemetry helpers
//!
//! Logging and metrics initialization shared by the headwater binaries.

use std::{env, fmt};

use error_stack::{Report, Result};
use tracing_subscriber::EnvFilter;

pub mod metrics;
pub mod request;

#[derive(Debug)]
pub struct TelemetryInitError;

impl error_stack::Context for TelemetryInitError {}

impl fmt::Display for TelemetryInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("failed to initialize telemetry")
    }
}

/// Initialize the global tracing subscriber.
///
/// The filter comes from `RUST_LOG` (default `info`). Setting
/// `RUST_LOG_FORMAT=json` switches to newline-delimited JSON output.
pub fn init_telemetry() -> Result<(), TelemetryInitError> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let json_fmt = env::var("RUST_LOG_FORMAT")
        .map(|val| val == "json")
        .unwrap_or(false);

    if json_fmt {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_ansi(false)
            .with_target(true)
            .json()
            .try_init()
            .map_err(|err| Report::new(TelemetryInitError).attach_printable(err.to_string()))?;
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .try_init()
            .map_err(|err| Report::new(TelemetryInitError).attach_printable(err.to_string()))?;
    }

    Ok(())
}
