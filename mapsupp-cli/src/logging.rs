//! Logging setup for the CLI.
//!
//! Structured logging goes to stderr so stdout stays reserved for the
//! instructional output contract. `RUST_LOG` overrides the level; without it
//! the default is `info`, or `debug` when `--verbose` is given.

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
pub fn init(verbose: bool) -> Result<(), String> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| e.to_string())
}
