//! Logger setup based on `tracing-subscriber`.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Build the filter directive used when `RUST_LOG` is not set.
///
/// The binary's own crate and the client library log at `default_level`,
/// everything else (hyper, tungstenite, ...) at `warn`.
pub fn default_directive(bin_name: &str, default_level: &str) -> String {
    let crate_name = bin_name.replace('-', "_");
    if crate_name == "tsudoi_client" {
        format!("{crate_name}={default_level},warn")
    } else {
        format!("{crate_name}={default_level},tsudoi_client={default_level},warn")
    }
}

/// Initialize the global tracing subscriber.
///
/// Logs are written to stderr so that they never interleave with the chat
/// transcript printed on stdout.
///
/// # Arguments
///
/// * `bin_name` - Binary name (usually `env!("CARGO_BIN_NAME")`)
/// * `default_level` - Level used when `RUST_LOG` is not set
pub fn setup_logger(bin_name: &str, default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(bin_name, default_level)));

    // A second call (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init();
}
