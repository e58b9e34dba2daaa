//! Stderr logging for the `tcov` binary.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Install the global subscriber.
///
/// `RUST_LOG` overrides the default level (`info`, or `debug` when
/// `verbose`). With `json` every event is written as one JSON object per
/// line; otherwise a compact human-readable format is used. Stdout stays
/// reserved for the report.
pub fn init_logging(verbose: bool, json: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let json_layer = json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
    });
    let terminal_layer = (!json).then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .compact()
    });

    // A subscriber may already be installed when embedded in tests.
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(terminal_layer)
        .with(json_layer)
        .try_init();
}
