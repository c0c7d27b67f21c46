//! Tracing subscriber setup for the `tagr` binary.

use std::sync::Once;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

static INIT: Once = Once::new();

/// Install the global subscriber, writing to stderr.
///
/// `TAGR_LOG` takes standard `EnvFilter` directives
/// (e.g. `TAGR_LOG=tag_resolver_core=debug,tag_resolver=info`). When unset
/// or invalid, the level is `warn`, or `debug` with `verbose`.
///
/// Idempotent.
pub fn init_logging(verbose: bool) {
    INIT.call_once(|| {
        let fallback = if verbose { "debug" } else { "warn" };
        let filter =
            EnvFilter::try_from_env("TAGR_LOG").unwrap_or_else(|_| EnvFilter::new(fallback));

        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true),
            )
            .with(filter)
            .init();
    });
}
