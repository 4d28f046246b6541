//! Tracing subscriber setup for the binaries.
//!
//! `RUST_LOG` controls the filter; the default shows library info logs and
//! only warnings from dependencies. Output goes to stderr so it does not interleave
//! with the quiz rendering on stdout.

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "warn,vignette_quiz=info";

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    // try_init: tests and embedders may already have installed a subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init();
}
