pub mod config;
pub mod controller;
pub mod db;
pub mod deletion;
pub mod export;
pub mod housekeeping;
pub mod mapping;
pub mod models;
pub mod stats;
pub mod timestamp;

use tracing_subscriber::EnvFilter;

/// Install the global subscriber. `RUST_LOG` wins; otherwise the default
/// filter, raised to debug with `verbose`.
pub fn init_tracing(verbose: bool) {
    let fallback = if verbose {
        config::verbose_log_filter()
    } else {
        config::default_log_filter()
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .with_writer(std::io::stderr)
        .init();
}
