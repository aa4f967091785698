//! Logging initialization
//!
//! Structured logging via tracing with an environment-controlled filter.

use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber
///
/// `RUST_LOG` wins when set; otherwise the given default directives apply.
/// Safe to call more than once (later calls are ignored), which keeps
/// parallel tests from fighting over the global subscriber.
pub fn init_logging(default_directives: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init();
}
