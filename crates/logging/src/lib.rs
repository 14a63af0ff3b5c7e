//! Logging initialization for EnviroLLM
//!
//! Installs a `tracing` subscriber with `RUST_LOG`-style filtering. Safe to
//! call more than once; only the first call installs the subscriber.

use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;

static INITIALIZED: OnceCell<()> = OnceCell::new();

/// Default filter directive when `RUST_LOG` is unset
const DEFAULT_DIRECTIVE: &str = "info";

/// Initializes the global tracing subscriber
pub fn init() {
    INITIALIZED.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    });
}
