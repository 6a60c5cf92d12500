//! # herd-client
//!
//! The session layer of The Herd: configuration, logging setup, and the
//! commands the app issues against the sync layer.

pub mod commands;
pub mod config;
pub mod state;

use tracing_subscriber::{fmt, EnvFilter};

pub use config::ClientConfig;
pub use state::Session;

/// Install the global `tracing` subscriber. `RUST_LOG` overrides the
/// default filter. Calling this twice is harmless.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("herd_client=debug,herd_store=info,warn"));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init();
}
