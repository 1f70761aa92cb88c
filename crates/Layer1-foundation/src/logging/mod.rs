//! Tracing bootstrap for hosts embedding the runner
//!
//! Libraries in this workspace only emit `tracing` events; the host decides
//! where they go. `init` installs the usual fmt subscriber.

use crate::{Error, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install a global subscriber writing to stderr.
///
/// `RUST_LOG` wins over `default_level` when set.
pub fn init(default_level: &str) -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .try_init()
        .map_err(|e| Error::Internal(format!("Failed to install tracing subscriber: {}", e)))
}
