//! Logging setup for the command-line tool.
//!
//! Diagnostics go through `tracing` and land on stderr so they never mix with
//! verb output on stdout. `log` crate records (zenoh's dependencies still use
//! it) are forwarded to tracing.
//!
//! ```ignore
//! use ros2cli_core::logger::init_logging;
//!
//! init_logging("ros2", "warn");
//! tracing::debug!("only shown with RUST_LOG=debug");
//! ```

use std::sync::OnceLock;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize tracing once for the process.
///
/// `RUST_LOG` wins when set; otherwise `default_directive` (e.g. `warn`) is
/// used. Subsequent calls are ignored.
pub fn init_logging(name: &str, default_directive: &str) {
    LOGGER_INITIALIZED.get_or_init(|| {
        tracing_log::LogTracer::init().ok();

        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_directive));

        let fmt_layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_writer(std::io::stderr);

        let initialized = tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .try_init()
            .is_ok();
        if initialized {
            tracing::debug!(logger = name, "logging initialized");
        }
    });
}

/// Re-export tracing macros for convenience.
pub use tracing::{debug, error, info, trace, warn};
