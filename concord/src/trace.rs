//! Logging hooks for the concurrent paths.
//!
//! Built with `--features tracing`, the crate-internal `trace!`, `debug!` and
//! `warn!` forward to `tracing`. Otherwise they swallow their arguments and
//! the lock-free loops compile as if the call sites were absent.

/// Filter used when `RUST_LOG` is unset.
#[cfg(feature = "tracing")]
const DEFAULT_DIRECTIVE: &str = "concord=trace";

/// Installs a fmt subscriber that tags every event with its thread.
///
/// Queue and ring events are only readable per thread, so thread ids and
/// names are always on. Repeated calls keep the first subscriber.
#[cfg(feature = "tracing")]
pub fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));
    let layer = fmt::layer()
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_timer(fmt::time::uptime())
        .compact();

    if tracing_subscriber::registry().with(layer).with(filter).try_init().is_err() {
        tracing::debug!("subscriber already installed");
    }
}

#[cfg(not(feature = "tracing"))]
pub const fn init_tracing() {}

#[cfg(feature = "tracing")]
pub(crate) use tracing::{debug, trace, warn};

#[cfg(not(feature = "tracing"))]
macro_rules! discard {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "tracing"))]
pub(crate) use discard as debug;
#[cfg(not(feature = "tracing"))]
pub(crate) use discard as trace;
#[cfg(not(feature = "tracing"))]
pub(crate) use discard as warn;
