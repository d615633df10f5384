//! Structured logging bootstrap. The (out-of-scope) HTTP/CLI front end is
//! expected to call this once at process startup, the same way the
//! reference service installs a JSON `tracing_subscriber` before building
//! its router.

use tracing_subscriber::EnvFilter;

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_target(true)
        .init();
}
