//! Ambient bootstrap glue: environment configuration, structured logging
//! setup, and the shared application state an HTTP/CLI front end (both
//! out of scope here) would hold. No routing, no argument parsing — only
//! the wiring those outer layers would call into.

pub mod logging;
pub mod state;

pub use logging::init_tracing;
pub use state::AppState;
