//! # Tracing setup.
//!
//! [`init_tracing`] installs a compact `tracing-subscriber` formatter whose
//! level comes from `RUST_LOG`:
//!
//! - `RUST_LOG=apphost=info` lifecycle transitions and resource starts
//! - `RUST_LOG=apphost=debug` adds subscribe/publish traces and endpoint allocation
//!
//! Libraries embedding the core usually install their own subscriber and
//! never call this.

use tracing_subscriber::EnvFilter;

/// Installs the global fmt subscriber. Later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .try_init();
}
