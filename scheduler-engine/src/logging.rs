// scheduler-engine/src/logging.rs
// ============================================================================
// Module: Fleet Scheduler Logging
// Description: Default `tracing` subscriber wiring for demos and tests.
// Purpose: Ambient logging stack: loading configuration is an external
//          concern, but a sane default subscriber is not.
// Dependencies: tracing-subscriber
// ============================================================================

//! ## Overview
//! [`install_default_subscriber`] wires a `tracing_subscriber::fmt`
//! subscriber honouring `RUST_LOG`, falling back to `info`. It does not read
//! any other configuration source; per the design's ambient-stack note,
//! config loading belongs to an external collaborator, not this crate.

use tracing_subscriber::EnvFilter;

/// Installs a default `fmt` subscriber filtered by `RUST_LOG` (falling back
/// to `info`). Safe to call more than once; later calls are no-ops.
pub fn install_default_subscriber() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
