//! Process-wide logging setup for applications embedding the OneFlow client.
//!
//! Libraries in this workspace only emit `tracing` events; installing a
//! subscriber is left to the binary (or test) that owns the process.

/// Tracing subscriber installation.
pub mod tracing;

/// Initialize process-wide logging.
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init() {
    tracing::init();
}
