//! Process-wide logging setup shared by the floe binaries.

/// Tracing subscriber configuration.
pub mod tracing;

pub use crate::tracing::LogFormat;

/// Initialize tracing for the process, picking the format from
/// `FLOE_LOG_FORMAT`.
///
/// Safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init(LogFormat::from_env());
}
