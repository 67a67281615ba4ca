/// Macro for prefixed status logging.
///
/// Emits an `INFO` tracing event whose target is the prefix, so the
/// subscriber installed by the binary renders `INFO <prefix>: <message>`
/// on stderr. Stdout stays reserved for the JSON response.
///
/// Usage:
/// ```ignore
/// log_status!("registration", "Uploaded version {} of {}", sha, name);
/// log_status!("trigger", "Submitted run {}", job_name);
/// ```
#[macro_export]
macro_rules! log_status {
    ($prefix:expr, $($arg:tt)*) => {
        ::tracing::info!(target: $prefix, $($arg)*)
    };
}

pub mod core;
pub mod utils;

// Re-export everything from core for ergonomic library use
// Users can write `kfp_deploy::config` instead of `kfp_deploy::core::config`
pub use core::*;
pub use utils::*;
