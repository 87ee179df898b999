//! Quiet-mode aware logging. When IRONPYC_QUIET=1, per-candidate [INFO] chatter is suppressed.
//! Uses `tracing::info!` so output is captured by the tracing subscriber.

#[macro_export]
macro_rules! info_log {
    ($($arg:tt)*) => {{
        if !$crate::log::is_quiet() {
            tracing::info!($($arg)*);
        }
    }};
}

pub fn is_quiet() -> bool {
    ironpyc_core::config::ObservabilityConfig::from_env().quiet
}
