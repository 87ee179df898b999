//! Observability: tracing init.
//!
//! Uses config::ObservabilityConfig for IRONPYC_QUIET, IRONPYC_LOG_LEVEL, IRONPYC_LOG_JSON.
//! Logs go to stderr; stdout is reserved for command output.

use tracing_subscriber::{prelude::*, EnvFilter};

/// Initialize tracing. Call at process startup.
/// When IRONPYC_QUIET=1, only WARN and above are logged. `RUST_LOG` wins over both.
pub fn init_tracing() {
    let cfg = crate::config::ObservabilityConfig::from_env();
    let level = filter_directive(cfg.quiet, &cfg.log_level);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));

    let _ = if cfg.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(false),
            )
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(false),
            )
            .try_init()
    };
}

fn filter_directive(quiet: bool, log_level: &str) -> String {
    if quiet {
        "ironpyc=warn".to_string()
    } else {
        log_level.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_overrides_level() {
        assert_eq!(filter_directive(true, "ironpyc=debug"), "ironpyc=warn");
        assert_eq!(filter_directive(false, "ironpyc=debug"), "ironpyc=debug");
    }
}
