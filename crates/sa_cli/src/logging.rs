//! Log setup for the `sa` binary.
//!
//! Events go to stderr so stdout stays clean for scripts. Filter precedence:
//! `RUST_LOG`, then `--quiet` (warn), then `--log-level`, then `info`.

use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

pub fn filter_directive(quiet: bool, log_level: Option<&str>) -> String {
    if quiet {
        return "warn".to_string();
    }
    log_level.unwrap_or("info").to_string()
}

/// Install the global subscriber. A second call is a no-op.
pub fn init_tracing(quiet: bool, log_level: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(quiet, log_level)));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_wins_over_level() {
        assert_eq!(filter_directive(true, Some("debug")), "warn");
        assert_eq!(filter_directive(false, Some("debug")), "debug");
        assert_eq!(filter_directive(false, None), "info");
    }
}
