//! Diagnostic logging setup.
//!
//! Logs go to stderr so stdout only ever carries the report.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const DEFAULT_LEVEL: &str = "info";

/// Filter directive in effect: `RUST_LOG` first, then the configured level,
/// then [`DEFAULT_LEVEL`]. Unparseable directives fall through.
pub fn resolve_filter(env: Option<&str>, configured: Option<&str>) -> EnvFilter {
    [env, configured]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .find_map(|directive| EnvFilter::try_new(directive).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LEVEL))
}

/// Install the global subscriber. A second call is a no-op.
pub fn init_logging(configured: Option<&str>) {
    let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = resolve_filter(env.as_deref(), configured);
    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
    if installed.is_ok() {
        tracing::debug!("logging initialised");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_wins_over_config() {
        let filter = resolve_filter(Some("debug"), Some("warn"));
        assert_eq!(filter.to_string(), "debug");
    }

    #[test]
    fn config_used_without_env() {
        let filter = resolve_filter(None, Some("warn"));
        assert_eq!(filter.to_string(), "warn");
    }

    #[test]
    fn falls_back_to_info() {
        assert_eq!(resolve_filter(None, None).to_string(), "info");
        assert_eq!(resolve_filter(Some("  "), None).to_string(), "info");
    }

    #[test]
    fn init_twice_does_not_panic() {
        init_logging(Some("error"));
        init_logging(Some("error"));
    }
}
