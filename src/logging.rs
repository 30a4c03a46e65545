// Logging, powered by tracing-subscriber
//
// Diagnostics go to stderr so they never mix with rendered results on
// stdout. `tracing_log::LogTracer` routes `log::*` records emitted by
// dependencies through the same subscriber.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::error::{CLIError, Result};

/// Base level without `-v`
pub const DEFAULT_LEVEL: &str = "warn";

/// Base level with `-v`
pub const VERBOSE_LEVEL: &str = "debug";

/// Build the filter from the base level plus noisy-crate overrides.
///
/// `RUST_LOG`, when set, replaces both.
fn build_env_filter(level: &str, rust_log: Option<&str>) -> Result<EnvFilter> {
    if let Some(spec) = rust_log.filter(|s| !s.trim().is_empty()) {
        return EnvFilter::try_new(spec)
            .map_err(|e| CLIError::ConfigurationError(format!("Invalid RUST_LOG '{}': {}", spec, e)));
    }

    let mut directives = vec![level.to_string()];
    let noisy: &[(&str, &str)] = &[
        ("mysql_async", "warn"),
        ("rustyline", "warn"),
        ("reqwest", "warn"),
        ("hyper", "warn"),
        ("hyper_util", "warn"),
        ("rustls", "warn"),
        ("mlua", "warn"),
    ];
    for (target, lvl) in noisy {
        directives.push(format!("{}={}", target, lvl));
    }

    let filter_str = directives.join(",");
    EnvFilter::try_new(&filter_str).map_err(|e| {
        CLIError::ConfigurationError(format!("Invalid tracing filter '{}': {}", filter_str, e))
    })
}

/// Install the global subscriber writing to stderr
pub fn init_logging(verbose: bool, color: bool) -> Result<()> {
    let level = if verbose { VERBOSE_LEVEL } else { DEFAULT_LEVEL };
    let rust_log = std::env::var("RUST_LOG").ok();
    let filter = build_env_filter(level, rust_log.as_deref())?;

    tracing_log::LogTracer::init().ok();

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(color)
        .with_target(verbose)
        .without_time()
        .with_filter(filter);

    tracing_subscriber::registry()
        .with(stderr_layer)
        .try_init()
        .map_err(|e| CLIError::ConfigurationError(format!("Failed to initialize logging: {}", e)))?;

    tracing::trace!("Logging initialized: level={}", level);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_includes_overrides() {
        let filter = build_env_filter(DEFAULT_LEVEL, None).unwrap();
        let rendered = filter.to_string();
        assert!(rendered.contains("mysql_async=warn"));
        assert!(rendered.contains("warn"));
    }

    #[test]
    fn test_rust_log_replaces_defaults() {
        let filter = build_env_filter(DEFAULT_LEVEL, Some("tip=trace")).unwrap();
        assert_eq!(filter.to_string(), "tip=trace");

        let filter = build_env_filter(VERBOSE_LEVEL, Some("  ")).unwrap();
        assert!(filter.to_string().contains("debug"));
    }

    #[test]
    fn test_invalid_rust_log_is_reported() {
        assert!(build_env_filter(DEFAULT_LEVEL, Some("tip=[")).is_err());
    }
}
