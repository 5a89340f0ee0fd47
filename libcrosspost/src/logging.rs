//! Logging setup for Crosspost binaries
//!
//! Everything goes to stderr so stdout stays reserved for results. Format and
//! level come from the caller, `CROSSPOST_LOG_FORMAT` / `CROSSPOST_LOG_LEVEL`,
//! or `RUST_LOG` (which always wins for the filter).
//!
//! ```no_run
//! use libcrosspost::logging::{LogFormat, LoggingConfig};
//!
//! LoggingConfig::new(LogFormat::Json, "debug").init();
//! ```

use std::fmt;
use std::str::FromStr;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Plain single-line output without target names
    #[default]
    Text,
    /// One JSON object per event
    Json,
    /// Multi-line colored output with source locations
    Pretty,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            _ => Err(format!(
                "Invalid log format: '{}'. Valid options: text, json, pretty",
                s
            )),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Text => write!(f, "text"),
            LogFormat::Json => write!(f, "json"),
            LogFormat::Pretty => write!(f, "pretty"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// Filter directive used when `RUST_LOG` is unset, e.g. `warn` or `libcrosspost=debug`
    pub level: String,
}

impl LoggingConfig {
    pub fn new(format: LogFormat, level: impl Into<String>) -> Self {
        Self {
            format,
            level: level.into(),
        }
    }

    /// Read `CROSSPOST_LOG_FORMAT` and `CROSSPOST_LOG_LEVEL`, falling back to text at `fallback_level`
    ///
    /// An unparseable format is ignored rather than treated as an error.
    pub fn from_env(fallback_level: &str) -> Self {
        let format = std::env::var("CROSSPOST_LOG_FORMAT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default();
        let level =
            std::env::var("CROSSPOST_LOG_LEVEL").unwrap_or_else(|_| fallback_level.to_string());
        Self::new(format, level)
    }

    /// Raise the level to `debug` (the CLI's `--verbose`)
    pub fn verbose(mut self, verbose: bool) -> Self {
        if verbose {
            self.level = "debug".to_string();
        }
        self
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level))
    }

    /// Install the global subscriber
    ///
    /// Returns `false` if a subscriber was already installed (e.g. in tests).
    pub fn init(&self) -> bool {
        let filter = self.filter();
        let result = match self.format {
            LogFormat::Json => tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_current_span(true)
                .flatten_event(true)
                .with_target(true)
                .try_init(),
            LogFormat::Pretty => tracing_subscriber::fmt()
                .pretty()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_file(true)
                .with_line_number(true)
                .try_init(),
            LogFormat::Text => tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .try_init(),
        };
        result.is_ok()
    }
}

/// Initialize logging from the environment at `warn` level
pub fn init_default() -> bool {
    LoggingConfig::from_env("warn").init()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_log_format_from_str() {
        assert_eq!("text".parse::<LogFormat>().unwrap(), LogFormat::Text);
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("Pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);

        let err = "xml".parse::<LogFormat>().unwrap_err();
        assert!(err.contains("Invalid log format: 'xml'"));
    }

    #[test]
    fn test_log_format_display_round_trips() {
        for format in [LogFormat::Text, LogFormat::Json, LogFormat::Pretty] {
            assert_eq!(format.to_string().parse::<LogFormat>().unwrap(), format);
        }
    }

    #[test]
    fn test_verbose_overrides_level() {
        let config = LoggingConfig::new(LogFormat::Text, "warn").verbose(true);
        assert_eq!(config.level, "debug");

        let config = LoggingConfig::new(LogFormat::Text, "warn").verbose(false);
        assert_eq!(config.level, "warn");
    }

    #[test]
    #[serial]
    fn test_from_env() {
        std::env::set_var("CROSSPOST_LOG_FORMAT", "json");
        std::env::set_var("CROSSPOST_LOG_LEVEL", "trace");
        let config = LoggingConfig::from_env("warn");
        std::env::remove_var("CROSSPOST_LOG_FORMAT");
        std::env::remove_var("CROSSPOST_LOG_LEVEL");

        assert_eq!(config, LoggingConfig::new(LogFormat::Json, "trace"));
    }

    #[test]
    #[serial]
    fn test_from_env_ignores_bad_format() {
        std::env::set_var("CROSSPOST_LOG_FORMAT", "yaml");
        let config = LoggingConfig::from_env("info");
        std::env::remove_var("CROSSPOST_LOG_FORMAT");

        assert_eq!(config.format, LogFormat::Text);
        assert_eq!(config.level, "info");
    }
}
