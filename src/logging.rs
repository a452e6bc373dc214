//! Console logging for the command line front end
//!
//! Library code only emits `tracing` events; the binary installs this
//! subscriber once at startup. Output goes to stderr so it never mixes with
//! command output on stdout.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is not set
    pub default_filter: String,

    /// Whether to include file/line information in logs
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self::from_verbosity(0)
    }
}

impl LoggingConfig {
    /// Map the `-v` count to a filter: warn, info, debug, trace
    pub fn from_verbosity(verbose: u8) -> Self {
        let level = match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };

        Self {
            default_filter: format!("{level},nocode_designer={level}"),
            include_location: verbose >= 3,
        }
    }
}

/// Install the global subscriber.
/// `RUST_LOG` takes precedence over the configured default filter.
pub fn init(config: LoggingConfig) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    let console_layer = fmt::layer()
        .with_target(true)
        .with_file(config.include_location)
        .with_line_number(config.include_location)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .try_init()?;

    tracing::debug!(filter = %config.default_filter, "Logging initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(
            LoggingConfig::from_verbosity(0).default_filter,
            "warn,nocode_designer=warn"
        );
        assert_eq!(
            LoggingConfig::from_verbosity(2).default_filter,
            "debug,nocode_designer=debug"
        );
        assert!(LoggingConfig::from_verbosity(5).include_location);
        assert!(!LoggingConfig::default().include_location);
    }
}
