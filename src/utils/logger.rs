//! Logging utilities
//!
//! Sets up the `tracing` subscriber for the harness.

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Log level configuration
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn to_tracing_level(self) -> Level {
        match self {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }

    /// Effective level from the CLI flags; `--verbose` raises info to debug
    pub fn resolve(level: Option<LogLevel>, verbose: bool) -> Self {
        match (level, verbose) {
            (Some(level), _) => level,
            (None, true) => LogLevel::Debug,
            (None, false) => LogLevel::Info,
        }
    }

    fn filter_directive(self) -> String {
        format!(
            "{}={}",
            env!("CARGO_PKG_NAME").replace('-', "_"),
            self.to_tracing_level()
        )
    }
}

/// Initialize the logger; `RUST_LOG` takes precedence over `level`
pub fn init_logger(level: LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.filter_directive()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_level() {
        assert_eq!(LogLevel::resolve(None, false), LogLevel::Info);
        assert_eq!(LogLevel::resolve(None, true), LogLevel::Debug);
        assert_eq!(LogLevel::resolve(Some(LogLevel::Warn), true), LogLevel::Warn);
    }

    #[test]
    fn test_filter_directive() {
        assert_eq!(
            LogLevel::Debug.filter_directive(),
            "wt_interop_browser=DEBUG"
        );
    }
}
