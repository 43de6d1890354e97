//! Structured logging setup.
//!
//! Two output modes, both on stderr:
//! - Human-readable console format for interactive use
//! - Machine-parseable JSON lines for service deployments
//!
//! Configured via `TALLY_LOG` (level or full env-filter directive) and
//! `TALLY_LOG_FORMAT` (`human` or `jsonl`). Initialization is idempotent so
//! tests and embedders can call it freely.

use std::io::IsTerminal;
use std::sync::OnceLock;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

static INIT: OnceLock<()> = OnceLock::new();

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable console format (default).
    #[default]
    Human,
    /// Machine-parseable JSON lines.
    Jsonl,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" | "console" | "pretty" => Ok(LogFormat::Human),
            "jsonl" | "json" | "structured" => Ok(LogFormat::Jsonl),
            _ => Err(format!("unknown log format: {}", s)),
        }
    }
}

/// Log level filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(format!("unknown log level: {}", s)),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    pub format: LogFormat,
    pub level: LogLevel,
}

impl LogConfig {
    /// Build from `TALLY_LOG` / `TALLY_LOG_FORMAT`, falling back to defaults
    /// for anything unset or unparseable.
    pub fn from_env() -> Self {
        let level = std::env::var("TALLY_LOG")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_default();
        let format = std::env::var("TALLY_LOG_FORMAT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_default();
        LogConfig { format, level }
    }
}

/// Initialize the global tracing subscriber. Subsequent calls are no-ops.
pub fn init_logging(config: &LogConfig) {
    INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_env("TALLY_LOG")
            .unwrap_or_else(|_| EnvFilter::new(format!("tally_core={}", config.level)));

        match config.format {
            LogFormat::Human => {
                let use_ansi = std::io::stderr().is_terminal();
                let fmt_layer = fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .with_ansi(use_ansi);
                tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt_layer)
                    .init();
            }
            LogFormat::Jsonl => {
                let json_layer = fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_current_span(true);
                tracing_subscriber::registry()
                    .with(filter)
                    .with(json_layer)
                    .init();
            }
        }
    });
}

/// Initialize logging from the environment (for tests and simple embedders).
pub fn init_default_logging() {
    init_logging(&LogConfig::from_env());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_parse_from_aliases() {
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Jsonl);
        assert_eq!("pretty".parse::<LogFormat>().unwrap(), LogFormat::Human);
        assert!("yaml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn levels_parse_and_display() {
        assert_eq!("warning".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!(LogLevel::Debug.to_string(), "debug");
    }

    #[test]
    fn init_is_idempotent() {
        init_default_logging();
        init_default_logging();
    }
}
