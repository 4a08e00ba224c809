//! Tracing subscriber setup for the command-line front end.
//!
//! The library only emits `tracing` events; installing a subscriber is left to
//! the binary. Output goes to stderr so stdout stays reserved for records.
//!
//! Environment:
//! - `SEQSOURCE_LOG`: level (`trace`, `debug`, `info`, `warn`, `error`)
//! - `SEQSOURCE_LOG_FORMAT`: `text` or `json`
//! - `RUST_LOG`: extra filter directives, e.g. `seqsource::mongo=trace`
use anyhow::Result;
use clap::ValueEnum;
use tracing::Level;
use tracing_subscriber::{fmt as tracing_fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    #[default]
    #[value(alias = "warning")]
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
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    #[value(alias = "pretty")]
    Text,
    /// One JSON object per event.
    Json,
}

/// Case-insensitive parse of a `SEQSOURCE_LOG*` value.
fn parse_env<T: ValueEnum>(var: &str, value: &str) -> Result<T> {
    T::from_str(value, true).map_err(|_| anyhow::anyhow!("Invalid {var} value: {value}"))
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogConfig {
    pub level: LogLevel,
    pub format: LogFormat,
}

impl LogConfig {
    /// Start from `self` and let `SEQSOURCE_LOG` / `SEQSOURCE_LOG_FORMAT` override it.
    pub fn merge_env(mut self) -> Result<Self> {
        if let Ok(level) = std::env::var("SEQSOURCE_LOG") {
            self.level = parse_env("SEQSOURCE_LOG", &level)?;
        }
        if let Ok(format) = std::env::var("SEQSOURCE_LOG_FORMAT") {
            self.format = parse_env("SEQSOURCE_LOG_FORMAT", &format)?;
        }
        Ok(self)
    }

    pub fn from_env() -> Result<Self> {
        Self::default().merge_env()
    }
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(config: &LogConfig) -> Result<()> {
    let filter = EnvFilter::from_default_env().add_directive(config.level.to_tracing_level().into());
    let registry = tracing_subscriber::registry().with(filter);

    match config.format {
        LogFormat::Text => registry
            .with(tracing_fmt::layer().with_writer(std::io::stderr).with_target(true))
            .try_init()?,
        LogFormat::Json => registry
            .with(tracing_fmt::layer().json().with_writer(std::io::stderr))
            .try_init()?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_and_formats_parse() {
        assert_eq!(parse_env::<LogLevel>("SEQSOURCE_LOG", "DEBUG").unwrap(), LogLevel::Debug);
        assert_eq!(parse_env::<LogLevel>("SEQSOURCE_LOG", "warning").unwrap(), LogLevel::Warn);
        assert_eq!(parse_env::<LogFormat>("SEQSOURCE_LOG_FORMAT", "json").unwrap(), LogFormat::Json);
        assert!(parse_env::<LogLevel>("SEQSOURCE_LOG", "loud").is_err());
    }

    #[test]
    fn defaults_are_quiet_text() {
        let c = LogConfig::default();
        assert_eq!(c.level, LogLevel::Warn);
        assert_eq!(c.format, LogFormat::Text);
    }

    #[test]
    fn second_subscriber_is_reported_not_ignored() {
        let config = LogConfig::default();
        let _ = init_logging(&config);
        assert!(init_logging(&config).is_err());
    }
}
