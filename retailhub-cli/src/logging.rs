//! Logging setup for the CLI.
//!
//! `RUST_LOG` wins when set; otherwise the level comes from `-v` repeats.
//! Logs go to stderr so stdout stays clean for reports and tables.

use anyhow::{anyhow, Result};
use tracing::Level;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Copy)]
pub struct LogConfig {
    pub level: Level,
    pub format: LogFormat,
}

impl LogConfig {
    /// 0 → warn, 1 → info, 2 → debug, 3+ → trace.
    pub fn from_verbosity(verbosity: u8, json: bool) -> Self {
        let level = match verbosity {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        };
        Self {
            level,
            format: if json { LogFormat::Json } else { LogFormat::Pretty },
        }
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.level.as_str().to_ascii_lowercase()))
    }
}

pub fn init_logging(config: &LogConfig) -> Result<()> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(config.filter())
        .with_writer(std::io::stderr)
        .with_target(false);
    match config.format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    }
    .map_err(|e| anyhow!("failed to initialise logging: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_maps_to_levels() {
        assert_eq!(LogConfig::from_verbosity(0, false).level, Level::WARN);
        assert_eq!(LogConfig::from_verbosity(1, false).level, Level::INFO);
        assert_eq!(LogConfig::from_verbosity(2, false).level, Level::DEBUG);
        assert_eq!(LogConfig::from_verbosity(9, true).level, Level::TRACE);
        assert_eq!(LogConfig::from_verbosity(0, true).format, LogFormat::Json);
    }
}
