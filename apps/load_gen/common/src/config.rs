use crate::error::LoadGenError;
use crate::logger::{LogFormat, LogLevel};
use clap::Parser;
use config::{Config, ConfigError, Environment};
use dotenv::dotenv;
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_INTERVAL: &str = "2s";

/// Logging flags accepted on the command line.
#[derive(Parser, Debug)]
#[command(name = "load_gen_service")]
#[command(about = "Sends a GET request to $URL every $INTERVAL", long_about = None)]
pub struct Cli {
    /// Log formatter (text|json)
    #[arg(long, default_value = "json")]
    pub log_formatter: String,

    /// Log level (trace|debug|info|warn|error|fatal|panic)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Cli {
    pub fn log_format(&self) -> LogFormat {
        LogFormat::parse(&self.log_formatter)
    }

    pub fn log_level(&self) -> LogLevel {
        LogLevel::parse(&self.log_level)
    }
}

/// Raw settings as they appear in the environment.
#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub url: String,
    pub interval: String,
}

/// Validated settings for the request loop.
#[derive(Debug, Clone)]
pub struct Settings {
    pub url: String,
    pub interval: Duration,
}

impl ServiceConfig {
    pub fn new() -> Result<Self, ConfigError> {
        // Load environment variables from .env file
        dotenv().ok();

        let mut s = Config::new();

        // No prefix: `URL` sets `url` and `INTERVAL` sets `interval`
        s.merge(Environment::new())?;

        Self::from_config(s)
    }

    pub fn from_config(mut s: Config) -> Result<Self, ConfigError> {
        s.set_default("url", "")?;
        s.set_default("interval", DEFAULT_INTERVAL)?;

        s.try_into()
    }

    /// The interval as configured. An empty value is treated as unset.
    pub fn interval_text(&self) -> &str {
        if self.interval.is_empty() {
            DEFAULT_INTERVAL
        } else {
            &self.interval
        }
    }

    pub fn interval(&self) -> Result<Duration, LoadGenError> {
        let raw = self.interval_text();

        humantime::parse_duration(raw).map_err(|source| LoadGenError::InvalidInterval {
            value: raw.to_string(),
            source,
        })
    }

    pub fn into_settings(self) -> Result<Settings, LoadGenError> {
        let interval = self.interval()?;

        Ok(Settings {
            url: self.url,
            interval,
        })
    }
}
