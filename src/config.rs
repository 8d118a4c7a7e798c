use std::path::PathBuf;

use tracing_subscriber::filter::LevelFilter;

use crate::error::ConfigError;

const DEFAULT_PORT: u16 = 8080;

/// Process-wide settings, read once at startup.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub model_path: PathBuf,
    pub port: u16,
    pub emoji: bool,
    pub log: LogConfig,
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: LevelFilter,
    /// Overrides the directory handed to the logger factory.
    pub path: Option<PathBuf>,
    pub pretty: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LevelFilter::INFO,
            path: None,
            pretty: false,
        }
    }
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let model_path = lookup("MODEL_PATH")
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
            .ok_or(ConfigError::Missing("MODEL_PATH"))?;

        let port = match lookup("APP_PORT") {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
                key: "APP_PORT",
                value: raw,
            })?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            model_path,
            port,
            emoji: parse_flag(lookup("EMOJI")),
            log: LogConfig::from_lookup(&lookup)?,
        })
    }
}

impl LogConfig {
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let level = match lookup("LOG_LEVEL") {
            Some(raw) => parse_level(&raw).ok_or(ConfigError::Invalid {
                key: "LOG_LEVEL",
                value: raw,
            })?,
            None => LevelFilter::INFO,
        };

        Ok(Self {
            level,
            path: lookup("LOG_PATH")
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
            pretty: parse_flag(lookup("LOG_PRETTY")),
        })
    }
}

/// Every boolean switch uses this rule: case-insensitive "true", anything else is off.
fn parse_flag(raw: Option<String>) -> bool {
    raw.map(|v| v.trim().eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

fn parse_level(raw: &str) -> Option<LevelFilter> {
    match raw.trim().to_ascii_uppercase().as_str() {
        "TRACE" => Some(LevelFilter::TRACE),
        "DEBUG" => Some(LevelFilter::DEBUG),
        "INFO" => Some(LevelFilter::INFO),
        "WARN" | "WARNING" => Some(LevelFilter::WARN),
        "ERROR" | "CRITICAL" => Some(LevelFilter::ERROR),
        _ => None,
    }
}
