//! Logging setup for binaries and tests.
//! The library itself only emits `tracing` events; installing a subscriber is the caller's choice.

use std::str::FromStr;

use tracing_subscriber::{fmt, EnvFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoggerEnv {
    /// Human-readable compact output without targets.
    Development,
    /// Structured JSON lines.
    #[default]
    Production,
}

impl FromStr for LoggerEnv {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(LoggerEnv::Development),
            "production" | "prod" => Ok(LoggerEnv::Production),
            other => Err(format!("unknown logger env '{}', expected development or production", other)),
        }
    }
}

fn filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install a global subscriber honoring `RUST_LOG`. Returns false if one was already set.
pub fn init(env: LoggerEnv) -> bool {
    match env {
        LoggerEnv::Development => fmt()
            .with_env_filter(filter("debug"))
            .with_target(false)
            .compact()
            .try_init()
            .is_ok(),
        LoggerEnv::Production => fmt()
            .with_env_filter(filter("info"))
            .json()
            .try_init()
            .is_ok(),
    }
}
