//! API server configuration

use std::env;

use anyhow::{Context, Result};
use syncjam_shared_config::{parse_env, CommonConfig, Environment, SessionConfig};

/// Default listen port
pub const DEFAULT_PORT: u16 = 3000;

/// API server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Common configuration shared with other services
    pub common: CommonConfig,

    /// Server port (default: 3000)
    pub port: u16,

    /// CORS allowed origins (optional)
    pub cors_allowed_origins: Option<Vec<String>>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let common = CommonConfig::from_env().context("Failed to load config")?;
        let port = parse_env("PORT", DEFAULT_PORT).context("Invalid PORT value")?;

        Ok(Self {
            common,
            port,
            cors_allowed_origins: env::var("CORS_ORIGINS")
                .ok()
                .map(|s| parse_cors_origins(&s)),
        })
    }

    /// Session limits and timer cadences
    pub fn session(&self) -> &SessionConfig {
        &self.common.session
    }

    pub fn environment(&self) -> Environment {
        self.common.environment
    }

    pub fn is_production(&self) -> bool {
        self.common.environment.is_production()
    }
}

/// Split a comma-separated origin list, dropping blanks
pub fn parse_cors_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
