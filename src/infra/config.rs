//! Environment-driven configuration.
//!
//! Values are read from the process environment (after `.env` has been loaded
//! by [`crate::infra::bootstrap::init_env`]). Missing required values are fatal.

use std::{net::IpAddr, str::FromStr};

use anyhow::{Context, Result, anyhow};
use tracing::Level;

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub log_level: Level,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_minutes: i64,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("token_ttl_minutes", &self.token_ttl_minutes)
            .finish()
    }
}

/// Loads the configuration from the process environment.
pub fn load() -> Result<Config> {
    Config::from_lookup(|key| std::env::var(key).ok())
}

impl Config {
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| -> Result<String> {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| anyhow!("{key} is not defined in environment variables"))
        };

        let server = ServerConfig {
            host: parse_or(&lookup, "HOST", IpAddr::from([0, 0, 0, 0]))?,
            port: parse_or(&lookup, "PORT", 3000)?,
        };

        let database = DatabaseConfig {
            url: required("DATABASE_URL")?,
            max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?,
        };

        let auth = AuthConfig {
            jwt_secret: required("JWT_SECRET")?,
            token_ttl_minutes: parse_or(&lookup, "JWT_TTL_MINUTES", 60)?,
        };
        if auth.token_ttl_minutes <= 0 {
            return Err(anyhow!("JWT_TTL_MINUTES must be positive"));
        }

        Ok(Self {
            server,
            database,
            auth,
            log_level: parse_or(&lookup, "LOG_LEVEL", Level::INFO)?,
        })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {key}: {raw:?}")),
        _ => Ok(default),
    }
}
