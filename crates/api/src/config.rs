//! Application configuration

use anyhow::Context;

/// Runtime configuration loaded from the environment
#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string
    pub database_url: String,
    /// Address the HTTP server binds to
    pub bind_address: String,
    /// Comma-separated CORS origin allowlist
    pub allowed_origins: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL not set")?;

        let bind_address =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        let allowed_origins = std::env::var("ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000,http://127.0.0.1:3000".to_string());

        Ok(Self {
            database_url,
            bind_address,
            allowed_origins,
        })
    }
}
