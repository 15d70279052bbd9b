//! Server configuration read from the environment.
//!
//! `main` loads `.env` through dotenvy before calling [`ServerConfig::from_env`].

use clm_postgres::DatabaseConfig;

pub const PRODUCTION: &str = "production";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_host: String,
    pub port: u16,
    /// `CLM_ENV`; anything other than `production` exposes error details.
    pub environment: String,
    pub cors_origin: String,
    pub run_migrations: bool,
    pub database: DatabaseConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::from_vars(|_| None)
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            bind_host: var("BIND_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: var("PORT").and_then(|p| p.parse().ok()).unwrap_or(3001),
            environment: var("CLM_ENV").unwrap_or_else(|| "development".to_string()),
            cors_origin: var("CORS_ORIGIN").unwrap_or_else(|| "http://localhost:3000".to_string()),
            run_migrations: var("RUN_MIGRATIONS")
                .map(|v| !matches!(v.trim().to_ascii_lowercase().as_str(), "false" | "0" | "no"))
                .unwrap_or(true),
            database: DatabaseConfig::from_vars(&var),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case(PRODUCTION)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_host, self.port)
    }
}
