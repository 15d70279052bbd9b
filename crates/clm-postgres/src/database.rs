//! Connection pool configuration and lifecycle.

use std::time::Duration;

use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::{info, warn};

use crate::PgStores;

const DEFAULT_HOST: &str = "localhost";
const DEFAULT_PORT: u16 = 5432;
const DEFAULT_NAME: &str = "clm_automation";
const DEFAULT_USER: &str = "clm_admin";
const DEFAULT_PASSWORD: &str = "clm123";

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub connection_timeout: Duration,
    pub idle_timeout: Option<Duration>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::from_vars(|_| None)
    }
}

impl DatabaseConfig {
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// `DATABASE_URL` wins; otherwise the URL is assembled from `DB_HOST`,
    /// `DB_PORT`, `DB_NAME`, `DB_USER` and `DB_PASSWORD`.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let database_url = var("DATABASE_URL")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| {
                build_database_url(
                    &var("DB_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
                    var("DB_PORT")
                        .and_then(|s| s.parse().ok())
                        .unwrap_or(DEFAULT_PORT),
                    &var("DB_NAME").unwrap_or_else(|| DEFAULT_NAME.to_string()),
                    &var("DB_USER").unwrap_or_else(|| DEFAULT_USER.to_string()),
                    &var("DB_PASSWORD").unwrap_or_else(|| DEFAULT_PASSWORD.to_string()),
                )
            });

        let secs = |key: &str, default: u64| {
            Duration::from_secs(var(key).and_then(|s| s.parse().ok()).unwrap_or(default))
        };

        Self {
            database_url,
            max_connections: var("DATABASE_POOL_SIZE")
                .and_then(|s| s.parse().ok())
                .unwrap_or(20),
            connection_timeout: secs("DATABASE_CONNECT_TIMEOUT_SECS", 5),
            idle_timeout: Some(secs("DATABASE_IDLE_TIMEOUT_SECS", 30)),
        }
    }
}

/// Credentials are percent-encoded by `url`.
fn build_database_url(host: &str, port: u16, name: &str, user: &str, password: &str) -> String {
    let fallback = format!("postgres://{host}:{port}/{name}");
    let Ok(mut url) = url::Url::parse(&fallback) else {
        return fallback;
    };
    let _ = url.set_username(user);
    let _ = url.set_password(Some(password));
    url.to_string()
}

/// Owns the pool for the process lifetime. Handed to adapters by clone.
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        info!(
            "Connecting to database: {}",
            mask_database_url(&config.database_url)
        );

        let mut pool_options = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.connection_timeout);

        if let Some(idle_timeout) = config.idle_timeout {
            pool_options = pool_options.idle_timeout(idle_timeout);
        }

        let pool = pool_options
            .connect(&config.database_url)
            .await
            .map_err(|e| {
                warn!("Failed to connect to database: {}", e);
                e
            })?;

        info!(
            max_connections = config.max_connections,
            "Database connection pool created"
        );
        Ok(Self { pool })
    }

    pub fn stores(&self) -> PgStores {
        PgStores::new(self.pool.clone())
    }

    pub async fn test_connection(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| ())
    }

    /// Apply the embedded schema migrations.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database schema up to date");
        Ok(())
    }

    pub fn connection_stats(&self) -> ConnectionStats {
        ConnectionStats {
            size: self.pool.size(),
            num_idle: self.pool.num_idle() as u32,
        }
    }

    pub async fn close(&self) {
        info!("Closing database connection pool ({})", self.connection_stats());
        self.pool.close().await;
    }
}

#[derive(Debug, Clone)]
pub struct ConnectionStats {
    pub size: u32,
    pub num_idle: u32,
}

impl std::fmt::Display for ConnectionStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "pool size: {}, idle: {}", self.size, self.num_idle)
    }
}

/// Mask the password in a database URL for logging.
pub fn mask_database_url(url: &str) -> String {
    if let Ok(parsed) = url::Url::parse(url) {
        let mut masked = parsed.clone();
        if parsed.password().is_some() {
            let _ = masked.set_password(Some("***"));
        }
        masked.to_string()
    } else if url.chars().count() > 20 {
        let chars: Vec<char> = url.chars().collect();
        let head: String = chars[..10].iter().collect();
        let tail: String = chars[chars.len() - 10..].iter().collect();
        format!("{head}***{tail}")
    } else {
        "***".to_string()
    }
}
