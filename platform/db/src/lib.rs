//! Database primitives: connection settings, connecting, and the sea-orm
//! implementation of the employee repository.

mod store;

use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr};
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

pub use store::EmployeeStore;

/// Shared connection pool alias.
pub type DbPool = DatabaseConnection;

/// Used when `DATABASE_URL` is not set: a SQLite file next to the binary.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://orgchart.db?mode=rwc";

#[derive(Debug, Error)]
pub enum DbError {
    #[error("database url missing")]
    MissingUrl,
    #[error("database connection failed: {0}")]
    Connect(#[from] DbErr),
}

pub type DbResult<T> = Result<T, DbError>;

/// Environment-driven connection settings.
#[derive(Clone, Debug, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default = "default_url_key")]
    env_key: String,
    #[serde(default)]
    default_url: Option<String>,
}

fn default_url_key() -> String {
    "DATABASE_URL".to_string()
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self::new(default_url_key())
    }
}

impl DatabaseSettings {
    pub fn new(env_key: impl Into<String>) -> Self {
        Self {
            env_key: env_key.into(),
            default_url: None,
        }
    }

    /// `DATABASE_URL`, falling back to [`DEFAULT_DATABASE_URL`].
    pub fn from_env() -> Self {
        Self::default().with_default_url(DEFAULT_DATABASE_URL)
    }

    pub fn with_default_url(mut self, url: impl Into<String>) -> Self {
        self.default_url = Some(url.into());
        self
    }

    pub fn database_url(&self) -> DbResult<String> {
        std::env::var(&self.env_key)
            .ok()
            .filter(|url| !url.trim().is_empty())
            .or_else(|| self.default_url.clone())
            .ok_or(DbError::MissingUrl)
    }
}

pub async fn connect(settings: &DatabaseSettings) -> DbResult<DbPool> {
    let url = settings.database_url()?;
    let mut options = ConnectOptions::new(url);
    options.sqlx_logging(false);
    let pool = Database::connect(options).await?;
    info!(backend = ?pool.get_database_backend(), "database connected");
    Ok(pool)
}

/// True when the database answers a round trip.
pub async fn ping(pool: &DbPool) -> bool {
    pool.ping().await.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_default_url_when_env_is_unset() {
        let settings = DatabaseSettings::new("ORGCHART_TEST_UNSET_DB_URL")
            .with_default_url("sqlite::memory:");
        assert_eq!(settings.database_url().unwrap(), "sqlite::memory:");
    }

    #[test]
    fn missing_url_without_default_is_an_error() {
        let settings = DatabaseSettings::new("ORGCHART_TEST_UNSET_DB_URL");
        assert!(matches!(settings.database_url(), Err(DbError::MissingUrl)));
    }
}
