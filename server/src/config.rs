use std::str::FromStr;

use anyhow::{Result, anyhow};
use platform_db::DEFAULT_DATABASE_URL;

/// Where the roster lives while the server runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageKind {
    Database,
    Memory,
}

impl FromStr for StorageKind {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "database" | "db" | "sql" => Ok(Self::Database),
            "memory" | "mem" => Ok(Self::Memory),
            other => Err(anyhow!("unknown ORGCHART_STORAGE value `{other}`")),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub storage: StorageKind,
    pub database_url: String,
    pub cors_allowed_origins: Vec<String>,
    pub seed_demo_data: bool,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        let storage = match std::env::var("ORGCHART_STORAGE") {
            Ok(raw) if !raw.trim().is_empty() => raw.parse()?,
            _ => StorageKind::Database,
        };

        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DATABASE_URL.into());

        let cors_allowed_origins = parse_origins(
            &std::env::var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:5173".into()),
        );

        Ok(Self {
            storage,
            database_url,
            cors_allowed_origins,
            seed_demo_data: env_bool("SEED_DEMO_DATA", true),
        })
    }

    /// In-memory storage with no CORS restrictions, used by tests.
    #[cfg(test)]
    pub fn in_memory() -> Self {
        Self {
            storage: StorageKind::Memory,
            database_url: String::new(),
            cors_allowed_origins: Vec::new(),
            seed_demo_data: false,
        }
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .filter_map(|s| {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
        .collect()
}

fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|val| matches!(val.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(default)
}
