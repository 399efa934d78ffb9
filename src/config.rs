use std::str::FromStr;

use anyhow::Context;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing::info;

use crate::rankings::DEFAULT_SPIRIT_TYPE;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://spirit_rankings.db";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub database_url: String,
    pub default_spirit_type: String,
    pub otlp_endpoint: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            default_spirit_type: DEFAULT_SPIRIT_TYPE.to_string(),
            otlp_endpoint: None,
        }
    }
}

impl AppConfig {
    /// Reads settings from the process environment. Unset or empty variables
    /// keep their defaults.
    pub fn from_env() -> Self {
        let var = |name: &str| {
            std::env::var(name)
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let defaults = Self::default();
        Self {
            database_url: var("DATABASE_URL").unwrap_or(defaults.database_url),
            default_spirit_type: var("DEFAULT_SPIRIT_TYPE")
                .unwrap_or(defaults.default_spirit_type),
            otlp_endpoint: var("OTEL_EXPORTER_OTLP_ENDPOINT"),
        }
    }

    /// Opens the store, creating the database file on first run.
    pub async fn connect(&self) -> anyhow::Result<SqlitePool> {
        let options = SqliteConnectOptions::from_str(&self.database_url)
            .with_context(|| format!("Invalid DATABASE_URL '{}'", self.database_url))?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .context("Failed to connect to SQLite database")?;

        info!(database_url = %self.database_url, "Connected to database");
        Ok(pool)
    }
}
