use crate::core::{AppError, Result};
use serde::Deserialize;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use std::time::Duration;

use super::{parse_or, Lookup};

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Empty when the in-memory store is used
    pub url: String,
    pub pool_size: u32,
    pub max_connections: u32,
}

impl DatabaseConfig {
    pub(crate) fn from_lookup(get: &Lookup<'_>) -> Result<Self> {
        Ok(DatabaseConfig {
            url: get("DATABASE_URL").unwrap_or_default(),
            pool_size: parse_or(get, "DATABASE_POOL_SIZE", 10)?,
            max_connections: parse_or(get, "DATABASE_MAX_CONNECTIONS", 20)?,
        })
    }

    /// Create a MySQL connection pool
    pub async fn create_pool(&self) -> Result<MySqlPool> {
        if self.url.is_empty() {
            return Err(AppError::Configuration("DATABASE_URL not set".to_string()));
        }

        MySqlPoolOptions::new()
            .max_connections(self.max_connections)
            .min_connections(self.pool_size.min(self.max_connections))
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600)) // 10 minutes
            .max_lifetime(Duration::from_secs(1800)) // 30 minutes
            .test_before_acquire(true)
            .connect(&self.url)
            .await
            .map_err(AppError::Database)
    }
}
