pub mod attempts;
pub mod profiles;
pub mod quizzes;
mod schema;

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbInitError {
    #[error("invalid DATABASE_URL: {0}")]
    InvalidUrl(String),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

#[derive(Clone)]
pub struct DatabaseProxy {
    pool: SqlitePool,
    url: String,
}

impl DatabaseProxy {
    pub async fn from_env() -> Result<Arc<Self>, DbInitError> {
        let url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| "sqlite::memory:".to_string());
        Self::connect(&url).await
    }

    pub async fn connect(url: &str) -> Result<Arc<Self>, DbInitError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| DbInitError::InvalidUrl(e.to_string()))?
            .create_if_missing(true);

        // An in-memory database lives in its single connection; a larger
        // pool would hand out empty databases.
        let max_connections = if url.contains(":memory:") { 1 } else { 10 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect_with(options)
            .await?;

        schema::ensure_schema(&pool).await?;

        Ok(Arc::new(Self {
            pool,
            url: url.to_string(),
        }))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn connection_string(&self) -> &str {
        &self.url
    }

    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Decode a JSON text column explicitly; corrupt JSON is a decode error,
/// never a silent default.
pub(crate) fn decode_json<T: serde::de::DeserializeOwned>(
    column: &str,
    raw: &str,
) -> Result<T, sqlx::Error> {
    serde_json::from_str(raw).map_err(|e| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}

pub(crate) fn encode_json<T: serde::Serialize>(value: &T) -> Result<String, sqlx::Error> {
    serde_json::to_string(value).map_err(|e| sqlx::Error::Decode(Box::new(e)))
}
