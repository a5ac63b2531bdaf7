use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tracing::info;

use crate::error::TrackerResult;

pub type DbPool = SqlitePool;

/// Initialize the database connection pool and run migrations
pub async fn initialize_db(database_url: &str) -> TrackerResult<DbPool> {
  info!("Initializing database at: {}", database_url);

  // Each connection to an in-memory database sees its own copy
  let max_connections = if database_url.contains(":memory:") || database_url.contains("mode=memory") {
    1
  } else {
    5
  };

  let pool = SqlitePoolOptions::new()
    .max_connections(max_connections)
    .connect(database_url)
    .await?;

  // Run migrations
  sqlx::migrate!("./migrations").run(&pool).await?;

  info!("Database initialized successfully");

  Ok(pool)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_initialize_creates_schema() {
    let pool = initialize_db("sqlite::memory:").await.expect("Should open");

    let tables: Vec<(String,)> = sqlx::query_as(
      "SELECT name FROM sqlite_master WHERE type='table' AND name IN ('workout_plans', 'workout_history')"
    )
    .fetch_all(&pool)
    .await
    .expect("Failed to query tables");

    assert_eq!(tables.len(), 2);
    pool.close().await;
  }

  #[tokio::test]
  async fn test_bad_url_is_database_error() {
    let result = initialize_db("postgres://nowhere").await;
    assert!(matches!(result, Err(crate::error::TrackerError::Database(_))));
  }
}
