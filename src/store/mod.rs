//! Storage boundary for plans and daily history
//!
//! The tracker only needs four reads/writes from whatever database backs the
//! gym app. Two adapters ship here: a local SQLite store and the Supabase
//! PostgREST API the web app uses.

pub mod sqlite;
pub mod supabase;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;

use crate::config::{AppConfig, StoreBackend};
use crate::error::TrackerResult;
use crate::models::{HistoryEntry, SnapshotKey, SnapshotRecord, StoredSnapshot};

pub use sqlite::SqliteStore;
pub use supabase::SupabaseStore;

#[async_trait]
pub trait HistoryStore: Send + Sync {
  /// Raw plan value as saved at assignment time; `None` if the plan has none
  async fn fetch_plan(&self, plan_id: &str) -> TrackerResult<Option<Value>>;

  /// Snapshot for exactly this member, plan and day
  async fn fetch_snapshot(&self, key: &SnapshotKey) -> TrackerResult<Option<StoredSnapshot>>;

  /// Insert or replace the snapshot for `record.key`, returning its id
  async fn upsert_snapshot(&self, record: &SnapshotRecord) -> TrackerResult<String>;

  /// Snapshots in `from..=to`, oldest first
  async fn list_snapshots(
    &self,
    member_id: &str,
    plan_id: &str,
    from: NaiveDate,
    to: NaiveDate,
  ) -> TrackerResult<Vec<HistoryEntry>>;
}

/// Open the store selected by configuration
pub async fn open_store(config: &AppConfig) -> TrackerResult<Arc<dyn HistoryStore>> {
  match &config.store {
    StoreBackend::Sqlite { database_url } => {
      let pool = crate::db::initialize_db(database_url).await?;
      Ok(Arc::new(SqliteStore::new(pool)))
    }
    StoreBackend::Supabase(supabase) => Ok(Arc::new(SupabaseStore::new(supabase)?)),
  }
}
