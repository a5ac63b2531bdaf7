//! Test utilities and helpers for unit testing
//!
//! This module provides common test infrastructure including:
//! - Database setup/teardown
//! - Plan fixtures
//! - An in-memory history store for paused-clock tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use serde_json::{json, Value};
use sqlx::SqlitePool;

use crate::error::{TrackerError, TrackerResult};
use crate::models::{HistoryEntry, SnapshotKey, SnapshotRecord, StoredSnapshot};
use crate::store::HistoryStore;
use crate::tracker::VerifiedMember;

/// ---------------------------------------------------------------------------
/// Database Test Utilities
/// ---------------------------------------------------------------------------

/// Create an in-memory SQLite database for testing
/// Runs all migrations and returns a ready-to-use pool
///
/// Uses max_connections(1) so every query sees the same in-memory database
pub async fn setup_test_db() -> SqlitePool {
  let pool = sqlx::sqlite::SqlitePoolOptions::new()
    .max_connections(1)
    .connect("sqlite::memory:")
    .await
    .expect("Failed to create in-memory database");

  sqlx::migrate!("./migrations")
    .run(&pool)
    .await
    .expect("Failed to run migrations");

  pool
}

/// Close a test database pool
pub async fn teardown_test_db(pool: SqlitePool) {
  pool.close().await;
}

/// Insert a plan row. `None` leaves the plan unassigned; string values are
/// stored as-is, anything else as encoded JSON.
pub async fn seed_test_plan(pool: &SqlitePool, plan_id: &str, plan: Option<&Value>) {
  let plan_json = plan.map(|value| match value {
    Value::String(text) => text.clone(),
    other => other.to_string(),
  });

  sqlx::query("INSERT INTO workout_plans (id, name, plan_json, assigned_by) VALUES (?1, ?2, ?3, ?4)")
    .bind(plan_id)
    .bind("Test plan")
    .bind(plan_json)
    .bind("coach-1")
    .execute(pool)
    .await
    .expect("Failed to seed plan");
}

/// ---------------------------------------------------------------------------
/// In-Memory Store
/// ---------------------------------------------------------------------------

/// History store kept entirely in process memory
#[derive(Clone, Default)]
pub struct MemoryStore {
  plans: Arc<Mutex<HashMap<String, Value>>>,
  snapshots: Arc<Mutex<HashMap<SnapshotKey, HistoryEntry>>>,
  fail_writes: Arc<AtomicBool>,
}

impl MemoryStore {
  pub fn with_plan(plan_id: &str, plan: Value) -> Self {
    let store = Self::default();
    store.plans.lock().unwrap().insert(plan_id.to_string(), plan);
    store
  }

  pub fn snapshot_count(&self) -> usize {
    self.snapshots.lock().unwrap().len()
  }

  /// Replace the stored plan, as a trainer edit would
  pub fn set_plan(&self, plan_id: &str, plan: Value) {
    self.plans.lock().unwrap().insert(plan_id.to_string(), plan);
  }

  /// While set, every upsert fails with a database error
  pub fn fail_writes(&self, fail: bool) {
    self.fail_writes.store(fail, Ordering::SeqCst);
  }
}

#[async_trait]
impl HistoryStore for MemoryStore {
  async fn fetch_plan(&self, plan_id: &str) -> TrackerResult<Option<Value>> {
    Ok(self.plans.lock().unwrap().get(plan_id).cloned())
  }

  async fn fetch_snapshot(&self, key: &SnapshotKey) -> TrackerResult<Option<StoredSnapshot>> {
    Ok(self.snapshots.lock().unwrap().get(key).map(|entry| StoredSnapshot {
      id: entry.id.clone(),
      exercises: entry.exercises.clone(),
    }))
  }

  async fn upsert_snapshot(&self, record: &SnapshotRecord) -> TrackerResult<String> {
    if self.fail_writes.load(Ordering::SeqCst) {
      return Err(TrackerError::Database("connection reset".to_string()));
    }
    let mut snapshots = self.snapshots.lock().unwrap();
    let next_id = (snapshots.len() + 1).to_string();
    let id = snapshots
      .get(&record.key)
      .map(|entry| entry.id.clone())
      .unwrap_or(next_id);

    snapshots.insert(
      record.key.clone(),
      HistoryEntry {
        id: id.clone(),
        date: record.key.date,
        exercises: record.exercises.clone(),
        completion_percentage: record.completion_percentage,
        updated_by: Some(record.updated_by.clone()),
        updated_at: Some(Utc::now()),
      },
    );
    Ok(id)
  }

  async fn list_snapshots(
    &self,
    member_id: &str,
    plan_id: &str,
    from: NaiveDate,
    to: NaiveDate,
  ) -> TrackerResult<Vec<HistoryEntry>> {
    let mut entries: Vec<HistoryEntry> = self
      .snapshots
      .lock()
      .unwrap()
      .iter()
      .filter(|(key, _)| {
        key.member_id == member_id
          && key.workout_plan_id == plan_id
          && key.date >= from
          && key.date <= to
      })
      .map(|(_, entry)| entry.clone())
      .collect();
    entries.sort_by_key(|entry| entry.date);
    Ok(entries)
  }
}

/// ---------------------------------------------------------------------------
/// Mock Data Factories
/// ---------------------------------------------------------------------------

/// One set-based exercise: Squat, two sets
pub fn mock_squat_plan() -> Value {
  json!({
    "exercises": [
      {"name": "Squat", "sets": [
        {"reps": 10, "weight": 50},
        {"reps": 10, "weight": 50}
      ]}
    ]
  })
}

/// Bench press (three sets) followed by a 5 minute plank
pub fn mock_mixed_plan() -> Value {
  json!({
    "exercises": [
      {"name": "Bench Press", "sets": [
        {"reps": 8, "weight": 60},
        {"reps": 8, "weight": 60},
        {"reps": 6, "weight": 65}
      ]},
      {"name": "Plank", "duration_minutes": 5}
    ]
  })
}

pub fn mock_member() -> VerifiedMember {
  VerifiedMember::new("member-1", Some("Alex".to_string()))
}

/// ---------------------------------------------------------------------------
/// Time Helpers
/// ---------------------------------------------------------------------------

/// Fixed calendar day used across tests
pub fn test_day() -> NaiveDate {
  NaiveDate::from_ymd_opt(2025, 3, 10).expect("Valid date")
}

/// `test_day` shifted by `days`
pub fn test_day_offset(days: i64) -> NaiveDate {
  test_day() + chrono::Duration::days(days)
}

/// ---------------------------------------------------------------------------
/// Tests for Test Utilities
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;
  use crate::normalizer::normalize_plan;

  #[tokio::test]
  async fn test_setup_db_creates_schema() {
    let pool = setup_test_db().await;

    let tables: Vec<(String,)> = sqlx::query_as(
      "SELECT name FROM sqlite_master WHERE type='table' AND name IN ('workout_plans', 'workout_history')",
    )
    .fetch_all(&pool)
    .await
    .expect("Failed to query tables");

    assert_eq!(tables.len(), 2, "Expected 2 tables, got {}", tables.len());

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_seed_plan_stores_text() {
    let pool = setup_test_db().await;
    seed_test_plan(&pool, "p", Some(&mock_squat_plan())).await;

    let stored: Option<String> = sqlx::query_scalar("SELECT plan_json FROM workout_plans WHERE id = 'p'")
      .fetch_one(&pool)
      .await
      .expect("Failed to read plan");
    assert!(stored.expect("Plan text").contains("Squat"));

    teardown_test_db(pool).await;
  }

  #[test]
  fn test_mock_plans_normalize() {
    let squat = normalize_plan(Some(&mock_squat_plan())).expect("Squat plan should be valid");
    assert_eq!(squat.exercises().len(), 1);

    let mixed = normalize_plan(Some(&mock_mixed_plan())).expect("Mixed plan should be valid");
    assert_eq!(mixed.exercises().len(), 2);
  }

  #[test]
  fn test_day_helpers() {
    assert_eq!(test_day_offset(1), test_day().succ_opt().unwrap());
    assert_eq!(test_day_offset(-10), NaiveDate::from_ymd_opt(2025, 2, 28).unwrap());
  }
}
