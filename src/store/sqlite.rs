use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use sqlx::Row;
use tracing::debug;

use super::HistoryStore;
use crate::db::DbPool;
use crate::error::{TrackerError, TrackerResult};
use crate::models::{HistoryEntry, SnapshotKey, SnapshotRecord, StoredSnapshot, WorkingExercise};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// History store backed by the local SQLite database
#[derive(Clone)]
pub struct SqliteStore {
  pool: DbPool,
}

impl SqliteStore {
  pub fn new(pool: DbPool) -> Self {
    Self { pool }
  }

  pub fn pool(&self) -> &DbPool {
    &self.pool
  }

  /// Save (or replace) a plan assignment. Text values are stored verbatim so
  /// plans saved as encoded JSON keep that shape.
  pub async fn save_plan(
    &self,
    plan_id: &str,
    name: &str,
    plan: Option<&Value>,
    assigned_by: Option<&str>,
  ) -> TrackerResult<()> {
    let plan_json = plan.map(|value| match value {
      Value::String(text) => text.clone(),
      other => other.to_string(),
    });

    sqlx::query(
      r#"
      INSERT INTO workout_plans (id, name, plan_json, assigned_by)
      VALUES (?1, ?2, ?3, ?4)
      ON CONFLICT(id) DO UPDATE SET
        name = excluded.name,
        plan_json = excluded.plan_json,
        assigned_by = excluded.assigned_by
      "#,
    )
    .bind(plan_id)
    .bind(name)
    .bind(plan_json)
    .bind(assigned_by)
    .execute(&self.pool)
    .await?;

    Ok(())
  }
}

fn decode_exercises(raw: &str) -> TrackerResult<Vec<WorkingExercise>> {
  serde_json::from_str(raw)
    .map_err(|e| TrackerError::Database(format!("Corrupt snapshot exercises: {}", e)))
}

#[async_trait]
impl HistoryStore for SqliteStore {
  async fn fetch_plan(&self, plan_id: &str) -> TrackerResult<Option<Value>> {
    let plan_json: Option<Option<String>> =
      sqlx::query_scalar("SELECT plan_json FROM workout_plans WHERE id = ?1")
        .bind(plan_id)
        .fetch_optional(&self.pool)
        .await?;

    Ok(plan_json.flatten().map(Value::String))
  }

  async fn fetch_snapshot(&self, key: &SnapshotKey) -> TrackerResult<Option<StoredSnapshot>> {
    let row = sqlx::query(
      r#"
      SELECT id, exercises_json
      FROM workout_history
      WHERE member_id = ?1 AND workout_plan_id = ?2 AND date = ?3
      "#,
    )
    .bind(&key.member_id)
    .bind(&key.workout_plan_id)
    .bind(key.date.format(DATE_FORMAT).to_string())
    .fetch_optional(&self.pool)
    .await?;

    match row {
      Some(row) => {
        let id: i64 = row.get("id");
        let exercises_json: String = row.get("exercises_json");
        Ok(Some(StoredSnapshot {
          id: id.to_string(),
          exercises: decode_exercises(&exercises_json)?,
        }))
      }
      None => Ok(None),
    }
  }

  async fn upsert_snapshot(&self, record: &SnapshotRecord) -> TrackerResult<String> {
    let exercises_json = serde_json::to_string(&record.exercises)
      .map_err(|e| TrackerError::Database(format!("Failed to encode exercises: {}", e)))?;

    let id: i64 = sqlx::query_scalar(
      r#"
      INSERT INTO workout_history (
        member_id, workout_plan_id, date, exercises_json,
        completion_percentage, updated_by, updated_at
      )
      VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
      ON CONFLICT(member_id, workout_plan_id, date) DO UPDATE SET
        exercises_json = excluded.exercises_json,
        completion_percentage = excluded.completion_percentage,
        updated_by = excluded.updated_by,
        updated_at = excluded.updated_at
      RETURNING id
      "#,
    )
    .bind(&record.key.member_id)
    .bind(&record.key.workout_plan_id)
    .bind(record.key.date.format(DATE_FORMAT).to_string())
    .bind(exercises_json)
    .bind(i64::from(record.completion_percentage))
    .bind(&record.updated_by)
    .bind(Utc::now().to_rfc3339())
    .fetch_one(&self.pool)
    .await?;

    debug!(id, date = %record.key.date, pct = record.completion_percentage, "snapshot saved");
    Ok(id.to_string())
  }

  async fn list_snapshots(
    &self,
    member_id: &str,
    plan_id: &str,
    from: NaiveDate,
    to: NaiveDate,
  ) -> TrackerResult<Vec<HistoryEntry>> {
    let rows = sqlx::query(
      r#"
      SELECT id, date, exercises_json, completion_percentage, updated_by, updated_at
      FROM workout_history
      WHERE member_id = ?1 AND workout_plan_id = ?2 AND date >= ?3 AND date <= ?4
      ORDER BY date
      "#,
    )
    .bind(member_id)
    .bind(plan_id)
    .bind(from.format(DATE_FORMAT).to_string())
    .bind(to.format(DATE_FORMAT).to_string())
    .fetch_all(&self.pool)
    .await?;

    let mut entries = Vec::with_capacity(rows.len());
    for row in rows {
      let id: i64 = row.get("id");
      let date: String = row.get("date");
      let exercises_json: String = row.get("exercises_json");
      let pct: i64 = row.get("completion_percentage");
      let updated_at: Option<String> = row.get("updated_at");

      entries.push(HistoryEntry {
        id: id.to_string(),
        date: NaiveDate::parse_from_str(&date, DATE_FORMAT)
          .map_err(|e| TrackerError::Database(format!("Bad history date {}: {}", date, e)))?,
        exercises: decode_exercises(&exercises_json)?,
        completion_percentage: pct.clamp(0, 100) as u8,
        updated_by: row.get("updated_by"),
        updated_at: updated_at.and_then(|s| {
          DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
        }),
      });
    }

    Ok(entries)
  }
}
