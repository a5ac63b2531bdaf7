use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::progress::WorkingExercise;

/// Identifies one daily snapshot: at most one row exists per key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SnapshotKey {
  pub workout_plan_id: String,
  pub member_id: String,
  pub date: NaiveDate,
}

/// Snapshot as read back for today
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSnapshot {
  pub id: String,
  pub exercises: Vec<WorkingExercise>,
}

/// Snapshot as written; replaces any existing row for the same key
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotRecord {
  pub key: SnapshotKey,
  pub exercises: Vec<WorkingExercise>,
  pub completion_percentage: u8,
  /// Audit label shown on trainer dashboards
  pub updated_by: String,
}

/// Full history row, used for progress review over a date range
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
  pub id: String,
  pub date: NaiveDate,
  pub exercises: Vec<WorkingExercise>,
  pub completion_percentage: u8,
  pub updated_by: Option<String>,
  pub updated_at: Option<DateTime<Utc>>,
}
