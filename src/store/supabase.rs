//! Supabase (PostgREST) history store
//!
//! Talks to the same `workout_plans` / `workout_history` tables the gym web
//! app reads, using the service key.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use super::HistoryStore;
use crate::config::SupabaseConfig;
use crate::error::{TrackerError, TrackerResult};
use crate::models::{HistoryEntry, SnapshotKey, SnapshotRecord, StoredSnapshot, WorkingExercise};

/// ---------------------------------------------------------------------------
/// Configuration Constants
/// ---------------------------------------------------------------------------

const REST_PATH: &str = "rest/v1/";
const PLANS_TABLE: &str = "workout_plans";
const HISTORY_TABLE: &str = "workout_history";
const HISTORY_CONFLICT_KEY: &str = "member_id,workout_plan_id,date";

/// ---------------------------------------------------------------------------
/// Row Types
/// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct PlanRow {
  #[serde(default)]
  plan: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct IdRow {
  id: Value,
}

#[derive(Debug, Deserialize)]
struct SnapshotRow {
  id: Value,
  #[serde(default)]
  exercises: Value,
}

#[derive(Debug, Deserialize)]
struct HistoryRow {
  id: Value,
  date: NaiveDate,
  #[serde(default)]
  exercises: Value,
  #[serde(default)]
  completion_percentage: Option<f64>,
  #[serde(default)]
  updated_by: Option<String>,
  #[serde(default)]
  updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
struct UpsertRow<'a> {
  member_id: &'a str,
  workout_plan_id: &'a str,
  date: NaiveDate,
  exercises: &'a [WorkingExercise],
  completion_percentage: u8,
  updated_by: &'a str,
  updated_at: DateTime<Utc>,
}

/// ---------------------------------------------------------------------------
/// Store
/// ---------------------------------------------------------------------------

pub struct SupabaseStore {
  client: Client,
  rest_url: Url,
  service_key: String,
}

impl SupabaseStore {
  pub fn new(config: &SupabaseConfig) -> TrackerResult<Self> {
    let rest_url = config
      .url
      .join(REST_PATH)
      .map_err(|e| TrackerError::InvalidConfig(format!("SUPABASE_URL: {}", e)))?;

    Ok(Self {
      client: Client::new(),
      rest_url,
      service_key: config.service_key.clone(),
    })
  }

  fn table_url(&self, table: &str, query: &[(&str, String)]) -> TrackerResult<Url> {
    let mut url = self
      .rest_url
      .join(table)
      .map_err(|e| TrackerError::InvalidConfig(e.to_string()))?;
    {
      let mut pairs = url.query_pairs_mut();
      for (name, value) in query {
        pairs.append_pair(name, value);
      }
    }
    Ok(url)
  }

  fn request(&self, method: Method, url: Url) -> RequestBuilder {
    self
      .client
      .request(method, url)
      .header("apikey", &self.service_key)
      .header("Authorization", format!("Bearer {}", self.service_key))
  }

  async fn fetch_rows<T: for<'de> Deserialize<'de>>(&self, url: Url) -> TrackerResult<Vec<T>> {
    let response = self.request(Method::GET, url).send().await?;
    let response = check_status(response, "query").await?;
    let text = response.text().await?;
    serde_json::from_str(&text).map_err(|e| {
      let preview: String = text.chars().take(500).collect();
      warn!("Unexpected Supabase response: {}", preview);
      TrackerError::Api(format!("Failed to parse rows: {}", e))
    })
  }
}

async fn check_status(response: Response, action: &str) -> TrackerResult<Response> {
  let status = response.status();
  if status.is_success() {
    return Ok(response);
  }

  let error_text = response.text().await.unwrap_or_default();
  match status {
    StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(TrackerError::Api(format!(
      "Supabase rejected {} ({}): check SUPABASE_SERVICE_KEY",
      action, status
    ))),
    _ => Err(TrackerError::Api(format!(
      "Supabase {} failed ({}): {}",
      action, status, error_text
    ))),
  }
}

fn eq(value: &str) -> String {
  format!("eq.{}", value)
}

fn id_string(id: &Value) -> String {
  match id {
    Value::String(s) => s.clone(),
    other => other.to_string(),
  }
}

/// `exercises` is a jsonb column, but rows written by older clients hold text
fn decode_exercises(value: Value) -> TrackerResult<Vec<WorkingExercise>> {
  let value = match value {
    Value::String(text) => serde_json::from_str(&text)
      .map_err(|e| TrackerError::Api(format!("Corrupt snapshot exercises: {}", e)))?,
    Value::Null => return Ok(Vec::new()),
    other => other,
  };
  serde_json::from_value(value)
    .map_err(|e| TrackerError::Api(format!("Corrupt snapshot exercises: {}", e)))
}

#[async_trait]
impl HistoryStore for SupabaseStore {
  async fn fetch_plan(&self, plan_id: &str) -> TrackerResult<Option<Value>> {
    let url = self.table_url(
      PLANS_TABLE,
      &[("select", "plan".to_string()), ("id", eq(plan_id))],
    )?;
    let rows: Vec<PlanRow> = self.fetch_rows(url).await?;

    Ok(rows.into_iter().next().and_then(|row| row.plan))
  }

  async fn fetch_snapshot(&self, key: &SnapshotKey) -> TrackerResult<Option<StoredSnapshot>> {
    let url = self.table_url(
      HISTORY_TABLE,
      &[
        ("select", "id,exercises".to_string()),
        ("member_id", eq(&key.member_id)),
        ("workout_plan_id", eq(&key.workout_plan_id)),
        ("date", eq(&key.date.to_string())),
        ("limit", "1".to_string()),
      ],
    )?;
    let rows: Vec<SnapshotRow> = self.fetch_rows(url).await?;

    match rows.into_iter().next() {
      Some(row) => Ok(Some(StoredSnapshot {
        id: id_string(&row.id),
        exercises: decode_exercises(row.exercises)?,
      })),
      None => Ok(None),
    }
  }

  async fn upsert_snapshot(&self, record: &SnapshotRecord) -> TrackerResult<String> {
    let url = self.table_url(
      HISTORY_TABLE,
      &[("on_conflict", HISTORY_CONFLICT_KEY.to_string())],
    )?;
    let body = [UpsertRow {
      member_id: &record.key.member_id,
      workout_plan_id: &record.key.workout_plan_id,
      date: record.key.date,
      exercises: &record.exercises,
      completion_percentage: record.completion_percentage,
      updated_by: &record.updated_by,
      updated_at: Utc::now(),
    }];

    let response = self
      .request(Method::POST, url)
      .header("Prefer", "resolution=merge-duplicates,return=representation")
      .json(&body)
      .send()
      .await?;
    let response = check_status(response, "upsert").await?;

    let rows: Vec<IdRow> = response
      .json()
      .await
      .map_err(|e| TrackerError::Api(format!("Failed to parse upsert response: {}", e)))?;
    let id = rows
      .first()
      .map(|row| id_string(&row.id))
      .ok_or_else(|| TrackerError::Api("Upsert returned no rows".to_string()))?;

    debug!(id = %id, date = %record.key.date, "snapshot upserted");
    Ok(id)
  }

  async fn list_snapshots(
    &self,
    member_id: &str,
    plan_id: &str,
    from: NaiveDate,
    to: NaiveDate,
  ) -> TrackerResult<Vec<HistoryEntry>> {
    let url = self.table_url(
      HISTORY_TABLE,
      &[
        (
          "select",
          "id,date,exercises,completion_percentage,updated_by,updated_at".to_string(),
        ),
        ("member_id", eq(member_id)),
        ("workout_plan_id", eq(plan_id)),
        ("date", format!("gte.{}", from)),
        ("date", format!("lte.{}", to)),
        ("order", "date.asc".to_string()),
      ],
    )?;
    let rows: Vec<HistoryRow> = self.fetch_rows(url).await?;

    rows
      .into_iter()
      .map(|row| {
        Ok(HistoryEntry {
          id: id_string(&row.id),
          date: row.date,
          exercises: decode_exercises(row.exercises)?,
          completion_percentage: row
            .completion_percentage
            .map(|p| p.round().clamp(0.0, 100.0) as u8)
            .unwrap_or(0),
          updated_by: row.updated_by,
          updated_at: row.updated_at,
        })
      })
      .collect()
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
