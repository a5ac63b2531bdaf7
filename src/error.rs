use serde::Serialize;

/// ---------------------------------------------------------------------------
/// Error Handling
/// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
  #[error("Malformed plan: {0}")]
  MalformedPlan(String),

  #[error("Exercise index {index} out of range ({len} exercises)")]
  ExerciseOutOfRange { index: usize, len: usize },

  #[error("Set index {set} out of range for exercise {exercise} ({len} sets)")]
  SetOutOfRange { exercise: usize, set: usize, len: usize },

  #[error("Exercise {index} is not {expected}")]
  WrongExerciseKind { index: usize, expected: &'static str },

  #[error("Timer unavailable for exercise {index}: {reason}")]
  TimerUnavailable { index: usize, reason: String },

  #[error("Member {principal} may not modify progress owned by {owner}")]
  Unauthorized { principal: String, owner: String },

  #[error("Invalid date range: {from} is after {to}")]
  InvalidRange { from: chrono::NaiveDate, to: chrono::NaiveDate },

  #[error("Failed to persist progress: {0}")]
  Persistence(String),

  #[error("Database error: {0}")]
  Database(String),

  #[error("HTTP request failed: {0}")]
  Request(#[from] reqwest::Error),

  #[error("API error: {0}")]
  Api(String),

  #[error("Missing configuration: {0}")]
  MissingConfig(String),

  #[error("Invalid configuration: {0}")]
  InvalidConfig(String),
}

impl From<sqlx::Error> for TrackerError {
  fn from(e: sqlx::Error) -> Self {
    TrackerError::Database(e.to_string())
  }
}

impl From<sqlx::migrate::MigrateError> for TrackerError {
  fn from(e: sqlx::migrate::MigrateError) -> Self {
    TrackerError::Database(e.to_string())
  }
}

impl Serialize for TrackerError {
  fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
  where
    S: serde::Serializer,
  {
    serializer.serialize_str(&self.to_string())
  }
}

pub type TrackerResult<T> = Result<T, TrackerError>;
