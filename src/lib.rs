pub mod aggregator;
pub mod config;
pub mod db;
pub mod error;
pub mod history;
pub mod merger;
pub mod models;
pub mod normalizer;
pub mod store;
pub mod timer;
pub mod tracker;

#[cfg(test)]
mod test_utils;

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

pub use aggregator::ExerciseStatus;
pub use config::AppConfig;
pub use error::{TrackerError, TrackerResult};
pub use history::{progress_report, DayProgress, ProgressReport};
pub use normalizer::{normalize_plan, NormalizedPlan};
pub use store::HistoryStore;
pub use timer::{TimerEvent, TimerState};
pub use tracker::{PlanStatus, VerifiedMember, WorkoutTracker};

/// Install the global fmt subscriber. Safe to call more than once; later
/// calls leave the first subscriber in place.
pub fn init_logging(filter: &str) {
  let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));
  let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Load configuration, start logging and open the configured store
pub async fn bootstrap() -> TrackerResult<(AppConfig, Arc<dyn HistoryStore>)> {
  let config = AppConfig::load()?;
  init_logging(&config.log_filter);

  let store = store::open_store(&config).await?;
  info!("History store ready");

  Ok((config, store))
}

#[cfg(test)]
mod tests {
  use super::*;
  use serial_test::serial;

  #[test]
  fn test_init_logging_is_idempotent() {
    init_logging("workout_tracker=debug");
    init_logging("not[a filter");
  }

  #[test]
  #[serial]
  fn test_bootstrap_opens_sqlite_store() {
    temp_env::with_vars(
      [
        ("TRACKER_STORE", Some("sqlite")),
        ("DATABASE_URL", Some("sqlite::memory:")),
        ("TRACKER_LOG", Some("warn")),
      ],
      || {
        let runtime = tokio::runtime::Runtime::new().expect("Should build runtime");
        runtime.block_on(async {
          let (config, store) = bootstrap().await.expect("Should bootstrap");
          assert_eq!(config.log_filter, "warn");
          assert_eq!(store.fetch_plan("missing").await.unwrap(), None);
        });
      },
    );
  }
}
