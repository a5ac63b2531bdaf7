//! Environment-driven configuration
//!
//! Values come from the process environment; `AppConfig::load` first reads a
//! `.env` file if one exists.

use std::env;
use url::Url;

use crate::error::{TrackerError, TrackerResult};

/// ---------------------------------------------------------------------------
/// Configuration Constants
/// ---------------------------------------------------------------------------

const DEFAULT_DATABASE_URL: &str = "sqlite://workout-tracker.db?mode=rwc";
const DEFAULT_LOG_FILTER: &str = "info";

/// ---------------------------------------------------------------------------
/// Configuration Types
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SupabaseConfig {
  /// Project URL, always ending in `/`
  pub url: Url,
  pub service_key: String,
}

#[derive(Debug, Clone)]
pub enum StoreBackend {
  Sqlite { database_url: String },
  Supabase(SupabaseConfig),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub store: StoreBackend,
  pub log_filter: String,
}

impl SupabaseConfig {
  pub fn new(url: &str, service_key: &str) -> TrackerResult<Self> {
    let mut url = Url::parse(url)
      .map_err(|e| TrackerError::InvalidConfig(format!("SUPABASE_URL: {}", e)))?;
    if url.cannot_be_a_base() {
      return Err(TrackerError::InvalidConfig(
        "SUPABASE_URL must be an http(s) URL".to_string(),
      ));
    }
    if !url.path().ends_with('/') {
      let path = format!("{}/", url.path());
      url.set_path(&path);
    }

    Ok(Self {
      url,
      service_key: service_key.to_string(),
    })
  }

  pub fn from_env() -> TrackerResult<Self> {
    let url = env::var("SUPABASE_URL")
      .map_err(|_| TrackerError::MissingConfig("SUPABASE_URL".into()))?;
    let service_key = env::var("SUPABASE_SERVICE_KEY")
      .map_err(|_| TrackerError::MissingConfig("SUPABASE_SERVICE_KEY".into()))?;
    Self::new(&url, &service_key)
  }
}

impl AppConfig {
  /// Read configuration from the environment only
  pub fn from_env() -> TrackerResult<Self> {
    let backend = env::var("TRACKER_STORE").unwrap_or_else(|_| "sqlite".to_string());

    let store = match backend.trim().to_ascii_lowercase().as_str() {
      "sqlite" => StoreBackend::Sqlite {
        database_url: env::var("DATABASE_URL")
          .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
      },
      "supabase" => StoreBackend::Supabase(SupabaseConfig::from_env()?),
      other => {
        return Err(TrackerError::InvalidConfig(format!(
          "TRACKER_STORE must be sqlite or supabase, got {}",
          other
        )))
      }
    };

    Ok(Self {
      store,
      log_filter: env::var("TRACKER_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string()),
    })
  }

  /// Load `.env` (if present), then read the environment
  pub fn load() -> TrackerResult<Self> {
    dotenvy::dotenv().ok();
    Self::from_env()
  }
}
