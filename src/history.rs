//! Progress review over past days
//!
//! Reads stored snapshots for a date range and summarizes each day by exercise
//! status. Days are reported exactly as recorded; later plan edits do not
//! change them.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::aggregator::{classify, ExerciseStatus};
use crate::error::{TrackerError, TrackerResult};
use crate::models::HistoryEntry;
use crate::store::HistoryStore;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayProgress {
    pub date: NaiveDate,
    pub completion_percentage: u8,
    pub completed: usize,
    pub missed: usize,
    pub pending: usize,
    pub updated_by: Option<String>,
}

impl DayProgress {
    pub fn from_entry(entry: &HistoryEntry) -> Self {
        let mut day = Self {
            date: entry.date,
            completion_percentage: entry.completion_percentage,
            completed: 0,
            missed: 0,
            pending: 0,
            updated_by: entry.updated_by.clone(),
        };

        for exercise in &entry.exercises {
            match classify(exercise) {
                ExerciseStatus::Completed => day.completed += 1,
                ExerciseStatus::Missed { .. } => day.missed += 1,
                ExerciseStatus::Pending => day.pending += 1,
            }
        }
        day
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressReport {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub days: Vec<DayProgress>,
    /// Rounded mean of the stored percentages; 0 with no days
    pub average_completion: u8,
    /// Days recorded at 100%
    pub full_days: usize,
}

impl ProgressReport {
    pub fn days_tracked(&self) -> usize {
        self.days.len()
    }
}

/// Summarize `member_id`'s progress on `plan_id` for every stored day in `from..=to`
pub async fn progress_report(
    store: &dyn HistoryStore,
    member_id: &str,
    plan_id: &str,
    from: NaiveDate,
    to: NaiveDate,
) -> TrackerResult<ProgressReport> {
    if from > to {
        return Err(TrackerError::InvalidRange { from, to });
    }

    let entries = store.list_snapshots(member_id, plan_id, from, to).await?;
    let days: Vec<DayProgress> = entries.iter().map(DayProgress::from_entry).collect();

    let average_completion = if days.is_empty() {
        0
    } else {
        let total: u32 = days.iter().map(|d| u32::from(d.completion_percentage)).sum();
        (f64::from(total) / days.len() as f64).round() as u8
    };
    let full_days = days.iter().filter(|d| d.completion_percentage >= 100).count();

    debug!(member = member_id, plan = plan_id, days = days.len(), "progress report built");

    Ok(ProgressReport {
        from,
        to,
        days,
        average_completion,
        full_days,
    })
}
