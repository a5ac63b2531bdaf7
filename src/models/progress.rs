use serde::{Deserialize, Serialize};

use super::lenient;
use super::plan::{ExerciseEntry, PlanSet};

/// A plan set with today's outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkingSet {
  #[serde(deserialize_with = "lenient::count")]
  pub reps: u32,
  #[serde(deserialize_with = "lenient::amount", default)]
  pub weight: f64,
  #[serde(default)]
  pub completed: bool,
  /// Set has been judged (success or failure); `completed` is meaningless until then
  #[serde(with = "lenient::marked", default)]
  pub marked: bool,
}

impl WorkingSet {
  pub fn fresh(set: &PlanSet) -> Self {
    Self {
      reps: set.reps,
      weight: set.weight,
      completed: false,
      marked: false,
    }
  }
}

/// An exercise with today's completion state, as stored in a daily snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WorkingExercise {
  SetBased {
    name: String,
    sets: Vec<WorkingSet>,
  },
  DurationBased {
    name: String,
    #[serde(with = "lenient::minutes")]
    duration_minutes: f64,
    #[serde(default)]
    completed: bool,
    #[serde(with = "lenient::marked", default)]
    marked: bool,
  },
}

impl WorkingExercise {
  /// Fresh state for a plan entry: nothing marked, nothing completed
  pub fn fresh(entry: &ExerciseEntry) -> Self {
    match entry {
      ExerciseEntry::SetBased { name, sets } => WorkingExercise::SetBased {
        name: name.clone(),
        sets: sets.iter().map(WorkingSet::fresh).collect(),
      },
      ExerciseEntry::DurationBased {
        name,
        duration_minutes,
      } => WorkingExercise::DurationBased {
        name: name.clone(),
        duration_minutes: *duration_minutes,
        completed: false,
        marked: false,
      },
    }
  }

  pub fn name(&self) -> &str {
    match self {
      WorkingExercise::SetBased { name, .. } => name,
      WorkingExercise::DurationBased { name, .. } => name,
    }
  }

  /// Outcome leaves as `(marked, completed)` pairs: one per set, or the
  /// exercise itself for timed work
  pub fn items(&self) -> Vec<(bool, bool)> {
    match self {
      WorkingExercise::SetBased { sets, .. } => {
        sets.iter().map(|s| (s.marked, s.completed)).collect()
      }
      WorkingExercise::DurationBased {
        completed, marked, ..
      } => vec![(*marked, *completed)],
    }
  }

  pub fn kind(&self) -> &'static str {
    match self {
      WorkingExercise::SetBased { .. } => "set-based",
      WorkingExercise::DurationBased { .. } => "duration-based",
    }
  }
}
