use serde::Serialize;

/// One set in a strength exercise
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanSet {
  pub reps: u32,
  pub weight: f64,
}

/// An exercise as assigned in a workout plan.
///
/// Built only by the plan normalizer; serialized back to the stored shape
/// (`sets` vs `duration_minutes`).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ExerciseEntry {
  /// Repetition sets with weight, matched against history by index
  SetBased { name: String, sets: Vec<PlanSet> },
  /// Timed activity (cardio, planks, ...)
  DurationBased {
    name: String,
    /// May be fractional (a 1.5 minute sprint)
    #[serde(serialize_with = "super::lenient::minutes::serialize")]
    duration_minutes: f64,
  },
}

impl ExerciseEntry {
  pub fn name(&self) -> &str {
    match self {
      ExerciseEntry::SetBased { name, .. } => name,
      ExerciseEntry::DurationBased { name, .. } => name,
    }
  }
}
