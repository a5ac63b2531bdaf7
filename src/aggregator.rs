//! Completion Aggregator
//!
//! Mark operations on the working state, per-exercise status, and the
//! day's completion percentage.
//!
//! Key rules:
//! - Every set (or timed exercise) is one leaf; unmarked leaves count as not done
//! - A single failed item makes the whole exercise `missed`
//! - Partially marked exercises with no failures stay `pending`

use serde::{Deserialize, Serialize};

use crate::error::{TrackerError, TrackerResult};
use crate::models::WorkingExercise;

// ---------------------------------------------------------------------------
/// Exercise Status: derived, never stored
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExerciseStatus {
    /// Not every item judged yet, none failed
    Pending,
    /// Every item judged and successful
    Completed,
    /// At least one judged item failed
    Missed { failed_count: usize },
}

impl std::fmt::Display for ExerciseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Completed => write!(f, "completed"),
            Self::Missed { failed_count } => write!(f, "missed ({})", failed_count),
        }
    }
}

/// Classify one exercise. Timed exercises are a one-item collection.
pub fn classify(exercise: &WorkingExercise) -> ExerciseStatus {
    let items = exercise.items();

    let failed_count = items
        .iter()
        .filter(|(marked, completed)| *marked && !*completed)
        .count();
    if failed_count > 0 {
        return ExerciseStatus::Missed { failed_count };
    }

    if !items.is_empty() && items.iter().all(|(marked, _)| *marked) {
        ExerciseStatus::Completed
    } else {
        ExerciseStatus::Pending
    }
}

/// Status for every exercise, in working-state order
pub fn classify_all(exercises: &[WorkingExercise]) -> Vec<ExerciseStatus> {
    exercises.iter().map(classify).collect()
}

// ---------------------------------------------------------------------------
/// Completion Percentage
// ---------------------------------------------------------------------------

/// Share of all leaves that are completed, rounded half-up to 0..=100.
/// Zero when there are no leaves.
pub fn completion_percentage(exercises: &[WorkingExercise]) -> u8 {
    let (done, total) = exercises
        .iter()
        .flat_map(|e| e.items())
        .fold((0usize, 0usize), |(done, total), (_, completed)| {
            (done + usize::from(completed), total + 1)
        });

    if total == 0 {
        return 0;
    }

    let pct = (done as f64 * 100.0 / total as f64).round();
    pct.clamp(0.0, 100.0) as u8
}

// ---------------------------------------------------------------------------
/// Mark Operations
// ---------------------------------------------------------------------------

/// Judge one set of a set-based exercise. Other sets are untouched.
/// Index and kind are checked before anything changes.
pub fn mark_set(
    exercises: &mut [WorkingExercise],
    exercise_index: usize,
    set_index: usize,
    success: bool,
) -> TrackerResult<()> {
    let len = exercises.len();
    let exercise = exercises
        .get_mut(exercise_index)
        .ok_or(TrackerError::ExerciseOutOfRange {
            index: exercise_index,
            len,
        })?;

    match exercise {
        WorkingExercise::SetBased { sets, .. } => {
            let set_count = sets.len();
            let set = sets.get_mut(set_index).ok_or(TrackerError::SetOutOfRange {
                exercise: exercise_index,
                set: set_index,
                len: set_count,
            })?;
            set.completed = success;
            set.marked = true;
            Ok(())
        }
        WorkingExercise::DurationBased { .. } => Err(TrackerError::WrongExerciseKind {
            index: exercise_index,
            expected: "set-based",
        }),
    }
}

/// Judge a whole duration-based exercise
pub fn mark_exercise(
    exercises: &mut [WorkingExercise],
    exercise_index: usize,
    success: bool,
) -> TrackerResult<()> {
    let len = exercises.len();
    let exercise = exercises
        .get_mut(exercise_index)
        .ok_or(TrackerError::ExerciseOutOfRange {
            index: exercise_index,
            len,
        })?;

    match exercise {
        WorkingExercise::DurationBased {
            completed, marked, ..
        } => {
            *completed = success;
            *marked = true;
            Ok(())
        }
        WorkingExercise::SetBased { .. } => Err(TrackerError::WrongExerciseKind {
            index: exercise_index,
            expected: "duration-based",
        }),
    }
}

// ---------------------------------------------------------------------------
/// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merger::merge_progress;
    use crate::models::{ExerciseEntry, PlanSet};

    fn squat_plan() -> Vec<ExerciseEntry> {
        vec![ExerciseEntry::SetBased {
            name: "Squat".to_string(),
            sets: vec![
                PlanSet { reps: 10, weight: 50.0 },
                PlanSet { reps: 10, weight: 50.0 },
            ],
        }]
    }

    fn plank_plan() -> Vec<ExerciseEntry> {
        vec![ExerciseEntry::DurationBased {
            name: "Plank".to_string(),
            duration_minutes: 5.0,
        }]
    }

    #[test]
    fn test_squat_scenario() {
        let mut state = merge_progress(&squat_plan(), None);
        assert_eq!(state[0].items(), vec![(false, false), (false, false)]);
        assert_eq!(classify(&state[0]), ExerciseStatus::Pending);

        mark_set(&mut state, 0, 0, true).unwrap();
        assert_eq!(completion_percentage(&state), 50);
        assert_eq!(classify(&state[0]), ExerciseStatus::Pending);

        mark_set(&mut state, 0, 1, false).unwrap();
        assert_eq!(completion_percentage(&state), 50);
        assert_eq!(
            classify(&state[0]),
            ExerciseStatus::Missed { failed_count: 1 }
        );
    }

    #[test]
    fn test_plank_scenario() {
        let mut state = merge_progress(&plank_plan(), None);
        mark_exercise(&mut state, 0, true).unwrap();

        assert_eq!(completion_percentage(&state), 100);
        assert_eq!(classify(&state[0]), ExerciseStatus::Completed);
    }

    #[test]
    fn test_mark_set_is_idempotent() {
        let mut once = merge_progress(&squat_plan(), None);
        mark_set(&mut once, 0, 1, true).unwrap();

        let mut twice = merge_progress(&squat_plan(), None);
        mark_set(&mut twice, 0, 1, true).unwrap();
        mark_set(&mut twice, 0, 1, true).unwrap();

        assert_eq!(once, twice);
    }

    #[test]
    fn test_remark_overrides_outcome() {
        let mut state = merge_progress(&squat_plan(), None);
        mark_set(&mut state, 0, 0, false).unwrap();
        mark_set(&mut state, 0, 0, true).unwrap();
        mark_set(&mut state, 0, 1, true).unwrap();

        assert_eq!(classify(&state[0]), ExerciseStatus::Completed);
        assert_eq!(completion_percentage(&state), 100);
    }

    #[test]
    fn test_out_of_range_rejected_without_mutation() {
        let mut state = merge_progress(&squat_plan(), None);
        let before = state.clone();

        assert!(matches!(
            mark_set(&mut state, 3, 0, true),
            Err(TrackerError::ExerciseOutOfRange { index: 3, len: 1 })
        ));
        assert!(matches!(
            mark_set(&mut state, 0, 2, true),
            Err(TrackerError::SetOutOfRange { set: 2, len: 2, .. })
        ));
        assert!(matches!(
            mark_exercise(&mut state, 1, true),
            Err(TrackerError::ExerciseOutOfRange { .. })
        ));
        assert_eq!(state, before);
    }

    #[test]
    fn test_wrong_kind_rejected() {
        let mut strength = merge_progress(&squat_plan(), None);
        assert!(matches!(
            mark_exercise(&mut strength, 0, true),
            Err(TrackerError::WrongExerciseKind { expected: "duration-based", .. })
        ));

        let mut timed = merge_progress(&plank_plan(), None);
        assert!(matches!(
            mark_set(&mut timed, 0, 0, true),
            Err(TrackerError::WrongExerciseKind { expected: "set-based", .. })
        ));
        assert_eq!(classify(&timed[0]), ExerciseStatus::Pending);
    }

    #[test]
    fn test_percentage_bounds() {
        assert_eq!(completion_percentage(&[]), 0);

        let empty_sets = vec![WorkingExercise::SetBased {
            name: "Warmup".to_string(),
            sets: vec![],
        }];
        assert_eq!(completion_percentage(&empty_sets), 0);
        assert_eq!(classify(&empty_sets[0]), ExerciseStatus::Pending);

        let mut three = merge_progress(
            &[ExerciseEntry::SetBased {
                name: "Press".to_string(),
                sets: vec![PlanSet { reps: 5, weight: 30.0 }; 3],
            }],
            None,
        );
        mark_set(&mut three, 0, 0, true).unwrap();
        assert_eq!(completion_percentage(&three), 33);
        mark_set(&mut three, 0, 1, true).unwrap();
        assert_eq!(completion_percentage(&three), 67);
        mark_set(&mut three, 0, 2, true).unwrap();
        assert_eq!(completion_percentage(&three), 100);
    }

    #[test]
    fn test_unmarked_leaves_count_against_percentage() {
        let mut plan = squat_plan();
        plan.extend(plank_plan());
        let mut state = merge_progress(&plan, None);

        mark_exercise(&mut state, 1, true).unwrap();
        assert_eq!(completion_percentage(&state), 33);
    }

    #[test]
    fn test_missed_counts_every_failure() {
        let mut state = merge_progress(&squat_plan(), None);
        mark_set(&mut state, 0, 0, false).unwrap();
        assert_eq!(
            classify(&state[0]),
            ExerciseStatus::Missed { failed_count: 1 }
        );
        mark_set(&mut state, 0, 1, false).unwrap();
        assert_eq!(
            classify_all(&state),
            vec![ExerciseStatus::Missed { failed_count: 2 }]
        );
    }

    #[test]
    fn test_status_serializes_with_tag() {
        let json = serde_json::to_value(ExerciseStatus::Missed { failed_count: 1 }).unwrap();
        assert_eq!(json["status"], "missed");
        assert_eq!(json["failed_count"], 1);
        assert_eq!(ExerciseStatus::Pending.to_string(), "pending");
    }
}
