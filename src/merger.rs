//! Progress Merger
//!
//! Combines today's plan with today's snapshot (if any). Exercises pair up by
//! name so a trainer can reorder, add or drop exercises mid-day without the
//! member losing what they already ticked off. Sets pair up by position.

use crate::models::{ExerciseEntry, WorkingExercise, WorkingSet};

/// Merge a normalized plan with the snapshot recorded for the same day.
///
/// Output follows plan order. With no snapshot every exercise starts fresh;
/// a previous day's snapshot must never be passed here.
pub fn merge_progress(
    plan: &[ExerciseEntry],
    snapshot: Option<&[WorkingExercise]>,
) -> Vec<WorkingExercise> {
    plan.iter()
        .map(|entry| {
            let recorded = snapshot
                .and_then(|exercises| exercises.iter().find(|e| e.name() == entry.name()));
            merge_entry(entry, recorded)
        })
        .collect()
}

fn merge_entry(entry: &ExerciseEntry, recorded: Option<&WorkingExercise>) -> WorkingExercise {
    match (entry, recorded) {
        (
            ExerciseEntry::SetBased { name, sets },
            Some(WorkingExercise::SetBased {
                sets: recorded_sets,
                ..
            }),
        ) => WorkingExercise::SetBased {
            name: name.clone(),
            sets: sets
                .iter()
                .enumerate()
                .map(|(idx, set)| match recorded_sets.get(idx) {
                    Some(prev) => WorkingSet {
                        reps: set.reps,
                        weight: set.weight,
                        completed: prev.completed,
                        marked: prev.marked,
                    },
                    None => WorkingSet::fresh(set),
                })
                .collect(),
        },
        (
            ExerciseEntry::DurationBased {
                name,
                duration_minutes,
            },
            Some(WorkingExercise::DurationBased {
                completed, marked, ..
            }),
        ) => WorkingExercise::DurationBased {
            name: name.clone(),
            duration_minutes: *duration_minutes,
            completed: *completed,
            marked: *marked,
        },
        // Unrecorded, or the exercise changed kind since it was recorded
        _ => WorkingExercise::fresh(entry),
    }
}
