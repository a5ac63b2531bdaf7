pub mod history;
pub mod lenient;
pub mod plan;
pub mod progress;

pub use history::{HistoryEntry, SnapshotKey, SnapshotRecord, StoredSnapshot};
pub use plan::{ExerciseEntry, PlanSet};
pub use progress::{WorkingExercise, WorkingSet};
