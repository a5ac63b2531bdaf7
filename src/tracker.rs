//! Workout tracker session
//!
//! One member, one plan, one calendar day. The session loads the plan and
//! today's snapshot, keeps the merged working state in memory, applies marks
//! optimistically and writes the whole day back after every mark.
//!
//! Key rules:
//! - Only the owning member may mark anything
//! - Bad indices are rejected before state changes
//! - A failed write keeps the optimistic state; `sync` retries, `reload` discards
//! - Timers belong to the session and stop when it is closed or dropped

use std::sync::Arc;

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, error, info, warn};

use crate::aggregator::{self, ExerciseStatus};
use crate::error::{TrackerError, TrackerResult};
use crate::merger::merge_progress;
use crate::models::{ExerciseEntry, SnapshotKey, SnapshotRecord, WorkingExercise};
use crate::normalizer::{normalize_plan, NormalizedPlan};
use crate::store::HistoryStore;
use crate::timer::{ExerciseTimers, TimerEvent, TimerState};

// ---------------------------------------------------------------------------
/// Verified Member: proof of identity issued by the auth layer
// ---------------------------------------------------------------------------

/// A member whose session the identity provider has already verified.
/// Every mutation requires one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedMember {
    pub member_id: String,
    pub display_name: Option<String>,
}

impl VerifiedMember {
    pub fn new(member_id: impl Into<String>, display_name: Option<String>) -> Self {
        Self {
            member_id: member_id.into(),
            display_name,
        }
    }

    /// Audit label written with each snapshot
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.member_id)
    }
}

// ---------------------------------------------------------------------------
/// Plan Status: how the plan load went
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "plan", content = "error", rename_all = "snake_case")]
pub enum PlanStatus {
    /// Member has no plan assigned
    Unassigned,
    Loaded,
    /// Stored plan could not be read; working set is empty
    Malformed(String),
}

// ---------------------------------------------------------------------------
/// Tracker Session
// ---------------------------------------------------------------------------

pub struct WorkoutTracker {
    store: Arc<dyn HistoryStore>,
    key: SnapshotKey,
    plan: Vec<ExerciseEntry>,
    plan_status: PlanStatus,
    exercises: Vec<WorkingExercise>,
    snapshot_id: Option<String>,
    synced: bool,
    timers: ExerciseTimers,
}

impl WorkoutTracker {
    /// Load the session for `owner` on `plan_id` for calendar day `date`
    pub async fn load(
        store: Arc<dyn HistoryStore>,
        owner: &VerifiedMember,
        plan_id: &str,
        date: NaiveDate,
    ) -> TrackerResult<Self> {
        let key = SnapshotKey {
            workout_plan_id: plan_id.to_string(),
            member_id: owner.member_id.clone(),
            date,
        };

        let mut tracker = Self {
            store,
            key,
            plan: Vec::new(),
            plan_status: PlanStatus::Unassigned,
            exercises: Vec::new(),
            snapshot_id: None,
            synced: true,
            timers: ExerciseTimers::new(),
        };
        tracker.refresh().await?;

        info!(
            member = %tracker.key.member_id,
            plan = %tracker.key.workout_plan_id,
            date = %tracker.key.date,
            exercises = tracker.exercises.len(),
            "workout session loaded"
        );
        Ok(tracker)
    }

    /// Load for today's local calendar day
    pub async fn load_today(
        store: Arc<dyn HistoryStore>,
        owner: &VerifiedMember,
        plan_id: &str,
    ) -> TrackerResult<Self> {
        Self::load(store, owner, plan_id, Local::now().date_naive()).await
    }

    /// Discard local state and rebuild from the store
    pub async fn reload(&mut self) -> TrackerResult<()> {
        self.timers.stop_all();
        self.refresh().await
    }

    async fn refresh(&mut self) -> TrackerResult<()> {
        let raw_plan = self.store.fetch_plan(&self.key.workout_plan_id).await?;

        let (plan, plan_status) = match normalize_plan(raw_plan.as_ref()) {
            Ok(NormalizedPlan::Assigned(entries)) => (entries, PlanStatus::Loaded),
            Ok(NormalizedPlan::Unassigned) => (Vec::new(), PlanStatus::Unassigned),
            Err(TrackerError::MalformedPlan(reason)) => {
                warn!(plan = %self.key.workout_plan_id, "unreadable plan: {}", reason);
                (Vec::new(), PlanStatus::Malformed(reason))
            }
            Err(other) => return Err(other),
        };

        let snapshot = self.store.fetch_snapshot(&self.key).await?;
        let exercises = merge_progress(
            &plan,
            snapshot.as_ref().map(|s| s.exercises.as_slice()),
        );

        // Indices may now point at different exercises
        self.timers.clear();
        self.plan = plan;
        self.plan_status = plan_status;
        self.exercises = exercises;
        self.snapshot_id = snapshot.map(|s| s.id);
        self.synced = true;
        Ok(())
    }

    pub fn key(&self) -> &SnapshotKey {
        &self.key
    }

    pub fn plan(&self) -> &[ExerciseEntry] {
        &self.plan
    }

    pub fn plan_status(&self) -> &PlanStatus {
        &self.plan_status
    }

    pub fn exercises(&self) -> &[WorkingExercise] {
        &self.exercises
    }

    pub fn statuses(&self) -> Vec<ExerciseStatus> {
        aggregator::classify_all(&self.exercises)
    }

    pub fn completion_percentage(&self) -> u8 {
        aggregator::completion_percentage(&self.exercises)
    }

    /// Id of today's stored snapshot, once one exists
    pub fn snapshot_id(&self) -> Option<&str> {
        self.snapshot_id.as_deref()
    }

    /// False after a failed write until `sync` or `reload` succeeds
    pub fn is_synced(&self) -> bool {
        self.synced
    }

    // -----------------------------------------------------------------------
    // Mark operations
    // -----------------------------------------------------------------------

    fn authorize(&self, member: &VerifiedMember) -> TrackerResult<()> {
        if member.member_id != self.key.member_id {
            warn!(
                principal = %member.member_id,
                owner = %self.key.member_id,
                "rejected mark from non-owner"
            );
            return Err(TrackerError::Unauthorized {
                principal: member.member_id.clone(),
                owner: self.key.member_id.clone(),
            });
        }
        Ok(())
    }

    /// Mark one set; returns the new completion percentage once persisted
    pub async fn mark_set(
        &mut self,
        member: &VerifiedMember,
        exercise_index: usize,
        set_index: usize,
        success: bool,
    ) -> TrackerResult<u8> {
        self.authorize(member)?;
        aggregator::mark_set(&mut self.exercises, exercise_index, set_index, success)?;
        debug!(exercise_index, set_index, success, "set marked");
        self.persist(member).await
    }

    /// Mark a timed exercise; its timer stops and cannot be restarted
    pub async fn mark_exercise(
        &mut self,
        member: &VerifiedMember,
        exercise_index: usize,
        success: bool,
    ) -> TrackerResult<u8> {
        self.authorize(member)?;
        aggregator::mark_exercise(&mut self.exercises, exercise_index, success)?;
        self.timers.stop(exercise_index);
        debug!(exercise_index, success, "exercise marked");
        self.persist(member).await
    }

    /// Retry writing the current state after a failed mark
    pub async fn sync(&mut self, member: &VerifiedMember) -> TrackerResult<u8> {
        self.authorize(member)?;
        self.persist(member).await
    }

    async fn persist(&mut self, member: &VerifiedMember) -> TrackerResult<u8> {
        let completion_percentage = self.completion_percentage();
        let record = SnapshotRecord {
            key: self.key.clone(),
            exercises: self.exercises.clone(),
            completion_percentage,
            updated_by: member.label().to_string(),
        };

        match self.store.upsert_snapshot(&record).await {
            Ok(id) => {
                self.snapshot_id = Some(id);
                self.synced = true;
                Ok(completion_percentage)
            }
            Err(e) => {
                self.synced = false;
                error!(date = %self.key.date, "failed to persist progress: {}", e);
                Err(TrackerError::Persistence(e.to_string()))
            }
        }
    }

    // -----------------------------------------------------------------------
    // Timers
    // -----------------------------------------------------------------------

    fn timed_exercise(&self, index: usize) -> TrackerResult<(u32, bool)> {
        match self.exercises.get(index) {
            Some(WorkingExercise::DurationBased {
                duration_minutes,
                marked,
                ..
            }) => Ok(((duration_minutes * 60.0).round() as u32, *marked)),
            Some(_) => Err(TrackerError::WrongExerciseKind {
                index,
                expected: "duration-based",
            }),
            None => Err(TrackerError::ExerciseOutOfRange {
                index,
                len: self.exercises.len(),
            }),
        }
    }

    /// Start or resume the countdown. Requires a tokio runtime.
    pub fn start_timer(&mut self, index: usize) -> TrackerResult<TimerState> {
        let (full_secs, marked) = self.timed_exercise(index)?;
        if marked {
            return Err(TrackerError::TimerUnavailable {
                index,
                reason: "exercise already marked".to_string(),
            });
        }
        Ok(self.timers.start(index, full_secs))
    }

    pub fn pause_timer(&mut self, index: usize) -> TrackerResult<TimerState> {
        self.timed_exercise(index)?;
        Ok(self.timers.pause(index))
    }

    pub fn reset_timer(&mut self, index: usize) -> TrackerResult<TimerState> {
        let (full_secs, marked) = self.timed_exercise(index)?;
        if marked {
            return Err(TrackerError::TimerUnavailable {
                index,
                reason: "exercise already marked".to_string(),
            });
        }
        Ok(self.timers.reset(index, full_secs))
    }

    pub fn timer_state(&self, index: usize) -> Option<TimerState> {
        self.timers.state(index)
    }

    /// Seconds left on the countdown (full duration if never started)
    pub fn timer_remaining_secs(&self, index: usize) -> TrackerResult<u32> {
        let (full_secs, _) = self.timed_exercise(index)?;
        Ok(self.timers.remaining_secs(index).unwrap_or(full_secs))
    }

    pub fn subscribe_timers(&mut self) -> UnboundedReceiver<TimerEvent> {
        self.timers.subscribe()
    }

    /// Tear down the session, stopping every timer
    pub fn close(mut self) {
        self.timers.stop_all();
        debug!(date = %self.key.date, "workout session closed");
    }
}

// ---------------------------------------------------------------------------
/// Tests
// ---------------------------------------------------------------------------
