//! Plan Normalizer
//!
//! Stored plans come in several shapes depending on which screen saved them:
//! - a bare list of exercises
//! - an object wrapping the list under `exercises`
//! - either of the above serialized as JSON text
//!
//! This is the only place that looks at those shapes. Everything downstream
//! works on `ExerciseEntry`.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{TrackerError, TrackerResult};
use crate::models::lenient;
use crate::models::{ExerciseEntry, PlanSet};

/// Text may wrap text once (plans re-saved through a string column)
const MAX_TEXT_DEPTH: u8 = 2;

// ---------------------------------------------------------------------------
/// Normalized Plan
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedPlan {
    /// No plan assigned (stored value absent or null)
    Unassigned,
    /// Ordered exercise list, possibly empty
    Assigned(Vec<ExerciseEntry>),
}

impl NormalizedPlan {
    pub fn exercises(&self) -> &[ExerciseEntry] {
        match self {
            NormalizedPlan::Unassigned => &[],
            NormalizedPlan::Assigned(entries) => entries,
        }
    }

    pub fn is_assigned(&self) -> bool {
        matches!(self, NormalizedPlan::Assigned(_))
    }
}

#[derive(Debug, Deserialize)]
struct RawSet {
    #[serde(deserialize_with = "lenient::count")]
    reps: u32,
    #[serde(deserialize_with = "lenient::amount", default)]
    weight: f64,
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    name: String,
    #[serde(default)]
    sets: Option<Vec<RawSet>>,
    #[serde(default)]
    duration_minutes: Option<Value>,
}

// ---------------------------------------------------------------------------
/// Normalization
// ---------------------------------------------------------------------------

/// Normalize a raw stored plan value.
///
/// `None` and JSON `null` mean no plan is assigned. Anything present that
/// cannot be read as a list of set-based or duration-based exercises is a
/// `MalformedPlan` error.
pub fn normalize_plan(raw: Option<&Value>) -> TrackerResult<NormalizedPlan> {
    match raw {
        None => Ok(NormalizedPlan::Unassigned),
        Some(value) => normalize_value(value, 0),
    }
}

/// Normalize a plan read from a text column (SQLite stores plans as text)
pub fn normalize_plan_text(raw: Option<&str>) -> TrackerResult<NormalizedPlan> {
    match raw {
        None => Ok(NormalizedPlan::Unassigned),
        Some(text) => normalize_value(&Value::String(text.to_string()), 0),
    }
}

fn normalize_value(value: &Value, depth: u8) -> TrackerResult<NormalizedPlan> {
    match value {
        Value::Null => Ok(NormalizedPlan::Unassigned),
        Value::String(text) => {
            if text.trim().is_empty() {
                return Ok(NormalizedPlan::Unassigned);
            }
            if depth >= MAX_TEXT_DEPTH {
                return Err(TrackerError::MalformedPlan(
                    "plan text is nested too deeply".to_string(),
                ));
            }
            let decoded: Value = serde_json::from_str(text)
                .map_err(|e| TrackerError::MalformedPlan(format!("invalid plan JSON: {}", e)))?;
            normalize_value(&decoded, depth + 1)
        }
        Value::Object(map) => match map.get("exercises") {
            Some(inner @ Value::Array(_)) | Some(inner @ Value::Null) => {
                normalize_value(inner, depth)
            }
            Some(inner @ Value::String(_)) => normalize_value(inner, depth),
            Some(other) => Err(TrackerError::MalformedPlan(format!(
                "`exercises` must be a list, got {}",
                type_name(other)
            ))),
            None => Err(TrackerError::MalformedPlan(
                "plan object has no `exercises` list".to_string(),
            )),
        },
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(idx, item)| parse_entry(idx, item))
            .collect::<TrackerResult<Vec<_>>>()
            .map(NormalizedPlan::Assigned),
        other => Err(TrackerError::MalformedPlan(format!(
            "expected a list of exercises, got {}",
            type_name(other)
        ))),
    }
}

fn parse_entry(idx: usize, item: &Value) -> TrackerResult<ExerciseEntry> {
    let raw = RawEntry::deserialize(item)
        .map_err(|e| TrackerError::MalformedPlan(format!("exercise {}: {}", idx, e)))?;

    let name = raw.name.trim().to_string();
    if name.is_empty() {
        return Err(TrackerError::MalformedPlan(format!(
            "exercise {} has no name",
            idx
        )));
    }

    // Forms save an empty field as null or ""
    let duration = raw
        .duration_minutes
        .filter(|v| !v.is_null() && !matches!(v, Value::String(s) if s.trim().is_empty()));

    match (raw.sets, duration) {
        (Some(sets), None) => Ok(ExerciseEntry::SetBased {
            name,
            sets: sets
                .into_iter()
                .map(|s| PlanSet {
                    reps: s.reps,
                    weight: s.weight,
                })
                .collect(),
        }),
        (None, Some(minutes)) => {
            let duration_minutes = lenient::amount(minutes).map_err(|e| {
                TrackerError::MalformedPlan(format!("exercise {} ({}): {}", idx, name, e))
            })?;
            Ok(ExerciseEntry::DurationBased {
                name,
                duration_minutes,
            })
        }
        (Some(_), Some(_)) => Err(TrackerError::MalformedPlan(format!(
            "exercise {} ({}) has both sets and duration_minutes",
            idx, name
        ))),
        (None, None) => Err(TrackerError::MalformedPlan(format!(
            "exercise {} ({}) has neither sets nor duration_minutes",
            idx, name
        ))),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "text",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

// ---------------------------------------------------------------------------
/// Tests
// ---------------------------------------------------------------------------
