//! Lenient field decoding for stored plan and history JSON.
//!
//! Plan builders persist form input verbatim, so numbers frequently arrive as
//! strings (`"10"`), and older history rows store `marked` as a boolean rather
//! than `0`/`1`.

use serde::{Deserialize, Deserializer, Serializer};
use serde_json::Value;

fn number_from_value(value: &Value) -> Option<f64> {
  match value {
    Value::Number(n) => n.as_f64(),
    Value::String(s) => s.trim().parse::<f64>().ok(),
    _ => None,
  }
}

/// Non-negative whole number, given as a JSON number or numeric string
pub fn count<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
  D: Deserializer<'de>,
{
  let value = Value::deserialize(deserializer)?;
  match number_from_value(&value) {
    Some(n) if n >= 0.0 && n.fract() == 0.0 && n <= u32::MAX as f64 => Ok(n as u32),
    _ => Err(serde::de::Error::custom(format!(
      "expected a non-negative whole number, got {}",
      value
    ))),
  }
}

/// Non-negative decimal, given as a JSON number or numeric string.
/// Blank strings are read as zero (bodyweight sets are saved with no weight).
pub fn amount<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
  D: Deserializer<'de>,
{
  let value = Value::deserialize(deserializer)?;
  if matches!(&value, Value::String(s) if s.trim().is_empty()) || value.is_null() {
    return Ok(0.0);
  }
  match number_from_value(&value) {
    Some(n) if n >= 0.0 && n.is_finite() => Ok(n),
    _ => Err(serde::de::Error::custom(format!(
      "expected a non-negative number, got {}",
      value
    ))),
  }
}

/// `marked` flag: written as `0`/`1`, read from `0`/`1` or a boolean
pub mod marked {
  use super::*;

  pub fn serialize<S>(marked: &bool, serializer: S) -> Result<S::Ok, S::Error>
  where
    S: Serializer,
  {
    serializer.serialize_u8(u8::from(*marked))
  }

  pub fn deserialize<'de, D>(deserializer: D) -> Result<bool, D::Error>
  where
    D: Deserializer<'de>,
  {
    match Value::deserialize(deserializer)? {
      Value::Bool(b) => Ok(b),
      Value::Number(n) => Ok(n.as_f64().is_some_and(|v| v != 0.0)),
      Value::Null => Ok(false),
      other => Err(serde::de::Error::custom(format!(
        "expected 0, 1 or a boolean for `marked`, got {}",
        other
      ))),
    }
  }
}

/// Exercise length in minutes: read like `amount`, written as an integer
/// when whole so stored rows keep their usual shape
pub mod minutes {
  use super::*;

  pub fn serialize<S>(minutes: &f64, serializer: S) -> Result<S::Ok, S::Error>
  where
    S: Serializer,
  {
    if minutes.fract() == 0.0 && *minutes >= 0.0 && *minutes <= u32::MAX as f64 {
      serializer.serialize_u32(*minutes as u32)
    } else {
      serializer.serialize_f64(*minutes)
    }
  }

  pub fn deserialize<'de, D>(deserializer: D) -> Result<f64, D::Error>
  where
    D: Deserializer<'de>,
  {
    super::amount(deserializer)
  }
}
