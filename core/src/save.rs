//! Save adapter — the time block of a save file.
//!
//! Saves from older builds may be missing fields, carry the wrong
//! types, or name impossible dates. None of that may stop a load:
//! every field is validated and clamped before it reaches the clock.

use crate::{
    clock::{Epoch, GameClock},
    error::SimResult,
    speed::{SpeedController, SpeedMode},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SaveData {
    pub year:                 u32,
    pub month:                u32,
    pub day:                  u32,
    pub hour:                 u32,
    pub minute:               u32,
    pub week:                 u32,
    pub mode:                 SpeedMode,
    pub is_paused:            bool,
    pub accumulated_fraction: f64,
}

impl SaveData {
    pub fn capture(clock: &GameClock, speed: &SpeedController) -> Self {
        Self {
            year:                 clock.year(),
            month:                clock.month(),
            day:                  clock.day(),
            hour:                 clock.hour(),
            minute:               clock.minute(),
            week:                 clock.week(),
            mode:                 speed.mode(),
            is_paused:            speed.is_paused(),
            accumulated_fraction: clock.accumulated_fraction(),
        }
    }

    pub fn to_json(&self) -> SimResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a save blob. Only malformed JSON is an error; anything
    /// parseable is sanitised by [`SaveData::from_value`].
    pub fn from_blob(blob: &str, fallback: &Epoch) -> SimResult<Self> {
        let value: Value = serde_json::from_str(blob)?;
        Ok(Self::from_value(&value, fallback))
    }

    /// Build a sane `SaveData` from arbitrary JSON. Missing date fields
    /// come from `fallback`; out-of-range ones are clamped.
    pub fn from_value(value: &Value, fallback: &Epoch) -> Self {
        let clock = GameClock::from_parts(
            int_field(value, "year").unwrap_or(fallback.year as i64),
            int_field(value, "month").unwrap_or(fallback.month as i64),
            int_field(value, "day").unwrap_or(fallback.day as i64),
            int_field(value, "hour").unwrap_or(fallback.hour as i64),
            int_field(value, "minute").unwrap_or(fallback.minute as i64),
        );

        let paused_flag = value.get("isPaused").and_then(Value::as_bool);
        let mode = match value.get("mode").and_then(Value::as_str).map(str::parse::<SpeedMode>) {
            Some(Ok(mode)) => mode,
            Some(Err(e)) => {
                log::warn!("save: {e}, deriving mode from isPaused");
                mode_from_paused_flag(paused_flag)
            }
            None => mode_from_paused_flag(paused_flag),
        };

        if paused_flag.is_some_and(|p| p != (mode == SpeedMode::Paused)) {
            log::warn!("save: isPaused disagrees with mode {mode}, trusting mode");
        }

        let accumulated_fraction = value
            .get("accumulatedFraction")
            .and_then(Value::as_f64)
            .filter(|f| f.is_finite() && (0.0..1.0).contains(f))
            .unwrap_or(0.0);

        Self {
            year:      clock.year(),
            month:     clock.month(),
            day:       clock.day(),
            hour:      clock.hour(),
            minute:    clock.minute(),
            week:      clock.week(),
            mode,
            is_paused: mode == SpeedMode::Paused,
            accumulated_fraction,
        }
    }

    /// Rebuild clock state, clamping again in case this value was
    /// constructed by hand.
    pub(crate) fn restore_clock(&self) -> GameClock {
        let mut clock = GameClock::from_parts(
            self.year as i64,
            self.month as i64,
            self.day as i64,
            self.hour as i64,
            self.minute as i64,
        );
        clock.set_accumulated_fraction(self.accumulated_fraction);
        clock
    }
}

fn mode_from_paused_flag(paused: Option<bool>) -> SpeedMode {
    match paused {
        Some(false) => SpeedMode::Normal,
        _           => SpeedMode::Paused,
    }
}

/// Integers, floats and numeric strings are all accepted.
fn int_field(value: &Value, key: &str) -> Option<i64> {
    match value.get(key)? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
