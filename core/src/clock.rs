//! Game clock: the authoritative calendar state.
//!
//! The clock is only ever mutated through `advance()`, which the engine
//! calls with whole minutes actually elapsed. Everything else reads it.

use crate::{
    calendar::{days_before_year, days_in_month, is_leap_year, is_valid_date, week_of_month, MAX_YEAR},
    error::{SimError, SimResult},
    types::{GameMinutes, HOURS_PER_DAY, MINUTES_PER_DAY, MINUTES_PER_HOUR},
};
use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// Fallback month/day used when restored data names an impossible date.
pub const FALLBACK_MONTH: u32 = 4;
pub const FALLBACK_DAY: u32 = 1;

const ACCUMULATOR_EPSILON: f64 = 1e-9;

/// A calendar instant at minute resolution. Used for the configured
/// epoch and as the clamping input when restoring saves.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Epoch {
    pub year:   u32,
    pub month:  u32,
    pub day:    u32,
    pub hour:   u32,
    pub minute: u32,
}

impl Default for Epoch {
    fn default() -> Self {
        Self { year: 1111, month: 4, day: 1, hour: 8, minute: 0 }
    }
}

impl Epoch {
    /// Reject anything that is not a real calendar minute.
    pub fn validate(&self) -> SimResult<()> {
        let reason = if self.year == 0 {
            Some("year must be at least 1")
        } else if self.year > MAX_YEAR {
            Some("year must be at most 9999")
        } else if !(1..=12).contains(&self.month) {
            Some("month must be within 1..=12")
        } else if !is_valid_date(self.year, self.month, self.day) {
            Some("day does not exist in that month")
        } else if self.hour > 23 {
            Some("hour must be within 0..=23")
        } else if self.minute > 59 {
            Some("minute must be within 0..=59")
        } else {
            None
        };

        match reason {
            Some(reason) => Err(SimError::InvalidEpoch {
                year:   self.year as i64,
                month:  self.month as i64,
                day:    self.day as i64,
                hour:   self.hour as i64,
                minute: self.minute as i64,
                reason,
            }),
            None => Ok(()),
        }
    }
}

/// What a single `advance()` call crossed. The engine uses this to
/// publish boundary events and to gate the midnight cascade group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Advance {
    pub minutes:        GameMinutes,
    pub hours_crossed:  u64,
    pub days_crossed:   u64,
    pub months_crossed: u64,
    pub years_crossed:  u64,
}

impl Advance {
    pub fn crossed_midnight(&self) -> bool {
        self.days_crossed > 0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameClock {
    pub(crate) year:   u32,
    pub(crate) month:  u32,
    pub(crate) day:    u32,
    pub(crate) hour:   u32,
    pub(crate) minute: u32,
    pub(crate) week:   u32,
    /// Sub-minute remainder carried between frames. In [0, 1) except
    /// after a rejected advance hands its whole minutes back.
    pub(crate) accumulated_fraction: f64,
}

impl GameClock {
    /// Build a clock at `epoch`. The epoch must already be validated;
    /// an invalid one is clamped rather than trusted.
    pub fn new(epoch: Epoch) -> Self {
        Self::from_parts(
            epoch.year as i64,
            epoch.month as i64,
            epoch.day as i64,
            epoch.hour as i64,
            epoch.minute as i64,
        )
    }

    /// Build a clock from untrusted parts, clamping anything out of range.
    ///
    /// A bad month falls back to April 1st; a bad day within a valid month
    /// falls back to the 1st. Years, hours and minutes are clamped to their range.
    pub fn from_parts(year: i64, month: i64, day: i64, hour: i64, minute: i64) -> Self {
        if !(1..=MAX_YEAR as i64).contains(&year) {
            log::warn!("clock: year {year} out of range, clamping to 1..={MAX_YEAR}");
        }
        let year = year.clamp(1, MAX_YEAR as i64) as u32;

        let (month, day) = if (1..=12).contains(&month) {
            let month = month as u32;
            let valid_day = day >= 1 && day <= days_in_month(month, year) as i64;
            if valid_day {
                (month, day as u32)
            } else {
                log::warn!("clock: day {day} invalid for {year}-{month:02}, using day {FALLBACK_DAY}");
                (month, FALLBACK_DAY)
            }
        } else {
            log::warn!("clock: month {month} invalid, falling back to {FALLBACK_MONTH}/{FALLBACK_DAY}");
            (FALLBACK_MONTH, FALLBACK_DAY)
        };

        Self {
            year,
            month,
            day,
            hour:   hour.clamp(0, 23) as u32,
            minute: minute.clamp(0, 59) as u32,
            week:   week_of_month(day),
            accumulated_fraction: 0.0,
        }
    }

    pub fn year(&self)   -> u32 { self.year }
    pub fn month(&self)  -> u32 { self.month }
    pub fn day(&self)    -> u32 { self.day }
    pub fn hour(&self)   -> u32 { self.hour }
    pub fn minute(&self) -> u32 { self.minute }
    pub fn week(&self)   -> u32 { self.week }
    pub fn accumulated_fraction(&self) -> f64 { self.accumulated_fraction }

    pub fn is_leap_year(&self) -> bool {
        is_leap_year(self.year)
    }

    pub fn days_in_month(&self) -> u32 {
        days_in_month(self.month, self.year)
    }

    pub fn is_midnight(&self) -> bool {
        self.hour == 0 && self.minute == 0
    }

    pub fn as_epoch(&self) -> Epoch {
        Epoch {
            year:   self.year,
            month:  self.month,
            day:    self.day,
            hour:   self.hour,
            minute: self.minute,
        }
    }

    /// Add whole minutes, cascading into hours, days, months and years.
    ///
    /// Call exactly once per batch of elapsed minutes; the caller owns
    /// the bookkeeping of what has already been applied. Time stops at
    /// the last minute of `MAX_YEAR`.
    pub fn advance(&mut self, minutes: GameMinutes) -> Advance {
        let mut report = Advance { minutes, ..Advance::default() };
        if minutes == 0 {
            return report;
        }

        let total_minutes = self.minute as u64 + minutes;
        self.minute = (total_minutes % MINUTES_PER_HOUR) as u32;

        let carry_hours = total_minutes / MINUTES_PER_HOUR;
        report.hours_crossed = carry_hours;
        let total_hours = self.hour as u64 + carry_hours;
        self.hour = (total_hours % HOURS_PER_DAY) as u32;

        let mut carry_days = total_hours / HOURS_PER_DAY;
        report.days_crossed = carry_days;

        // Walk month by month so every month uses its true length.
        while carry_days > 0 {
            let left_in_month = (days_in_month(self.month, self.year) - self.day) as u64;
            if carry_days <= left_in_month {
                self.day += carry_days as u32;
                carry_days = 0;
            } else if self.month == 12 && self.year >= MAX_YEAR {
                log::warn!("clock: reached the end of year {MAX_YEAR}, holding at its last minute");
                self.day = 31;
                self.hour = 23;
                self.minute = 59;
                break;
            } else {
                carry_days -= left_in_month + 1;
                self.day = 1;
                report.months_crossed += 1;
                if self.month == 12 {
                    self.month = 1;
                    self.year = self.year.saturating_add(1);
                    report.years_crossed += 1;
                } else {
                    self.month += 1;
                }
            }
        }

        self.week = week_of_month(self.day);
        report
    }

    /// Whole days from 0001-01-01 to the current date.
    pub fn total_days_since_epoch(&self) -> u64 {
        let months: u64 = (1..self.month)
            .map(|m| days_in_month(m, self.year) as u64)
            .sum();
        days_before_year(self.year) + months + (self.day as u64 - 1)
    }

    /// Minutes from 0001-01-01 00:00 to now, recomputed from scratch.
    pub fn total_elapsed_minutes_since_epoch(&self) -> GameMinutes {
        self.total_days_since_epoch() * MINUTES_PER_DAY
            + self.hour as u64 * MINUTES_PER_HOUR
            + self.minute as u64
    }

    /// Game minutes elapsed since `start`. Zero if `start` is later.
    pub fn minutes_since(&self, start: &Epoch) -> GameMinutes {
        let origin = GameClock::new(*start).total_elapsed_minutes_since_epoch();
        self.total_elapsed_minutes_since_epoch().saturating_sub(origin)
    }

    pub fn day_of_week(&self) -> Option<Weekday> {
        let year = i32::try_from(self.year).ok()?;
        NaiveDate::from_ymd_opt(year, self.month, self.day).map(|d| d.weekday())
    }

    /// Add real-derived fractional minutes and take out the whole part.
    pub(crate) fn accumulate(&mut self, game_minutes: f64) -> GameMinutes {
        if !game_minutes.is_finite() || game_minutes <= 0.0 {
            return 0;
        }
        self.accumulated_fraction += game_minutes;
        // Snap values a rounding error short of a whole minute.
        let whole = (self.accumulated_fraction + ACCUMULATOR_EPSILON).floor();
        self.accumulated_fraction = (self.accumulated_fraction - whole).max(0.0);
        whole as GameMinutes
    }

    pub(crate) fn set_accumulated_fraction(&mut self, fraction: f64) {
        self.accumulated_fraction = if fraction.is_finite() {
            fraction.clamp(0.0, 1.0 - f64::EPSILON)
        } else {
            0.0
        };
    }
}

impl Default for GameClock {
    fn default() -> Self {
        Self::new(Epoch::default())
    }
}
