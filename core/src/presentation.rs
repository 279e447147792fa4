//! Read-only views for the UI. Nothing here mutates state.

use crate::{
    calendar::{month_name, month_short_name, Season},
    clock::GameClock,
    config::EngineConfig,
    speed::SpeedController,
    types::GameMinutes,
};
use serde::Serialize;

/// "8:00 AM", "12:05 PM", "12:00 AM" for midnight.
pub fn format_time(hour: u32, minute: u32) -> String {
    let suffix = if hour < 12 { "AM" } else { "PM" };
    let display_hour = match hour % 12 {
        0 => 12,
        h => h,
    };
    format!("{display_hour}:{minute:02} {suffix}")
}

/// "April 1, 1111"
pub fn format_date(clock: &GameClock) -> String {
    format!("{} {}, {}", month_name(clock.month()), clock.day(), clock.year())
}

/// "Apr 1, 1111"
pub fn format_short_date(clock: &GameClock) -> String {
    format!("{} {}, {}", month_short_name(clock.month()), clock.day(), clock.year())
}

/// "April 1, 1111 - 8:00 AM"
pub fn format_datetime(clock: &GameClock) -> String {
    format!("{} - {}", format_date(clock), format_time(clock.hour(), clock.minute()))
}

/// Snapshot handed to the UI each frame.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimeInfo {
    pub year:            u32,
    pub month:           u32,
    pub day:             u32,
    pub hour:            u32,
    pub minute:          u32,
    pub week:            u32,
    pub month_name:      &'static str,
    pub season:          &'static str,
    pub day_of_week:     Option<String>,
    pub is_leap_year:    bool,
    pub days_in_month:   u32,
    pub formatted:       String,
    pub formatted_time:  String,
    pub speed:           &'static str,
    pub rate_multiplier: f64,
    pub is_paused:       bool,
    pub is_daytime:      bool,
    pub minutes_elapsed: GameMinutes,
}

impl TimeInfo {
    pub fn capture(clock: &GameClock, speed: &SpeedController, config: &EngineConfig) -> Self {
        let hour = clock.hour();
        Self {
            year:            clock.year(),
            month:           clock.month(),
            day:             clock.day(),
            hour,
            minute:          clock.minute(),
            week:            clock.week(),
            month_name:      month_name(clock.month()),
            season:          Season::for_month(clock.month()).name(),
            day_of_week:     clock.day_of_week().map(|d| d.to_string()),
            is_leap_year:    clock.is_leap_year(),
            days_in_month:   clock.days_in_month(),
            formatted:       format_datetime(clock),
            formatted_time:  format_time(hour, clock.minute()),
            speed:           speed.mode().id(),
            rate_multiplier: speed.rate_multiplier(),
            is_paused:       speed.is_paused(),
            is_daytime:      (config.daytime_start_hour..config.daytime_end_hour).contains(&hour),
            minutes_elapsed: clock.minutes_since(&config.epoch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn twelve_hour_formatting() {
        assert_eq!(format_time(0, 0), "12:00 AM");
        assert_eq!(format_time(8, 0), "8:00 AM");
        assert_eq!(format_time(12, 5), "12:05 PM");
        assert_eq!(format_time(23, 59), "11:59 PM");
    }

    #[test]
    fn default_epoch_formats() {
        let clock = GameClock::default();
        assert_eq!(format_datetime(&clock), "April 1, 1111 - 8:00 AM");
        assert_eq!(format_short_date(&clock), "Apr 1, 1111");
    }

    #[test]
    fn info_snapshot() {
        let clock = GameClock::default();
        let info = TimeInfo::capture(&clock, &SpeedController::new(), &EngineConfig::default());
        assert_eq!(info.month_name, "April");
        assert_eq!(info.season, "Spring");
        assert_eq!(info.speed, "paused");
        assert!(info.is_paused);
        assert!(info.is_daytime);
        assert_eq!(info.days_in_month, 30);
        assert_eq!(info.minutes_elapsed, 0);
        assert!(info.day_of_week.is_some());
    }
}
