//! Gregorian calendar arithmetic.
//!
//! Pure functions only. The clock owns the state; this module only
//! answers questions about years and months.

use serde::{Deserialize, Serialize};

/// Latest year the clock can represent. Restored data beyond it is
/// clamped and the clock holds at the last minute of this year.
pub const MAX_YEAR: u32 = 9999;

const MONTH_NAMES: [&str; 12] = [
    "January", "February", "March",     "April",   "May",      "June",
    "July",    "August",   "September", "October", "November", "December",
];

/// Divisible by 4, not by 100, unless also by 400.
pub fn is_leap_year(year: u32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// Day count for `month` (1..=12) of `year`. Returns 0 for an
/// out-of-range month so callers can treat it as "no such month".
pub fn days_in_month(month: u32, year: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11              => 30,
        2 if is_leap_year(year)     => 29,
        2                           => 28,
        _                           => 0,
    }
}

pub fn days_in_year(year: u32) -> u32 {
    if is_leap_year(year) { 366 } else { 365 }
}

/// Days from 0001-01-01 to January 1st of `year`.
pub fn days_before_year(year: u32) -> u64 {
    let y = year.saturating_sub(1) as u64;
    y * 365 + y / 4 - y / 100 + y / 400
}

/// Whether (year, month, day) names a real calendar day.
pub fn is_valid_date(year: u32, month: u32, day: u32) -> bool {
    year >= 1 && (1..=12).contains(&month) && day >= 1 && day <= days_in_month(month, year)
}

pub fn month_name(month: u32) -> &'static str {
    month
        .checked_sub(1)
        .and_then(|i| MONTH_NAMES.get(i as usize))
        .copied()
        .unwrap_or("Unknown")
}

pub fn month_short_name(month: u32) -> &'static str {
    let name = month_name(month);
    name.get(..3).unwrap_or(name)
}

/// Week of the month, 1-based: days 1..=7 are week 1.
pub fn week_of_month(day: u32) -> u32 {
    day.div_ceil(7)
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Autumn,
}

impl Season {
    /// Meteorological seasons: Dec–Feb winter, Mar–May spring, and so on.
    pub fn for_month(month: u32) -> Self {
        match month {
            3..=5  => Self::Spring,
            6..=8  => Self::Summer,
            9..=11 => Self::Autumn,
            _      => Self::Winter,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Winter => "Winter",
            Self::Spring => "Spring",
            Self::Summer => "Summer",
            Self::Autumn => "Autumn",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn century_rule() {
        assert!(is_leap_year(2000));
        assert!(!is_leap_year(1900));
        assert!(is_leap_year(2024));
        assert!(!is_leap_year(2023));
        assert!(!is_leap_year(1111));
        assert!(is_leap_year(1112));
    }

    #[test]
    fn february_follows_leap_rule() {
        assert_eq!(days_in_month(2, 2024), 29);
        assert_eq!(days_in_month(2, 1900), 28);
        assert_eq!(days_in_month(2, 2000), 29);
        assert_eq!(days_in_month(13, 2000), 0);
        assert_eq!(days_in_month(0, 2000), 0);
    }

    #[test]
    fn days_before_year_matches_summing_every_year() {
        let mut summed = 0u64;
        for year in 1..=MAX_YEAR {
            assert_eq!(days_before_year(year), summed, "year {year}");
            summed += days_in_year(year) as u64;
        }
        assert_eq!(days_before_year(0), 0);
    }

    #[test]
    fn month_table_sums_to_year_length() {
        for year in [1111, 1112, 1900, 2000] {
            let total: u32 = (1..=12).map(|m| days_in_month(m, year)).sum();
            assert_eq!(total, days_in_year(year), "year {year}");
        }
    }

    #[test]
    fn names_and_weeks() {
        assert_eq!(month_name(4), "April");
        assert_eq!(month_short_name(9), "Sep");
        assert_eq!(month_name(0), "Unknown");
        assert_eq!(week_of_month(1), 1);
        assert_eq!(week_of_month(7), 1);
        assert_eq!(week_of_month(8), 2);
        assert_eq!(week_of_month(31), 5);
        assert_eq!(Season::for_month(12), Season::Winter);
        assert_eq!(Season::for_month(4), Season::Spring);
    }
}
