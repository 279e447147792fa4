//! Shared primitive types used across the time core.

/// A count of in-game minutes. One tick = one in-game minute boundary.
pub type GameMinutes = u64;

/// Real elapsed time between two frames, in milliseconds.
pub type RealMillis = f64;

pub const MINUTES_PER_HOUR: u64 = 60;
pub const HOURS_PER_DAY: u64 = 24;
pub const MINUTES_PER_DAY: u64 = MINUTES_PER_HOUR * HOURS_PER_DAY;
