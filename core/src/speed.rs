//! Speed controller — owns the rate mode and the pause flag.
//!
//! `is_paused` is stored for cheap reads but is only ever written
//! together with `mode`, so the two cannot diverge.

use crate::{
    error::{SimError, SimResult},
    subsystem::TravelHook,
};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SpeedMode {
    Paused,
    Normal,    //  2 game-min per real second
    Fast,      // 10 game-min per real second
    VeryFast,  // 30 game-min per real second
}

impl SpeedMode {
    pub const ALL: [SpeedMode; 4] = [Self::Paused, Self::Normal, Self::Fast, Self::VeryFast];

    /// In-game minutes per real second.
    pub fn minutes_per_real_second(&self) -> f64 {
        match self {
            Self::Paused   => 0.0,
            Self::Normal   => 2.0,
            Self::Fast     => 10.0,
            Self::VeryFast => 30.0,
        }
    }

    pub fn id(&self) -> &'static str {
        match self {
            Self::Paused   => "paused",
            Self::Normal   => "normal",
            Self::Fast     => "fast",
            Self::VeryFast => "very_fast",
        }
    }
}

impl fmt::Display for SpeedMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for SpeedMode {
    type Err = SimError;

    fn from_str(s: &str) -> SimResult<Self> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.id().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| SimError::InvalidMode(s.to_string()))
    }
}

/// The outcome of a mode transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpeedChange {
    pub from:           SpeedMode,
    pub to:             SpeedMode,
    pub travel_resumed: bool,
}

impl SpeedChange {
    pub fn changed(&self) -> bool {
        self.from != self.to
    }

    pub fn unpaused(&self) -> bool {
        self.from == SpeedMode::Paused && self.to != SpeedMode::Paused
    }

    pub fn paused(&self) -> bool {
        self.from != SpeedMode::Paused && self.to == SpeedMode::Paused
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpeedController {
    mode:        SpeedMode,
    is_paused:   bool,
    last_active: Option<SpeedMode>,
}

impl SpeedController {
    /// Starts paused so the player can read the intro.
    pub fn new() -> Self {
        Self::with_mode(SpeedMode::Paused)
    }

    pub fn with_mode(mode: SpeedMode) -> Self {
        Self {
            mode,
            is_paused: mode == SpeedMode::Paused,
            last_active: (mode != SpeedMode::Paused).then_some(mode),
        }
    }

    pub fn mode(&self) -> SpeedMode { self.mode }
    pub fn is_paused(&self) -> bool { self.is_paused }
    pub fn last_active(&self) -> Option<SpeedMode> { self.last_active }

    pub fn rate_multiplier(&self) -> f64 {
        self.mode.minutes_per_real_second()
    }

    /// Switch mode. Leaving `Paused` with a pending destination and no
    /// journey underway asks the travel collaborator to resume, once.
    pub fn set_mode(
        &mut self,
        mode: SpeedMode,
        travel: Option<&mut (dyn TravelHook + 'static)>,
    ) -> SpeedChange {
        let from = self.mode;
        self.mode = mode;
        self.is_paused = mode == SpeedMode::Paused;
        if mode != SpeedMode::Paused {
            self.last_active = Some(mode);
        }

        let mut change = SpeedChange { from, to: mode, travel_resumed: false };
        if change.unpaused() {
            if let Some(travel) = travel {
                if travel.has_pending_destination() && !travel.is_travelling() {
                    log::info!("speed: unpaused with pending destination, resuming travel");
                    travel.resume_or_auto_start();
                    change.travel_resumed = true;
                }
            }
        }

        log::debug!("speed: {from} -> {mode}");
        change
    }

    /// Parse a mode identifier, then switch.
    pub fn set_mode_str(
        &mut self,
        id: &str,
        travel: Option<&mut (dyn TravelHook + 'static)>,
    ) -> SimResult<SpeedChange> {
        let mode: SpeedMode = id.parse()?;
        Ok(self.set_mode(mode, travel))
    }

    /// Flip between `Paused` and the last running mode (`Normal` if none).
    pub fn toggle(&mut self, travel: Option<&mut (dyn TravelHook + 'static)>) -> SpeedChange {
        let next = if self.is_paused {
            self.last_active.unwrap_or(SpeedMode::Normal)
        } else {
            SpeedMode::Paused
        };
        self.set_mode(next, travel)
    }

    /// Restore persisted state without firing the travel hook.
    pub(crate) fn restore(&mut self, mode: SpeedMode) {
        self.mode = mode;
        self.is_paused = mode == SpeedMode::Paused;
        if mode != SpeedMode::Paused {
            self.last_active = Some(mode);
        }
    }
}

impl Default for SpeedController {
    fn default() -> Self { Self::new() }
}
