use serde::{Deserialize, Serialize};
use crate::{speed::SpeedMode, types::GameMinutes};

/// Commands that change the clock or its speed.
/// Issued by the player, the IPC shell, or queued by cascade steps.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum ClockCommand {
    Pause,
    Resume,
    Toggle,
    SetSpeed { speed: SpeedMode },
    /// Jump ahead by whole minutes (resting, waiting at an inn).
    SkipMinutes { minutes: GameMinutes },
}
