use crate::{
    clock::Epoch,
    error::{SimError, SimResult},
    speed::SpeedMode,
    types::RealMillis,
};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const CONFIG_FILE: &str = "engine.json";

/// Largest real delta a single frame may apply. Stops a backgrounded
/// tab from landing hours of game time in one frame.
pub const DEFAULT_MAX_FRAME_DELTA_MS: RealMillis = 100.0;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub epoch:              Epoch,
    pub max_frame_delta_ms: RealMillis,
    pub starting_mode:      SpeedMode,
    /// First hour (inclusive) counted as daytime.
    pub daytime_start_hour: u32,
    /// First hour (exclusive) counted as night again.
    pub daytime_end_hour:   u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            epoch:              Epoch::default(),
            max_frame_delta_ms: DEFAULT_MAX_FRAME_DELTA_MS,
            starting_mode:      SpeedMode::Paused,
            daytime_start_hour: 6,
            daytime_end_hour:   20,
        }
    }
}

impl EngineConfig {
    /// Load `engine.json` from `data_dir`. A missing file means defaults;
    /// a present but malformed one is an error.
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let path = Path::new(data_dir).join(CONFIG_FILE);
        if !path.exists() {
            log::info!("config: {} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config = Self::from_json(&content)
            .with_context(|| format!("Invalid configuration in {}", path.display()))?;
        log::info!("config: loaded {}", path.display());
        Ok(config)
    }

    pub fn from_json(content: &str) -> SimResult<Self> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> SimResult<()> {
        self.epoch.validate()?;

        if !(self.max_frame_delta_ms.is_finite() && self.max_frame_delta_ms > 0.0) {
            return Err(SimError::InvalidConfig(format!(
                "max_frame_delta_ms must be positive, got {}",
                self.max_frame_delta_ms
            )));
        }
        if self.daytime_start_hour >= self.daytime_end_hour || self.daytime_end_hour > 24 {
            return Err(SimError::InvalidConfig(format!(
                "daytime hours {}..{} are not a valid range",
                self.daytime_start_hour, self.daytime_end_hour
            )));
        }
        Ok(())
    }
}
