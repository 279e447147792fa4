use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown speed mode '{0}'")]
    InvalidMode(String),

    #[error("Invalid epoch {year:04}-{month:02}-{day:02} {hour:02}:{minute:02}: {reason}")]
    InvalidEpoch {
        year:   i64,
        month:  i64,
        day:    i64,
        hour:   i64,
        minute: i64,
        reason: &'static str,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Clock advance requested while the update cascade is running")]
    ReentrantAdvance,

    #[error("Cannot skip {minutes} minutes at once (limit {max})")]
    SkipTooLong { minutes: u64, max: u64 },

    #[error("Step '{step}' failed: {reason}")]
    StepFailed { step: String, reason: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type SimResult<T> = Result<T, SimError>;
