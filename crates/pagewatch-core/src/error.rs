use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid target '{id}': {reason}")]
    InvalidTarget { id: String, reason: String },

    #[error("Invalid time of day '{0}': expected HH:MM")]
    InvalidTimeOfDay(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
