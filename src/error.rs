//! Errors surfaced to the control surface

use thiserror::Error;

/// Settings that cannot start a session
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("no cast key configured")]
    MissingCastKey,
    #[error("unknown {field} key '{key}'")]
    UnknownKey { field: &'static str, key: String },
    #[error("no template images configured")]
    NoImagePaths,
    #[error("none of the {0} template images could be read")]
    NoReadableTemplates(usize),
    #[error("confidence threshold {0} is outside 0.0..=1.0")]
    ConfidenceOutOfRange(f64),
    #[error("difference threshold {0} is outside 0..=255")]
    DiffThresholdOutOfRange(f64),
    #[error("anti-idle interval {min}..{max} minutes is invalid")]
    InvalidAntiIdleRange { min: u32, max: u32 },
}

/// Session lifecycle errors
#[derive(Debug, Error)]
pub enum ControlError {
    #[error("a fishing session is already running")]
    AlreadyRunning,
    #[error("failed to spawn fishing worker: {0}")]
    Spawn(#[from] std::io::Error),
}
