use std::fmt;

pub mod accumulator;
pub mod api;
pub mod clock;
pub mod config;
pub mod location;
pub mod session;
pub mod submission;
mod tracker;

pub use tracker::*;

/// Deltas at or below this many miles are treated as GPS jitter.
pub const DEFAULT_NOISE_FLOOR_MILES: f64 = 0.0001;
pub const DEFAULT_DISPLAY_TICK_MS: u64 = 1000;
pub const DEFAULT_PURPOSE: &str = "Tracked Trip";

#[derive(Debug, Clone, PartialEq)]
pub enum TrackerError {
    PermissionDenied,
    TrackingFault(String),
    Location(String),
    Submission(String),
    Config(String),
}

impl fmt::Display for TrackerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackerError::PermissionDenied => write!(f, "Location permission was not granted"),
            TrackerError::TrackingFault(msg) => write!(f, "Tracking fault: {msg}"),
            TrackerError::Location(msg) => write!(f, "Location source error: {msg}"),
            TrackerError::Submission(msg) => write!(f, "Failed to save mileage: {msg}"),
            TrackerError::Config(msg) => write!(f, "Configuration error: {msg}"),
        }
    }
}

impl std::error::Error for TrackerError {}
