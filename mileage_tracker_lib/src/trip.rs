use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Read-only view of a trip in progress, suitable for display.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub distance_miles: f64,
    pub elapsed_seconds: u64,
    pub fix_count: u64,
    pub active: bool,
}

/// The frozen result of a completed trip, handed to the caller on stop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TripSummary {
    pub started_at: DateTime<Utc>,
    pub stopped_at: DateTime<Utc>,
    pub distance_miles: f64,
    pub duration_seconds: f64,
}

impl TripSummary {
    pub fn new(started_at: DateTime<Utc>, stopped_at: DateTime<Utc>, distance_miles: f64) -> Self {
        let duration_seconds = (stopped_at - started_at)
            .num_milliseconds()
            .max(0) as f64
            / 1000.;

        Self {
            started_at,
            stopped_at,
            distance_miles,
            duration_seconds,
        }
    }
}

/// Formats seconds as `h:mm:ss`.
pub fn format_elapsed(seconds: u64) -> String {
    let h = seconds / 3600;
    let m = (seconds % 3600) / 60;
    let s = seconds % 60;
    format!("{h}:{m:02}:{s:02}")
}

#[test]
fn summary_duration_is_fractional_seconds() {
    let start = DateTime::from_timestamp_millis(1_700_000_000_000).unwrap();
    let stop = DateTime::from_timestamp_millis(1_700_000_120_500).unwrap();
    let summary = TripSummary::new(start, stop, 0.69);
    assert_eq!(summary.duration_seconds, 120.5);
}

#[test]
fn clock_skew_never_gives_negative_duration() {
    let start = DateTime::from_timestamp(1_700_000_100, 0).unwrap();
    let stop = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
    assert_eq!(TripSummary::new(start, stop, 0.).duration_seconds, 0.);
}

#[test]
fn elapsed_format() {
    assert_eq!(format_elapsed(0), "0:00:00");
    assert_eq!(format_elapsed(3725), "1:02:05");
}
