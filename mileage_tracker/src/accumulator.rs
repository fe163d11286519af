use chrono::{DateTime, Utc};
use mileage_tracker_lib::{geo_util::fix_distance_miles, position_fix::PositionFix};

use crate::TrackerError;

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum FixOutcome {
    /// First fix of a trip. Only seeds the previous position.
    Seeded,
    Accumulated(f64),
    /// Jitter. The previous position is kept so slow drift still adds up.
    BelowNoiseFloor,
    /// Older than a fix already seen.
    OutOfOrder,
    /// Arrived while no trip was being tracked.
    Dropped,
}

impl FixOutcome {
    pub fn delta_miles(&self) -> f64 {
        match self {
            FixOutcome::Accumulated(delta) => *delta,
            _ => 0.,
        }
    }
}

/// Distance contributed by `current` given the last accepted fix.
pub fn distance_delta(previous: Option<&PositionFix>, current: &PositionFix, noise_floor_miles: f64) -> f64 {
    let Some(previous) = previous else {
        return 0.;
    };

    if previous.same_coordinates(current) {
        return 0.;
    }

    let delta = fix_distance_miles(previous, current);
    if delta > noise_floor_miles {
        delta
    } else {
        0.
    }
}

/// Turns a stream of fixes into a monotonic cumulative distance.
#[derive(Debug, Clone)]
pub struct DistanceAccumulator {
    previous: Option<PositionFix>,
    latest_timestamp: Option<DateTime<Utc>>,
    total_miles: f64,
    noise_floor_miles: f64,
    fix_count: u64,
}

impl DistanceAccumulator {
    pub fn new(noise_floor_miles: f64) -> Self {
        Self {
            previous: None,
            latest_timestamp: None,
            total_miles: 0.,
            noise_floor_miles,
            fix_count: 0,
        }
    }

    pub fn total_miles(&self) -> f64 {
        self.total_miles
    }

    /// Number of fixes that made it past validation and ordering.
    pub fn fix_count(&self) -> u64 {
        self.fix_count
    }

    pub fn previous(&self) -> Option<&PositionFix> {
        self.previous.as_ref()
    }

    /// A malformed fix is rejected with a `TrackingFault` and leaves the state untouched.
    pub fn on_fix(&mut self, fix: PositionFix) -> Result<FixOutcome, TrackerError> {
        fix.validate().map_err(|e| TrackerError::TrackingFault(e.to_string()))?;

        if let Some(latest) = self.latest_timestamp {
            if fix.timestamp < latest {
                return Ok(FixOutcome::OutOfOrder);
            }
        }
        self.latest_timestamp = Some(fix.timestamp);
        self.fix_count += 1;

        if self.previous.is_none() {
            self.previous = Some(fix);
            return Ok(FixOutcome::Seeded);
        }

        let delta = distance_delta(self.previous.as_ref(), &fix, self.noise_floor_miles);
        if delta == 0. {
            return Ok(FixOutcome::BelowNoiseFloor);
        }

        self.total_miles += delta;
        self.previous = Some(fix);
        Ok(FixOutcome::Accumulated(delta))
    }
}
