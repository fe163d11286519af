use chrono::{DateTime, Utc};
use mileage_tracker_lib::{
    position_fix::PositionFix,
    trip::{SessionSnapshot, TripSummary},
};

use crate::{
    accumulator::{DistanceAccumulator, FixOutcome},
    TrackerError,
};

#[derive(Debug, Clone)]
pub enum SessionState {
    Idle,
    Tracking {
        started_at: DateTime<Utc>,
        accumulator: DistanceAccumulator,
    },
}

/// Start/stop lifecycle of a single trip. `Idle -> Tracking -> Idle`, no pause.
#[derive(Debug, Clone)]
pub struct TripSession {
    state: SessionState,
    noise_floor_miles: f64,
}

impl TripSession {
    pub fn new(noise_floor_miles: f64) -> Self {
        Self {
            state: SessionState::Idle,
            noise_floor_miles,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, SessionState::Tracking { .. })
    }

    /// Returns false, and changes nothing, if a trip is already being tracked.
    pub fn start(&mut self, now: DateTime<Utc>) -> bool {
        if self.is_active() {
            return false;
        }

        self.state = SessionState::Tracking {
            started_at: now,
            accumulator: DistanceAccumulator::new(self.noise_floor_miles),
        };
        true
    }

    /// Fixes that arrive while idle are dropped.
    pub fn apply_fix(&mut self, fix: PositionFix) -> Result<FixOutcome, TrackerError> {
        match &mut self.state {
            SessionState::Idle => Ok(FixOutcome::Dropped),
            SessionState::Tracking { accumulator, .. } => accumulator.on_fix(fix),
        }
    }

    pub fn stop(&mut self, now: DateTime<Utc>) -> Option<TripSummary> {
        match std::mem::replace(&mut self.state, SessionState::Idle) {
            SessionState::Idle => None,
            SessionState::Tracking { started_at, accumulator } => {
                Some(TripSummary::new(started_at, now, accumulator.total_miles()))
            }
        }
    }

    pub fn snapshot(&self, now: DateTime<Utc>) -> SessionSnapshot {
        match &self.state {
            SessionState::Idle => SessionSnapshot::default(),
            SessionState::Tracking { started_at, accumulator } => SessionSnapshot {
                distance_miles: accumulator.total_miles(),
                elapsed_seconds: (now - *started_at).num_seconds().max(0) as u64,
                fix_count: accumulator.fix_count(),
                active: true,
            },
        }
    }
}
