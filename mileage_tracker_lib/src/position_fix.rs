use chrono::{DateTime, Utc};
use geo_types::Point;
use serde::{Deserialize, Serialize};

/// A single location sample as delivered by a location source.
/// The position is stored as `x = longitude`, `y = latitude`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionFix {
    pub position: Point,
    pub timestamp: DateTime<Utc>,
}

impl PositionFix {
    pub fn new(latitude: f64, longitude: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            position: Point::new(longitude, latitude),
            timestamp,
        }
    }

    pub fn now(latitude: f64, longitude: f64) -> Self {
        Self::new(latitude, longitude, Utc::now())
    }

    pub fn latitude(&self) -> f64 {
        self.position.y()
    }

    pub fn longitude(&self) -> f64 {
        self.position.x()
    }

    pub fn same_coordinates(&self, other: &PositionFix) -> bool {
        self.latitude() == other.latitude() && self.longitude() == other.longitude()
    }

    /// Checks that the coordinates can be fed into a distance computation.
    pub fn validate(&self) -> Result<(), &'static str> {
        let (lat, lon) = (self.latitude(), self.longitude());
        if !lat.is_finite() || !lon.is_finite() {
            return Err("Coordinate is not a finite number");
        }
        if !(-90.0..=90.0).contains(&lat) {
            return Err("Latitude out of range");
        }
        if !(-180.0..=180.0).contains(&lon) {
            return Err("Longitude out of range");
        }
        Ok(())
    }
}

#[test]
fn accessors_follow_lat_lon_order() {
    let fix = PositionFix::now(56.15, 10.2);
    assert_eq!(fix.latitude(), 56.15);
    assert_eq!(fix.longitude(), 10.2);
    assert!(fix.validate().is_ok());
}

#[test]
fn rejects_malformed_coordinates() {
    assert!(PositionFix::now(f64::NAN, 0.).validate().is_err());
    assert!(PositionFix::now(0., f64::INFINITY).validate().is_err());
    assert!(PositionFix::now(91., 0.).validate().is_err());
    assert!(PositionFix::now(0., -180.5).validate().is_err());
    assert!(PositionFix::now(-90., 180.).validate().is_ok());
}
