use crate::position_fix::PositionFix;

/// Mean earth radius in statute miles, as used by common haversine packages.
pub const EARTH_RADIUS_MILES: f64 = 3960.0;

/// Great-circle distance between two `(latitude, longitude)` pairs in degrees, in miles.
pub fn haversine_miles(p1: (f64, f64), p2: (f64, f64)) -> f64 {
    let d_lat = (p2.0 - p1.0).to_radians();
    let d_lon = (p2.1 - p1.1).to_radians();
    let lat1 = p1.0.to_radians();
    let lat2 = p2.0.to_radians();

    let a = f64::sin(d_lat / 2.).powi(2)
        + f64::cos(lat1) * f64::cos(lat2) * f64::sin(d_lon / 2.).powi(2);
    let c = 2. * f64::atan2(f64::sqrt(a), f64::sqrt(1. - a));

    EARTH_RADIUS_MILES * c
}

pub fn fix_distance_miles(from: &PositionFix, to: &PositionFix) -> f64 {
    haversine_miles((from.latitude(), from.longitude()), (to.latitude(), to.longitude()))
}

/// Rounds to the two decimals the backend stores mileage with.
pub fn round_miles(miles: f64) -> f64 {
    (miles * 100.).round() / 100.
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hundredth_degree_at_equator() {
        let d = haversine_miles((0., 0.), (0., 0.01));
        assert!((d - 0.6911).abs() < 0.001, "got {d}");
        assert_eq!(round_miles(d), 0.69);
    }

    #[test]
    fn same_point_is_zero() {
        assert_eq!(haversine_miles((55.67, 12.56), (55.67, 12.56)), 0.);
    }

    #[test]
    fn symmetric() {
        let a = (40.7128, -74.006);
        let b = (34.0522, -118.2437);
        let d1 = haversine_miles(a, b);
        let d2 = haversine_miles(b, a);
        assert!((d1 - d2).abs() < 1e-9);
        // New York to Los Angeles is roughly 2450 miles
        assert!((2400.0..2500.0).contains(&d1), "got {d1}");
    }
}
