//! Spherical-earth helpers (law of cosines, forward azimuth), distances in nautical miles.

use geo::{point, Point};

pub const EARTH_RADIUS_NM: f64 = 3440.064_79;
pub const FEET_PER_NM: f64 = 6076.0;

/// Great-circle distance between two coordinates, law of cosines.
pub fn distance_nm(a: Point, b: Point) -> f64 {
    if a == b {
        return 0.0;
    }
    let phi1 = a.y().to_radians();
    let phi2 = b.y().to_radians();
    let delta_lambda = (b.x() - a.x()).to_radians();

    let cos_angle = phi1.sin() * phi2.sin() + phi1.cos() * phi2.cos() * delta_lambda.cos();
    // rounding can push nearly identical points just above 1
    cos_angle.clamp(-1.0, 1.0).acos() * EARTH_RADIUS_NM
}

/// Initial true bearing from `a` to `b` in degrees, `[0, 360)`.
pub fn initial_bearing(a: Point, b: Point) -> f64 {
    let phi1 = a.y().to_radians();
    let phi2 = b.y().to_radians();
    let delta_lambda = (b.x() - a.x()).to_radians();

    let y = delta_lambda.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * delta_lambda.cos();
    let bearing = y.atan2(x).to_degrees();
    if bearing < 0.0 {
        bearing + 360.0
    } else {
        bearing
    }
}

/// Point reached from `origin` travelling `distance_nm` along the great circle with initial
/// bearing `bearing` (radians).
pub fn destination(origin: Point, bearing: f64, distance_nm: f64) -> Point {
    let delta = distance_nm / EARTH_RADIUS_NM;
    let phi1 = origin.y().to_radians();
    let lambda1 = origin.x().to_radians();

    let phi2 = (phi1.sin() * delta.cos() + phi1.cos() * delta.sin() * bearing.cos()).asin();
    let lambda2 = lambda1
        + (bearing.sin() * delta.sin() * phi1.cos()).atan2(delta.cos() - phi1.sin() * phi2.sin());

    let lng = (lambda2.to_degrees() + 540.0) % 360.0 - 180.0;
    point! { x: lng, y: phi2.to_degrees() }
}

pub fn feet_to_nm(feet: f64) -> f64 {
    feet / FEET_PER_NM
}
