//! Great-circle helpers on a spherical Earth.
//!
//! Points are `(lat, lon)` pairs in degrees throughout the crate.

use std::f64::consts::PI;

/// Mean Earth radius used for every distance in the crate (meters)
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Haversine distance in meters between two `(lat, lon)` points.
///
/// Non-finite input yields `f64::INFINITY` so that any threshold test
/// built on top of it fails closed.
pub fn distance(p1: (f64, f64), p2: (f64, f64)) -> f64 {
    haversine_distance(p1.0, p1.1, p2.0, p2.1)
}

pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    if !(lat1.is_finite() && lon1.is_finite() && lat2.is_finite() && lon2.is_finite()) {
        return f64::INFINITY;
    }
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).max(0.0).sqrt());
    EARTH_RADIUS_M * c
}

/// Initial bearing from `p1` towards `p2` in radians, range (-π, π].
///
/// 0 is north, π/2 is east.
pub fn bearing(p1: (f64, f64), p2: (f64, f64)) -> f64 {
    let lat1 = p1.0.to_radians();
    let lat2 = p2.0.to_radians();
    let d_lon = (p2.1 - p1.1).to_radians();

    let y = d_lon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * d_lon.cos();
    let theta = y.atan2(x);

    if theta <= -PI {
        theta + 2.0 * PI
    } else {
        theta
    }
}

/// Move `origin` by a local east/north offset in meters (equirectangular).
///
/// Accurate to well under a centimeter for the tens-of-meters offsets used
/// when laying out trails around a reference point.
pub fn offset_meters(origin: (f64, f64), east_m: f64, north_m: f64) -> (f64, f64) {
    let d_lat = north_m / EARTH_RADIUS_M;
    let d_lon = east_m / (EARTH_RADIUS_M * origin.0.to_radians().cos());
    (origin.0 + d_lat.to_degrees(), origin.1 + d_lon.to_degrees())
}
