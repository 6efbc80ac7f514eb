//! Angle conventions, wind vector conversions, and the stability function.
//!
//! Wind directions follow the meteorological convention: degrees clockwise
//! from north, naming the direction the wind blows FROM. Internally vectors
//! use math convention, degrees counterclockwise from east.

use std::f64::consts::FRAC_PI_2;

use nalgebra::Vector3;

/// Convert a compass bearing (degrees clockwise from north) to math
/// convention (degrees counterclockwise from east).
#[must_use]
pub fn north_to_math(bearing: f64) -> f64 {
    debug_assert!((0.0..=360.0).contains(&bearing));
    let angle = 450.0 - bearing;
    if angle >= 360.0 { angle - 360.0 } else { angle }
}

/// Convert a math-convention angle back to a compass bearing.
#[must_use]
pub fn math_to_north(angle: f64) -> f64 {
    debug_assert!((0.0..=360.0).contains(&angle));
    let bearing = 450.0 - angle;
    if bearing >= 360.0 { bearing - 360.0 } else { bearing }
}

/// Build a velocity vector from speed, the compass bearing the flow moves
/// TOWARD, and a tilt above the horizontal (degrees).
#[must_use]
pub fn speed_dir_tilt_to_uvw(speed: f64, bearing: f64, tilt: f64) -> Vector3<f64> {
    let theta = north_to_math(bearing).to_radians();
    let polar = (90.0 - tilt).to_radians();
    Vector3::new(
        speed * theta.cos() * polar.sin(),
        speed * theta.sin() * polar.sin(),
        speed * polar.cos(),
    )
}

/// Decompose a velocity vector into (speed, compass bearing the flow moves
/// toward, tilt above horizontal). A zero vector reports bearing 90 and
/// zero tilt, the image of a zero math angle.
#[must_use]
pub fn uvw_to_speed_dir_tilt(v: &Vector3<f64>) -> (f64, f64, f64) {
    let speed = v.norm();
    let horizontal = v.x.hypot(v.y);
    let tilt = v.z.atan2(horizontal).to_degrees();
    let mut theta = v.y.atan2(v.x).to_degrees();
    if theta < 0.0 {
        theta += 360.0;
    }
    (speed, math_to_north(theta), tilt)
}

/// Horizontal (u, v) components of a wind given speed and the compass
/// direction it blows FROM.
#[must_use]
pub fn wind_speed_dir_to_uv(speed: f64, direction_from: f64) -> (f64, f64) {
    let theta = north_to_math(direction_from).to_radians();
    (-speed * theta.cos(), -speed * theta.sin())
}

/// Integrated similarity-theory stability function psi(z/L).
///
/// Stable side uses the exponential form of van Ulden and Holtslag;
/// unstable side uses the Paulson form. `l_switch` selects the branch:
/// positive Monin-Obukhov length is stable.
#[must_use]
pub fn stability_function(z_over_l: f64, l_switch: f64) -> f64 {
    if l_switch > 0.0 {
        -17.0 * (1.0 - (-0.29 * z_over_l).exp())
    } else if l_switch < 0.0 {
        let x = (1.0 - 16.0 * z_over_l).powf(0.25);
        2.0 * ((1.0 + x) / 2.0).ln() + ((1.0 + x * x) / 2.0).ln() - 2.0 * x.atan() + FRAC_PI_2
    } else {
        0.0
    }
}
