//! Racecore - vehicle dynamics and track interaction for an arcade racer
//!
//! Core modules:
//! - `sim`: Deterministic simulation (vehicle, track, elevation, laps, collisions)
//! - `tuning`: Data-driven vehicle handling constants
//! - `layout`: Track, ramp, bridge and hill placement
//! - `error`: Configuration errors raised while building a circuit

pub mod error;
pub mod layout;
pub mod sim;
pub mod tuning;

pub use error::ConfigError;
pub use layout::{Circuit, TrackLayout};
pub use tuning::VehicleTuning;

use glam::{Vec2, Vec3};

/// Simulation configuration constants
pub mod consts {
    /// Fixed simulation timestep (120 Hz)
    pub const SIM_DT: f32 = 1.0 / 120.0;
    /// Largest frame delta fed into the accumulator per call (spiral of death guard)
    pub const MAX_FRAME_DELTA: f32 = 0.1;

    /// Generic epsilon for length and division guards
    pub const EPSILON: f32 = 1e-6;

    /// Fraction of the track length past which an arclength counts as "near the end"
    pub const LAP_WRAP_HIGH: f32 = 0.65;
    /// Fraction of the track length below which an arclength counts as "near the start"
    pub const LAP_WRAP_LOW: f32 = 0.35;
    /// Forward speed required before a wrap can count as a lap (m/s)
    pub const LAP_MIN_FORWARD_SPEED: f32 = 4.0;
    /// Shortest plausible lap (seconds)
    pub const LAP_MIN_SECONDS: f32 = 5.0;
}

/// Normalized angle to [-π, π)
#[inline]
pub fn normalize_angle(mut angle: f32) -> f32 {
    use std::f32::consts::PI;
    if !angle.is_finite() {
        return 0.0;
    }
    while angle >= PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}

#[inline]
pub fn clamp01(t: f32) -> f32 {
    t.clamp(0.0, 1.0)
}

/// Ease-in-out cubic on [0, 1]
#[inline]
pub fn ease_in_out_cubic(t: f32) -> f32 {
    let t = clamp01(t);
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

/// Derivative of [`ease_in_out_cubic`] with respect to `t`
#[inline]
pub fn ease_in_out_cubic_slope(t: f32) -> f32 {
    let t = clamp01(t);
    if t < 0.5 {
        12.0 * t * t
    } else {
        3.0 * (-2.0 * t + 2.0).powi(2)
    }
}

/// Project a world position onto the ground plane (x, z)
#[inline]
pub fn planar(p: Vec3) -> Vec2 {
    Vec2::new(p.x, p.z)
}

/// Lift a ground-plane vector back into world space at height `y`
#[inline]
pub fn lift(p: Vec2, y: f32) -> Vec3 {
    Vec3::new(p.x, y, p.y)
}

/// Planar forward direction for a yaw angle (yaw 0 faces +z)
#[inline]
pub fn heading(yaw: f32) -> Vec2 {
    Vec2::new(yaw.sin(), yaw.cos())
}

/// Planar right-hand direction for a yaw angle; increasing yaw turns toward it
#[inline]
pub fn right_of(yaw: f32) -> Vec2 {
    Vec2::new(yaw.cos(), -yaw.sin())
}

/// Yaw angle whose [`heading`] points along `dir`
#[inline]
pub fn yaw_of(dir: Vec2) -> f32 {
    dir.x.atan2(dir.y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, PI};

    #[test]
    fn test_ease_endpoints_and_midpoint() {
        assert_eq!(ease_in_out_cubic(0.0), 0.0);
        assert_eq!(ease_in_out_cubic(1.0), 1.0);
        assert!((ease_in_out_cubic(0.5) - 0.5).abs() < 1e-6);
        // Clamped outside [0, 1]
        assert_eq!(ease_in_out_cubic(-3.0), 0.0);
        assert_eq!(ease_in_out_cubic(7.0), 1.0);
    }

    #[test]
    fn test_ease_slope_flat_at_ends() {
        assert_eq!(ease_in_out_cubic_slope(0.0), 0.0);
        assert_eq!(ease_in_out_cubic_slope(1.0), 0.0);
        assert!((ease_in_out_cubic_slope(0.5) - 3.0).abs() < 1e-5);
    }

    #[test]
    fn test_heading_and_right_are_orthonormal() {
        for yaw in [0.0, 0.3, FRAC_PI_2, -2.0, PI] {
            let f = heading(yaw);
            let r = right_of(yaw);
            assert!((f.length() - 1.0).abs() < 1e-5);
            assert!(f.dot(r).abs() < 1e-5);
            assert!((yaw_of(f) - normalize_angle(yaw)).abs() < 1e-4 || (yaw - PI).abs() < 1e-4);
        }
    }

    #[test]
    fn test_normalize_angle() {
        assert!((normalize_angle(3.0 * PI) - (-PI)).abs() < 1e-5);
        assert!((normalize_angle(-3.0 * FRAC_PI_2) - FRAC_PI_2).abs() < 1e-5);
        assert_eq!(normalize_angle(f32::NAN), 0.0);
    }
}
