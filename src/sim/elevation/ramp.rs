//! Launch ramps
//!
//! A ramp is a rectangle in the ground plane whose height rises along its
//! forward axis on an ease-in-out cubic. The top 15% is the launch edge.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use super::{ElevationSample, ElevationSource, LaunchEdge, STEP_HEIGHT, SideContact, SideKind, SurfacePatch, slope_normal};
use crate::error::{ConfigError, require_positive};
use crate::{ease_in_out_cubic, ease_in_out_cubic_slope, heading, planar, right_of};

/// Longitudinal fraction past which the ramp counts as its launch edge
pub const LAUNCH_FRACTION: f32 = 0.85;
/// Half-angle of the approach cone that may launch (rad)
pub const APPROACH_CONE: f32 = std::f32::consts::FRAC_PI_3;
/// Width of the wall band beyond each ramp side (m)
pub const SIDE_MARGIN: f32 = 0.6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ramp {
    pub center: Vec2,
    /// Yaw of the uphill direction
    pub rotation: f32,
    pub half_width: f32,
    pub half_length: f32,
    pub height: f32,
    pub launch_fraction: f32,
    /// Cosine of the approach cone half-angle
    pub approach_cos: f32,
}

impl Ramp {
    pub fn new(center: Vec2, rotation: f32, width: f32, length: f32, height: f32) -> Result<Self, ConfigError> {
        require_positive("ramp width", width)?;
        require_positive("ramp length", length)?;
        require_positive("ramp height", height)?;
        if !center.is_finite() || !rotation.is_finite() {
            return Err(ConfigError::InvalidValue {
                what: "ramp placement",
                value: rotation,
            });
        }
        Ok(Self {
            center,
            rotation,
            half_width: width * 0.5,
            half_length: length * 0.5,
            height,
            launch_fraction: LAUNCH_FRACTION,
            approach_cos: APPROACH_CONE.cos(),
        })
    }

    /// Override the launch fraction and the approach cone half-angle (rad)
    pub fn with_launch_window(mut self, launch_fraction: f32, approach_cone: f32) -> Result<Self, ConfigError> {
        if !(launch_fraction.is_finite() && (0.0..1.0).contains(&launch_fraction)) {
            return Err(ConfigError::InvalidValue {
                what: "ramp launch fraction",
                value: launch_fraction,
            });
        }
        require_positive("ramp approach cone", approach_cone)?;
        self.launch_fraction = launch_fraction;
        self.approach_cos = approach_cone.min(std::f32::consts::PI).cos();
        Ok(self)
    }

    /// Uphill direction in the ground plane
    pub fn forward(&self) -> Vec2 {
        heading(self.rotation)
    }

    /// Surface height at longitudinal parameter `t` in [0, 1]
    pub fn height_at(&self, t: f32) -> f32 {
        ease_in_out_cubic(t) * self.height
    }

    /// Average inclination from foot to top (rad)
    pub fn launch_angle(&self) -> f32 {
        self.height.atan2(self.half_length * 2.0)
    }

    /// Position in ramp space: (lateral, longitudinal)
    fn to_local(&self, p: Vec2) -> Vec2 {
        let d = p - self.center;
        Vec2::new(d.dot(right_of(self.rotation)), d.dot(self.forward()))
    }
}

impl ElevationSource for Ramp {
    fn query(&self, position: Vec3, yaw: f32) -> ElevationSample {
        let local = self.to_local(planar(position));
        if local.y.abs() > self.half_length {
            return ElevationSample::None;
        }

        let t = (local.y + self.half_length) / (self.half_length * 2.0);
        let height = self.height_at(t);
        let forward = self.forward();

        if local.x.abs() <= self.half_width {
            let slope = ease_in_out_cubic_slope(t) * self.height / (self.half_length * 2.0);
            let mut patch = SurfacePatch {
                height,
                normal: slope_normal(forward, slope),
                elevated: true,
                launch: None,
            };

            // Already well above the deck: nothing to launch from or bump into
            if t > self.launch_fraction && position.y <= height + STEP_HEIGHT {
                if heading(yaw).dot(forward) >= self.approach_cos {
                    patch.launch = Some(LaunchEdge {
                        direction: forward,
                        angle: self.launch_angle(),
                    });
                } else {
                    // Coming at the tall end from the wrong way: it is a wall
                    return ElevationSample::Side(SideContact {
                        kind: SideKind::Ramp,
                        normal: forward,
                        penetration: self.half_length - local.y,
                    });
                }
            }
            return ElevationSample::Surface(patch);
        }

        let side_limit = self.half_width + SIDE_MARGIN;
        if local.x.abs() <= side_limit && height > position.y + STEP_HEIGHT {
            let outward = right_of(self.rotation) * local.x.signum();
            return ElevationSample::Side(SideContact {
                kind: SideKind::Ramp,
                normal: outward,
                penetration: side_limit - local.x.abs(),
            });
        }

        ElevationSample::None
    }
}
