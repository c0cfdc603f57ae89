//! Vehicle state and simulation events
//!
//! Everything a renderer, camera or effects system reads from the core lives
//! here. All of it is plain data and serializable for snapshots.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use super::elevation::SideKind;
use crate::{heading, right_of};

/// Physical state of the car
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VehicleState {
    pub position: Vec3,
    pub velocity: Vec3,
    /// Heading (rad); yaw 0 faces +z
    pub yaw: f32,
    /// Nose-up tilt (rad), visual only
    pub pitch: f32,
    /// Smoothed steer in [-1, 1]
    pub steer_smoothed: f32,
    pub is_airborne: bool,
    /// Seconds since leaving the ground
    pub air_time: f32,
    /// Engine multiplier, 1 when no nitro is active
    pub nitro_multiplier: f32,
    pub nitro_time_remaining: f32,
    /// Vertical speed at the most recent landing
    pub landing_speed: f32,
}

impl VehicleState {
    /// At rest on the ground at `position`, facing `yaw`
    pub fn spawn(position: Vec3, yaw: f32) -> Self {
        Self {
            position,
            velocity: Vec3::ZERO,
            yaw,
            pitch: 0.0,
            steer_smoothed: 0.0,
            is_airborne: false,
            air_time: 0.0,
            nitro_multiplier: 1.0,
            nitro_time_remaining: 0.0,
            landing_speed: 0.0,
        }
    }

    /// Planar forward direction
    #[inline]
    pub fn forward(&self) -> Vec2 {
        heading(self.yaw)
    }

    /// Planar right direction
    #[inline]
    pub fn right(&self) -> Vec2 {
        right_of(self.yaw)
    }

    /// Signed speed along the heading
    #[inline]
    pub fn forward_speed(&self) -> f32 {
        let f = self.forward();
        self.velocity.x * f.x + self.velocity.z * f.y
    }

    #[inline]
    pub fn speed(&self) -> f32 {
        self.velocity.length()
    }

    pub fn nitro_active(&self) -> bool {
        self.nitro_multiplier > 1.0
    }

    /// No NaN or infinity anywhere the integrator writes
    pub fn is_finite(&self) -> bool {
        self.position.is_finite()
            && self.velocity.is_finite()
            && self.yaw.is_finite()
            && self.pitch.is_finite()
            && self.steer_smoothed.is_finite()
    }
}

/// Acceleration felt by the car over the last tick, in the car's frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Telemetry {
    /// Along the heading (m/s²)
    pub longitudinal: f32,
    /// Toward the right side (m/s²)
    pub lateral: f32,
    pub vertical: f32,
}

/// What the car ran into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImpactKind {
    Barrier,
    RampSide,
    BridgeSide,
}

impl From<SideKind> for ImpactKind {
    fn from(kind: SideKind) -> Self {
        match kind {
            SideKind::Ramp => ImpactKind::RampSide,
            SideKind::Bridge => ImpactKind::BridgeSide,
        }
    }
}

/// A collision that changed the car's velocity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImpactEvent {
    pub kind: ImpactKind,
    /// Speed when the contact was found (m/s)
    pub speed: f32,
    pub position: Vec3,
    pub normal: Vec2,
}

/// A counted lap
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LapCompleted {
    /// 1-based lap number
    pub lap: u32,
    pub seconds: f32,
    /// New best lap
    pub best: bool,
}

/// Notifications for collaborators (damage, particles, audio, HUD)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SimEvent {
    Impact(ImpactEvent),
    Launched { forward_speed: f32, vertical_speed: f32 },
    Landed { landing_speed: f32, air_time: f32 },
    LapCompleted(LapCompleted),
    NitroEnded,
    Reset,
}
