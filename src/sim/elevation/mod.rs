//! Ground height under the car
//!
//! Several independent height sources (ramps, bridges, rolling terrain) are
//! queried in a fixed order and folded into one [`GroundInfo`] by
//! [`merge_samples`]:
//! - the highest surface wins, together with its flags
//! - the first side contact found is kept
//! - with no surface at all the ground is flat at height 0

pub mod bridge;
pub mod ramp;
pub mod terrain;

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

pub use bridge::Bridge;
pub use ramp::Ramp;
pub use terrain::{Hill, Terrain};

/// Height difference a car rolls over without treating it as a wall (m)
pub const STEP_HEIGHT: f32 = 0.3;

/// Which kind of geometry produced a side contact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SideKind {
    Ramp,
    Bridge,
}

/// The car is pressing into the side of raised geometry
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SideContact {
    pub kind: SideKind,
    /// Push-out direction (ground plane)
    pub normal: Vec2,
    pub penetration: f32,
}

/// Top of a ramp, where forward speed turns into a jump
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LaunchEdge {
    /// Ramp forward direction (ground plane)
    pub direction: Vec2,
    /// Ramp inclination (rad)
    pub angle: f32,
}

/// A drivable surface reported by one source
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfacePatch {
    pub height: f32,
    pub normal: Vec3,
    /// Ramp or bridge deck rather than terrain
    pub elevated: bool,
    pub launch: Option<LaunchEdge>,
}

/// What one source has to say about a position
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ElevationSample {
    None,
    Surface(SurfacePatch),
    Side(SideContact),
}

/// Anything that can raise the ground or block the car from the side
pub trait ElevationSource {
    fn query(&self, position: Vec3, yaw: f32) -> ElevationSample;
}

/// Merged ground answer for one position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroundInfo {
    pub height: f32,
    pub normal: Vec3,
    pub on_elevated_surface: bool,
    pub at_launch_edge: bool,
    pub launch_direction: Vec2,
    pub launch_angle: f32,
    pub side_collision: Option<SideContact>,
}

impl Default for GroundInfo {
    fn default() -> Self {
        Self::flat()
    }
}

impl GroundInfo {
    /// Flat ground at height 0
    pub fn flat() -> Self {
        Self {
            height: 0.0,
            normal: Vec3::Y,
            on_elevated_surface: false,
            at_launch_edge: false,
            launch_direction: Vec2::ZERO,
            launch_angle: 0.0,
            side_collision: None,
        }
    }

    fn take_surface(&mut self, patch: &SurfacePatch) {
        self.height = patch.height;
        self.normal = patch.normal;
        self.on_elevated_surface = patch.elevated;
        match patch.launch {
            Some(edge) => {
                self.at_launch_edge = true;
                self.launch_direction = edge.direction;
                self.launch_angle = edge.angle;
            }
            None => {
                self.at_launch_edge = false;
                self.launch_direction = Vec2::ZERO;
                self.launch_angle = 0.0;
            }
        }
    }
}

/// Fold samples (in source order) into one ground answer
pub fn merge_samples(samples: impl IntoIterator<Item = ElevationSample>) -> GroundInfo {
    let mut ground = GroundInfo::flat();
    for sample in samples {
        match sample {
            ElevationSample::None => {}
            ElevationSample::Surface(patch) => {
                if patch.height > ground.height {
                    ground.take_surface(&patch);
                }
            }
            ElevationSample::Side(contact) => {
                if ground.side_collision.is_none() {
                    ground.side_collision = Some(contact);
                }
            }
        }
    }
    ground
}

/// Every height source on a circuit, queried ramps first, then bridges, then terrain
#[derive(Debug, Clone, Default)]
pub struct ElevationField {
    ramps: Vec<Ramp>,
    bridges: Vec<Bridge>,
    terrain: Terrain,
}

impl ElevationField {
    pub fn new(ramps: Vec<Ramp>, bridges: Vec<Bridge>, terrain: Terrain) -> Self {
        Self {
            ramps,
            bridges,
            terrain,
        }
    }

    pub fn ramps(&self) -> &[Ramp] {
        &self.ramps
    }

    pub fn bridges(&self) -> &[Bridge] {
        &self.bridges
    }

    pub fn terrain(&self) -> &Terrain {
        &self.terrain
    }

    /// Sources in merge order
    pub fn sources(&self) -> impl Iterator<Item = &dyn ElevationSource> {
        self.ramps
            .iter()
            .map(|r| r as &dyn ElevationSource)
            .chain(self.bridges.iter().map(|b| b as &dyn ElevationSource))
            .chain(std::iter::once(&self.terrain as &dyn ElevationSource))
    }

    pub fn query(&self, position: Vec3, yaw: f32) -> GroundInfo {
        merge_samples(self.sources().map(|source| source.query(position, yaw)))
    }
}

/// Surface normal for a slope of `slope` (rise per metre) along `dir`
pub(crate) fn slope_normal(dir: Vec2, slope: f32) -> Vec3 {
    Vec3::new(-dir.x * slope, 1.0, -dir.y * slope).normalize_or(Vec3::Y)
}
