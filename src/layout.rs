//! Circuit layout
//!
//! A [`TrackLayout`] is plain data (loadable from JSON) describing the track
//! shape and where ramps, bridges and hills go. [`TrackLayout::build`]
//! validates it and produces the immutable [`Circuit`] the simulation runs on.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, require_fraction, require_non_negative};
use crate::sim::elevation::ramp::{APPROACH_CONE, LAUNCH_FRACTION};
use crate::sim::elevation::terrain::HillScatter;
use crate::sim::elevation::{Bridge, ElevationField, Hill, Ramp, Terrain};
use crate::sim::track::{BarrierConfig, Track};
use crate::yaw_of;

/// A ramp placed on the track, facing the direction of travel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RampPlacement {
    /// Position along the loop in [0, 1)
    pub fraction: f32,
    /// Sideways shift from the centerline, positive to the left (m)
    #[serde(default)]
    pub lateral_offset: f32,
    pub width: f32,
    pub length: f32,
    pub height: f32,
    /// Fraction of the ramp length past which it launches
    #[serde(default = "default_launch_fraction")]
    pub launch_fraction: f32,
    /// Half-angle of the heading cone that may launch (rad)
    #[serde(default = "default_approach_cone")]
    pub approach_cone: f32,
}

fn default_launch_fraction() -> f32 {
    LAUNCH_FRACTION
}

fn default_approach_cone() -> f32 {
    APPROACH_CONE
}

/// A bridge deck, either laid along the track or drawn freely
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BridgePlacement {
    /// Straight deck centered on the track at `fraction`, aligned with it
    Straight {
        fraction: f32,
        length: f32,
        width: f32,
        height: f32,
    },
    /// Deck along a cubic Bézier in world coordinates
    Curved {
        control: [Vec2; 4],
        width: f32,
        height: f32,
        #[serde(default = "default_curve_segments")]
        segments: usize,
    },
}

fn default_curve_segments() -> usize {
    48
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HillPlacement {
    pub center: Vec2,
    pub radius: f32,
    pub height: f32,
}

/// Everything needed to build a circuit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackLayout {
    // === Track shape ===
    /// Half-size of the rounded rectangle (m)
    pub half_extents: Vec2,
    pub corner_radius: f32,
    /// Polyline segments per corner arc
    pub corner_segments: usize,
    pub half_width: f32,
    pub barriers: BarrierConfig,

    // === Elevation ===
    pub ramps: Vec<RampPlacement>,
    pub bridges: Vec<BridgePlacement>,
    /// Hand-placed hills
    pub hills: Vec<HillPlacement>,
    /// Random hills on top of the hand-placed ones
    pub hill_scatter: HillScatter,
    /// Minimum gap between a scattered hill's edge and the track edge (m)
    pub hill_clearance: f32,
    /// Cosmetic ripple on the terrain (m)
    pub terrain_noise: f32,
}

impl Default for TrackLayout {
    fn default() -> Self {
        // Quarter-circle Bézier handle length for the corner overpass
        let k = 0.552 * 35.0;
        Self {
            half_extents: Vec2::new(150.0, 90.0),
            corner_radius: 35.0,
            corner_segments: 12,
            half_width: 8.0,
            barriers: BarrierConfig::default(),

            ramps: vec![RampPlacement {
                fraction: 0.08,
                lateral_offset: 0.0,
                width: 6.0,
                length: 14.0,
                height: 1.5,
                launch_fraction: LAUNCH_FRACTION,
                approach_cone: APPROACH_CONE,
            }],
            bridges: vec![
                BridgePlacement::Straight {
                    fraction: 0.5,
                    length: 60.0,
                    width: 16.0,
                    height: 3.0,
                },
                // Follows the first corner
                BridgePlacement::Curved {
                    control: [
                        Vec2::new(115.0, -90.0),
                        Vec2::new(115.0 + k, -90.0),
                        Vec2::new(150.0, -55.0 - k),
                        Vec2::new(150.0, -55.0),
                    ],
                    width: 16.0,
                    height: 2.5,
                    segments: default_curve_segments(),
                },
            ],
            hills: Vec::new(),
            hill_scatter: HillScatter {
                count: 8,
                ..Default::default()
            },
            hill_clearance: 4.0,
            terrain_noise: 0.0,
        }
    }
}

/// Immutable geometry the simulation runs on
#[derive(Debug, Clone)]
pub struct Circuit {
    pub track: Track,
    pub elevation: ElevationField,
}

impl TrackLayout {
    /// Parse a layout; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Validate every placement and build the circuit
    pub fn build(&self) -> Result<Circuit, ConfigError> {
        let track = Track::rounded_rect(
            self.half_extents,
            self.corner_radius,
            self.corner_segments,
            self.half_width,
            &self.barriers,
        )
        .inspect_err(|e| log::warn!("Rejected track shape: {e}"))?;

        let ramps = self
            .ramps
            .iter()
            .enumerate()
            .map(|(i, placement)| self.place_ramp(&track, i, placement))
            .collect::<Result<Vec<_>, _>>()?;

        let bridges = self
            .bridges
            .iter()
            .enumerate()
            .map(|(i, placement)| self.place_bridge(&track, i, placement))
            .collect::<Result<Vec<_>, _>>()?;

        let terrain = self.place_hills(&track)?;

        log::info!(
            "Circuit built: {} ramps, {} bridges, {} hills",
            ramps.len(),
            bridges.len(),
            terrain.hills.len()
        );
        Ok(Circuit {
            track,
            elevation: ElevationField::new(ramps, bridges, terrain),
        })
    }

    fn place_ramp(&self, track: &Track, index: usize, placement: &RampPlacement) -> Result<Ramp, ConfigError> {
        let fraction = require_fraction("ramp", index, placement.fraction)?;
        let (p, tangent) = track.point_at(fraction * track.total_length());
        let center = p + tangent.perp() * placement.lateral_offset;
        Ramp::new(
            center,
            yaw_of(tangent),
            placement.width,
            placement.length,
            placement.height,
        )
        .and_then(|ramp| ramp.with_launch_window(placement.launch_fraction, placement.approach_cone))
        .inspect_err(|e| log::warn!("Rejected ramp #{index}: {e}"))
    }

    fn place_bridge(&self, track: &Track, index: usize, placement: &BridgePlacement) -> Result<Bridge, ConfigError> {
        let bridge = match *placement {
            BridgePlacement::Straight {
                fraction,
                length,
                width,
                height,
            } => {
                let fraction = require_fraction("bridge", index, fraction)?;
                let (p, tangent) = track.point_at(fraction * track.total_length());
                let half = tangent * length * 0.5;
                Bridge::straight(p - half, p + half, width, height)
            }
            BridgePlacement::Curved {
                control,
                width,
                height,
                segments,
            } => Bridge::curved(control, width, height, segments),
        };
        bridge.inspect_err(|e| log::warn!("Rejected bridge #{index}: {e}"))
    }

    fn place_hills(&self, track: &Track) -> Result<Terrain, ConfigError> {
        let mut hills = self
            .hills
            .iter()
            .map(|h| Hill::new(h.center, h.radius, h.height))
            .collect::<Result<Vec<_>, _>>()?;

        if self.hill_scatter.count > 0 {
            let clearance = require_non_negative("hill clearance", self.hill_clearance)?;
            let edge = track.half_width() + clearance;
            let scattered = self
                .hill_scatter
                .scatter(|center, radius| track.project(center).distance - radius < edge)?;
            hills.extend(scattered);
        }

        let noise = require_non_negative("terrain noise", self.terrain_noise)?;
        Ok(Terrain::new(hills).with_noise(noise, false))
    }
}
