//! Bridges and overpasses
//!
//! A bridge is a deck path in the ground plane with a height per path point.
//! The deck eases up from the ground over `height * 4` metres at each end and
//! stays flat in between. Straight bridges and Bézier curves both end up as
//! the same sampled path.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use super::{ElevationSample, ElevationSource, STEP_HEIGHT, SideContact, SideKind, SurfacePatch, slope_normal};
use crate::consts::EPSILON;
use crate::error::{ConfigError, require_non_negative, require_positive};
use crate::sim::polyline::{cumulative_lengths, dedup_points, nearest_on_polyline, sample_cubic_bezier};
use crate::{ease_in_out_cubic, heading, planar};

/// Ramp length at each end, per metre of deck height
pub const RAMP_LENGTH_PER_HEIGHT: f32 = 4.0;
/// Width of the railing band outside the deck (m)
pub const RAIL_WIDTH: f32 = 1.0;
/// A car under the deck counts as coming in from the side when its heading
/// is at most this aligned with the deck path (cos 45°)
pub const SIDE_APPROACH_COS: f32 = std::f32::consts::FRAC_1_SQRT_2;
/// Longest straight-path sample spacing (m)
const SAMPLE_SPACING: f32 = 1.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bridge {
    path: Vec<Vec2>,
    cumulative: Vec<f32>,
    /// Deck height at each path point
    deck: Vec<f32>,
    half_width: f32,
    rail_width: f32,
    height: f32,
}

impl Bridge {
    /// Straight bridge from `start` to `end`
    pub fn straight(start: Vec2, end: Vec2, width: f32, height: f32) -> Result<Self, ConfigError> {
        let length = (end - start).length();
        let segments = ((length / SAMPLE_SPACING).ceil() as usize).clamp(2, 512);
        let points = (0..=segments).map(|i| start.lerp(end, i as f32 / segments as f32));
        Self::from_path(points.collect(), width, height)
    }

    /// Curved bridge following a cubic Bézier
    pub fn curved(control: [Vec2; 4], width: f32, height: f32, segments: usize) -> Result<Self, ConfigError> {
        Self::from_path(sample_cubic_bezier(control, segments.max(2)), width, height)
    }

    fn from_path(points: Vec<Vec2>, width: f32, height: f32) -> Result<Self, ConfigError> {
        require_positive("bridge width", width)?;
        require_non_negative("bridge height", height)?;
        if points.iter().any(|p| !p.is_finite()) {
            return Err(ConfigError::InvalidValue {
                what: "bridge path point",
                value: f32::NAN,
            });
        }

        let path = dedup_points(points);
        if path.len() < 2 {
            return Err(ConfigError::DegeneratePath {
                what: "bridge path",
                points: path.len(),
            });
        }

        let cumulative = cumulative_lengths(&path);
        let length = cumulative.last().copied().unwrap_or(0.0);
        let ramp = (height * RAMP_LENGTH_PER_HEIGHT).min(length * 0.5);
        let deck = cumulative
            .iter()
            .map(|&s| deck_profile(s, length, ramp) * height)
            .collect();

        Ok(Self {
            path,
            cumulative,
            deck,
            half_width: width * 0.5,
            rail_width: RAIL_WIDTH,
            height,
        })
    }

    pub fn path(&self) -> &[Vec2] {
        &self.path
    }

    pub fn length(&self) -> f32 {
        self.cumulative.last().copied().unwrap_or(0.0)
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    /// Deck height at arclength `s` along the path
    pub fn deck_height_at(&self, s: f32) -> f32 {
        let s = s.clamp(0.0, self.length());
        let idx = self.cumulative.partition_point(|&c| c <= s);
        let i = idx.saturating_sub(1).min(self.path.len() - 2);
        let len = self.cumulative[i + 1] - self.cumulative[i];
        let t = if len > EPSILON { (s - self.cumulative[i]) / len } else { 0.0 };
        self.deck[i] + (self.deck[i + 1] - self.deck[i]) * t
    }
}

/// Normalized deck height: eased up over `ramp`, flat, eased down
fn deck_profile(s: f32, length: f32, ramp: f32) -> f32 {
    if ramp <= EPSILON {
        return 1.0;
    }
    ease_in_out_cubic(s / ramp).min(ease_in_out_cubic((length - s) / ramp))
}

impl ElevationSource for Bridge {
    fn query(&self, position: Vec3, yaw: f32) -> ElevationSample {
        let p = planar(position);
        let Some(hit) = nearest_on_polyline(&self.path, &self.cumulative, p) else {
            return ElevationSample::None;
        };

        // Past either end of the path
        let last = self.path.len() - 2;
        if (hit.segment == 0 && hit.t <= 0.0) || (hit.segment == last && hit.t >= 1.0) {
            return ElevationSample::None;
        }

        let i = hit.segment;
        let deck = self.deck[i] + (self.deck[i + 1] - self.deck[i]) * hit.t;
        let seg = self.path[i + 1] - self.path[i];
        let tangent = seg.normalize_or_zero();
        let away = if hit.distance > EPSILON {
            (p - hit.point) / hit.distance
        } else {
            tangent.perp()
        };
        let on_deck_level = position.y >= deck - STEP_HEIGHT;
        let outer = self.half_width + self.rail_width;

        if hit.distance <= self.half_width {
            if on_deck_level {
                let slope = (self.deck[i + 1] - self.deck[i]) / seg.length().max(EPSILON);
                return ElevationSample::Surface(SurfacePatch {
                    height: deck,
                    normal: slope_normal(tangent, slope),
                    elevated: true,
                    launch: None,
                });
            }
            // Driving along underneath is an underpass
            if heading(yaw).dot(tangent).abs() > SIDE_APPROACH_COS {
                return ElevationSample::None;
            }
            // Under the deck, having come in from the side: back out past the edge
            return ElevationSample::Side(SideContact {
                kind: SideKind::Bridge,
                normal: away,
                penetration: self.half_width - hit.distance,
            });
        }

        if hit.distance <= outer && deck > STEP_HEIGHT {
            let contact = if on_deck_level {
                // Railing keeps the car on the deck
                SideContact {
                    kind: SideKind::Bridge,
                    normal: -away,
                    penetration: hit.distance - self.half_width,
                }
            } else {
                // Side of a raised deck seen from the ground
                SideContact {
                    kind: SideKind::Bridge,
                    normal: away,
                    penetration: outer - hit.distance,
                }
            };
            return ElevationSample::Side(contact);
        }

        ElevationSample::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, PI};

    fn straight() -> Bridge {
        // 60 m along +z, 10 m wide, 3 m tall: 12 m ramps at both ends
        Bridge::straight(Vec2::ZERO, Vec2::new(0.0, 60.0), 10.0, 3.0).unwrap()
    }

    #[test]
    fn test_deck_profile_ramps_and_plateau() {
        let b = straight();
        assert!((b.length() - 60.0).abs() < 1e-3);
        assert!(b.deck_height_at(0.0).abs() < 1e-5);
        assert!((b.deck_height_at(6.0) - 1.5).abs() < 1e-3);
        assert!((b.deck_height_at(12.0) - 3.0).abs() < 1e-4);
        assert!((b.deck_height_at(30.0) - 3.0).abs() < 1e-5);
        assert!(b.deck_height_at(60.0).abs() < 1e-5);
    }

    #[test]
    fn test_surface_on_deck() {
        let b = straight();
        let sample = b.query(Vec3::new(2.0, 3.0, 30.0), 0.0);
        let ElevationSample::Surface(patch) = sample else {
            panic!("expected deck surface, got {sample:?}");
        };
        assert!((patch.height - 3.0).abs() < 1e-5);
        assert!(patch.elevated);
        assert!((patch.normal - Vec3::Y).length() < 1e-5);
    }

    #[test]
    fn test_ramp_section_normal_tilts() {
        let b = straight();
        let ElevationSample::Surface(patch) = b.query(Vec3::new(0.0, 1.5, 6.0), 0.0) else {
            panic!("expected ramp surface");
        };
        assert!(patch.height > 1.0 && patch.height < 2.0);
        assert!(patch.normal.z < 0.0);
    }

    #[test]
    fn test_below_deck_from_side_is_wall() {
        let b = straight();
        // Heading -x, across the deck path
        let sample = b.query(Vec3::new(4.0, 0.0, 30.0), -FRAC_PI_2);
        let ElevationSample::Side(contact) = sample else {
            panic!("expected side contact, got {sample:?}");
        };
        assert_eq!(contact.kind, SideKind::Bridge);
        assert!((contact.normal - Vec2::X).length() < 1e-5);
        // Only as far as the deck edge
        assert!((contact.penetration - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_below_deck_along_path_is_underpass() {
        let b = straight();
        assert_eq!(b.query(Vec3::new(0.5, 0.0, 30.0), 0.0), ElevationSample::None);
        assert_eq!(b.query(Vec3::new(-3.0, 0.0, 30.0), PI), ElevationSample::None);
        // Shallow diagonal still counts as along the path
        assert_eq!(b.query(Vec3::new(2.0, 0.0, 30.0), 0.5), ElevationSample::None);
    }

    #[test]
    fn test_railing_pushes_back_onto_deck() {
        let b = straight();
        let sample = b.query(Vec3::new(-5.4, 3.0, 30.0), 0.0);
        let ElevationSample::Side(contact) = sample else {
            panic!("expected railing contact, got {sample:?}");
        };
        assert!((contact.normal - Vec2::X).length() < 1e-5);
        assert!((contact.penetration - 0.4).abs() < 1e-4);
    }

    #[test]
    fn test_rail_band_ignored_at_ground_level_ends() {
        let b = straight();
        assert_eq!(b.query(Vec3::new(5.5, 0.0, 1.0), 0.0), ElevationSample::None);
        assert_eq!(b.query(Vec3::new(0.0, 0.0, -3.0), 0.0), ElevationSample::None);
        assert_eq!(b.query(Vec3::new(20.0, 0.0, 30.0), 0.0), ElevationSample::None);
    }

    #[test]
    fn test_curved_bridge_follows_bezier() {
        let control = [
            Vec2::new(0.0, 0.0),
            Vec2::new(0.0, 40.0),
            Vec2::new(40.0, 40.0),
            Vec2::new(40.0, 0.0),
        ];
        let b = Bridge::curved(control, 8.0, 2.0, 48).unwrap();
        assert_eq!(b.path().first(), Some(&control[0]));

        // Apex of the curve sits at (20, 30)
        let sample = b.query(Vec3::new(20.0, 2.0, 30.0), 0.0);
        let ElevationSample::Surface(patch) = sample else {
            panic!("expected deck surface, got {sample:?}");
        };
        assert!((patch.height - 2.0).abs() < 1e-3);
    }

    #[test]
    fn test_short_bridge_clamps_ramps() {
        let b = Bridge::straight(Vec2::ZERO, Vec2::new(10.0, 0.0), 6.0, 5.0).unwrap();
        // Ramps would be 20 m each; they shrink to half the length and meet mid-span
        assert!((b.deck_height_at(5.0) - 5.0).abs() < 1e-4);
    }

    #[test]
    fn test_rejects_degenerate_path() {
        let err = Bridge::straight(Vec2::ONE, Vec2::ONE, 6.0, 2.0).unwrap_err();
        assert!(matches!(err, ConfigError::DegeneratePath { .. }));
    }
}
