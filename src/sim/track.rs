//! Track centerline, projection, surface classification and barriers
//!
//! The centerline is a closed polyline in the ground plane (x, z). Everything
//! here is built once and never mutated while the simulation runs.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use super::polyline::{cumulative_lengths, dedup_points, nearest_on_polyline};
use crate::consts::EPSILON;
use crate::error::{ConfigError, require_non_negative, require_positive};
use crate::tuning::VehicleTuning;
use crate::{heading, planar, right_of, yaw_of};

/// Barrier instancing along the track edges
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BarrierConfig {
    pub enabled: bool,
    /// Target distance between barrier centers (m); adjusted to tile the loop evenly
    pub spacing: f32,
    /// Gap between the track edge and the barrier face (m)
    pub offset: f32,
    /// Barrier thickness (m)
    pub thickness: f32,
}

impl Default for BarrierConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            spacing: 4.0,
            offset: 6.0,
            thickness: 1.0,
        }
    }
}

impl BarrierConfig {
    pub fn none() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }
}

/// One barrier footprint: an oriented box in the ground plane
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Barrier {
    pub center: Vec2,
    /// Unit vector along the track
    pub tangent: Vec2,
    /// Unit vector from the barrier toward the centerline
    pub normal: Vec2,
    pub half_length: f32,
    pub half_thickness: f32,
}

impl Barrier {
    /// Overlap of a car footprint with this barrier, as (push-out normal, depth)
    fn contact(&self, p: Vec2, fwd: Vec2, right: Vec2, half_len: f32, half_wid: f32) -> Option<(Vec2, f32)> {
        let d = p - self.center;
        let along = d.dot(self.tangent);
        let across = d.dot(self.normal);

        // Car half-extent projected onto the barrier axes
        let support_n = half_len * fwd.dot(self.normal).abs() + half_wid * right.dot(self.normal).abs();
        let support_t = half_len * fwd.dot(self.tangent).abs() + half_wid * right.dot(self.tangent).abs();

        if along.abs() > self.half_length + support_t {
            return None;
        }

        let (normal, gap) = if across >= 0.0 {
            (self.normal, across - self.half_thickness)
        } else {
            (-self.normal, -across - self.half_thickness)
        };
        let penetration = support_n - gap;
        (penetration > 0.0).then_some((normal, penetration))
    }
}

/// Result of a barrier check
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BarrierContact {
    pub collided: bool,
    /// Push-out direction (ground plane)
    pub normal: Vec2,
    pub penetration: f32,
    /// Velocity magnitude when the contact was found
    pub impact_speed: f32,
}

impl BarrierContact {
    pub fn miss() -> Self {
        Self {
            collided: false,
            normal: Vec2::ZERO,
            penetration: 0.0,
            impact_speed: 0.0,
        }
    }
}

/// Nearest point on the centerline
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    pub closest: Vec2,
    /// Unit vector from the centerline toward the query point
    pub normal: Vec2,
    /// Unit direction of travel at the closest point
    pub tangent: Vec2,
    pub distance: f32,
    /// Arclength of the closest point, in [0, total_length)
    pub s: f32,
    pub segment: usize,
}

impl Default for Projection {
    fn default() -> Self {
        Self {
            closest: Vec2::ZERO,
            normal: Vec2::X,
            tangent: Vec2::Y,
            distance: 0.0,
            s: 0.0,
            segment: 0,
        }
    }
}

/// Grip and drag scaling of the surface under the car
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Surface {
    pub on_track: bool,
    pub grip: f32,
    pub drag_scale: f32,
}

impl Surface {
    /// Tarmac: full grip, nominal drag
    pub fn track() -> Self {
        Self {
            on_track: true,
            grip: 1.0,
            drag_scale: 1.0,
        }
    }

    pub fn classify(on_track: bool, tuning: &VehicleTuning) -> Self {
        if on_track {
            Self::track()
        } else {
            Self {
                on_track: false,
                grip: tuning.offroad_grip_scale,
                drag_scale: tuning.offroad_drag_scale,
            }
        }
    }
}

/// Closed track centerline
#[derive(Debug, Clone)]
pub struct Track {
    points: Vec<Vec2>,
    cumulative: Vec<f32>,
    half_width: f32,
    total_length: f32,
    barriers: Vec<Barrier>,
    barrier_spacing: f32,
}

impl Track {
    /// Build from an arbitrary polyline; the loop is closed if it is not already.
    pub fn from_polyline(
        points: Vec<Vec2>,
        half_width: f32,
        barriers: &BarrierConfig,
    ) -> Result<Self, ConfigError> {
        require_positive("track half width", half_width)?;
        if points.iter().any(|p| !p.is_finite()) {
            return Err(ConfigError::InvalidValue {
                what: "centerline point",
                value: f32::NAN,
            });
        }

        let mut points = dedup_points(points);
        if points.len() < 2 {
            return Err(ConfigError::DegeneratePath {
                what: "track centerline",
                points: points.len(),
            });
        }
        let first = points[0];
        if (*points.last().unwrap_or(&first) - first).length_squared() > EPSILON {
            points.push(first);
        }

        let cumulative = cumulative_lengths(&points);
        let total_length = cumulative.last().copied().unwrap_or(0.0);
        require_positive("track length", total_length)?;

        let mut track = Self {
            points,
            cumulative,
            half_width,
            total_length,
            barriers: Vec::new(),
            barrier_spacing: 0.0,
        };
        if barriers.enabled {
            track.place_barriers(barriers)?;
        }

        log::info!(
            "Track built: {} segments, length {:.1} m, {} barriers",
            track.segment_count(),
            track.total_length,
            track.barriers.len()
        );
        Ok(track)
    }

    /// Rounded rectangle centered on the origin, driven counter-clockwise
    /// starting from the middle of the -z straight.
    pub fn rounded_rect(
        half_extents: Vec2,
        corner_radius: f32,
        corner_segments: usize,
        half_width: f32,
        barriers: &BarrierConfig,
    ) -> Result<Self, ConfigError> {
        use std::f32::consts::{FRAC_PI_2, PI};

        require_positive("half extent x", half_extents.x)?;
        require_positive("half extent z", half_extents.y)?;
        require_non_negative("corner radius", corner_radius)?;
        let max = half_extents.x.min(half_extents.y);
        if corner_radius > max {
            return Err(ConfigError::CornerRadius {
                radius: corner_radius,
                max,
            });
        }

        let (hx, hz, r) = (half_extents.x, half_extents.y, corner_radius);
        let n = corner_segments.max(1);
        let corners = [
            (Vec2::new(hx - r, -hz + r), -FRAC_PI_2),
            (Vec2::new(hx - r, hz - r), 0.0),
            (Vec2::new(-hx + r, hz - r), FRAC_PI_2),
            (Vec2::new(-hx + r, -hz + r), PI),
        ];

        let start = Vec2::new(0.0, -hz);
        let mut points = vec![start];
        for (center, a0) in corners {
            for i in 0..=n {
                let a = a0 + FRAC_PI_2 * i as f32 / n as f32;
                points.push(center + Vec2::new(a.cos(), a.sin()) * r);
            }
        }
        points.push(start);

        Self::from_polyline(points, half_width, barriers)
    }

    fn place_barriers(&mut self, config: &BarrierConfig) -> Result<(), ConfigError> {
        let spacing = require_positive("barrier spacing", config.spacing)?;
        require_non_negative("barrier offset", config.offset)?;
        let thickness = require_positive("barrier thickness", config.thickness)?;

        let count = (self.total_length / spacing).round().max(1.0) as usize;
        let spacing = self.total_length / count as f32;
        let lateral = self.half_width + config.offset + thickness * 0.5;

        self.barriers = Vec::with_capacity(count * 2);
        for k in 0..count {
            let (p, tangent) = self.point_at(k as f32 * spacing);
            let left = tangent.perp();
            for side in [1.0, -1.0] {
                self.barriers.push(Barrier {
                    center: p + left * side * lateral,
                    tangent,
                    normal: -left * side,
                    half_length: spacing * 0.5 + 0.25,
                    half_thickness: thickness * 0.5,
                });
            }
        }
        self.barrier_spacing = spacing;
        Ok(())
    }

    pub fn points(&self) -> &[Vec2] {
        &self.points
    }

    pub fn cumulative(&self) -> &[f32] {
        &self.cumulative
    }

    pub fn half_width(&self) -> f32 {
        self.half_width
    }

    pub fn total_length(&self) -> f32 {
        self.total_length
    }

    pub fn segment_count(&self) -> usize {
        self.points.len() - 1
    }

    pub fn barriers(&self) -> &[Barrier] {
        &self.barriers
    }

    /// Nearest point on the centerline
    pub fn project(&self, position: Vec2) -> Projection {
        let mut out = Projection::default();
        self.project_into(position, &mut out);
        out
    }

    /// Same as [`Track::project`], writing into a reused scratch value
    pub fn project_into(&self, position: Vec2, out: &mut Projection) {
        let Some(hit) = nearest_on_polyline(&self.points, &self.cumulative, position) else {
            *out = Projection::default();
            return;
        };

        let a = self.points[hit.segment];
        let b = self.points[hit.segment + 1];
        let tangent = (b - a).normalize_or_zero();
        let offset = position - hit.point;
        let normal = if hit.distance > EPSILON {
            offset / hit.distance
        } else {
            tangent.perp()
        };

        let s = if hit.s >= self.total_length { 0.0 } else { hit.s.max(0.0) };

        out.closest = hit.point;
        out.normal = normal;
        out.tangent = tangent;
        out.distance = hit.distance;
        out.s = s;
        out.segment = hit.segment;
    }

    pub fn on_track(&self, projection: &Projection) -> bool {
        projection.distance <= self.half_width
    }

    /// Centerline point and unit tangent at arclength `s` (wrapped into the loop)
    pub fn point_at(&self, s: f32) -> (Vec2, Vec2) {
        let s = if s.is_finite() { s.rem_euclid(self.total_length) } else { 0.0 };
        let idx = self.cumulative.partition_point(|&c| c <= s);
        let seg = idx.saturating_sub(1).min(self.segment_count() - 1);

        let a = self.points[seg];
        let b = self.points[seg + 1];
        let len = self.cumulative[seg + 1] - self.cumulative[seg];
        let t = if len > EPSILON { (s - self.cumulative[seg]) / len } else { 0.0 };
        (a.lerp(b, t), (b - a).normalize_or_zero())
    }

    /// Start position (on the ground) and yaw facing along the first segment
    pub fn start_pose(&self) -> (Vec3, f32) {
        let (p, tangent) = self.point_at(0.0);
        (Vec3::new(p.x, 0.0, p.y), yaw_of(tangent))
    }

    /// Test the car footprint against the barriers nearest to it
    pub fn check_barrier_collision(
        &self,
        position: Vec3,
        yaw: f32,
        velocity: Vec3,
        tuning: &VehicleTuning,
    ) -> BarrierContact {
        if self.barriers.is_empty() {
            return BarrierContact::miss();
        }

        let p = planar(position);
        let fwd = heading(yaw);
        let right = right_of(yaw);
        let count = self.barriers.len() / 2;
        let k = (self.project(p).s / self.barrier_spacing) as usize;

        let mut best = BarrierContact::miss();
        for dk in [count - 1, 0, 1] {
            let slot = (k + dk) % count;
            for barrier in &self.barriers[slot * 2..slot * 2 + 2] {
                if let Some((normal, penetration)) =
                    barrier.contact(p, fwd, right, tuning.half_length, tuning.half_width)
                {
                    if penetration > best.penetration {
                        best = BarrierContact {
                            collided: true,
                            normal,
                            penetration,
                            impact_speed: velocity.length(),
                        };
                    }
                }
            }
        }
        best
    }
}
