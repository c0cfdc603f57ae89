//! Nearest-point queries on planar polylines
//!
//! Shared by the track centerline and bridge deck paths. A linear scan over
//! every segment; the paths are short enough that nothing smarter pays off.

use glam::Vec2;

use crate::clamp01;
use crate::consts::EPSILON;

/// Closest point on segment `a`-`b` to `p`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentHit {
    /// Parameter along the segment, clamped to [0, 1]
    pub t: f32,
    pub point: Vec2,
    pub dist_sq: f32,
}

#[inline]
pub fn closest_on_segment(p: Vec2, a: Vec2, b: Vec2) -> SegmentHit {
    let ab = b - a;
    let len_sq = ab.length_squared();
    let t = if len_sq > EPSILON {
        clamp01((p - a).dot(ab) / len_sq)
    } else {
        0.0
    };
    let point = a + ab * t;
    SegmentHit {
        t,
        point,
        dist_sq: (p - point).length_squared(),
    }
}

/// Nearest segment of a polyline
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolylineHit {
    /// Index of the segment's first point
    pub segment: usize,
    pub t: f32,
    pub point: Vec2,
    pub distance: f32,
    /// Arclength of `point` measured from the first vertex
    pub s: f32,
}

/// Cumulative arclength, aligned with `points` (first entry is 0)
pub fn cumulative_lengths(points: &[Vec2]) -> Vec<f32> {
    let mut cumulative = Vec::with_capacity(points.len());
    let mut total = 0.0;
    for (i, p) in points.iter().enumerate() {
        if i > 0 {
            total += (*p - points[i - 1]).length();
        }
        cumulative.push(total);
    }
    cumulative
}

/// Scan all segments and keep the closest; ties keep the earlier segment.
///
/// Returns `None` for fewer than two points.
pub fn nearest_on_polyline(points: &[Vec2], cumulative: &[f32], p: Vec2) -> Option<PolylineHit> {
    let mut best: Option<(usize, SegmentHit)> = None;
    for (i, pair) in points.windows(2).enumerate() {
        let hit = closest_on_segment(p, pair[0], pair[1]);
        match best {
            Some((_, b)) if b.dist_sq <= hit.dist_sq => {}
            _ => best = Some((i, hit)),
        }
    }

    best.map(|(i, hit)| {
        let seg_len = cumulative[i + 1] - cumulative[i];
        PolylineHit {
            segment: i,
            t: hit.t,
            point: hit.point,
            distance: hit.dist_sq.sqrt(),
            s: cumulative[i] + hit.t * seg_len,
        }
    })
}

/// Drop consecutive duplicates so no segment has zero length
pub fn dedup_points(points: impl IntoIterator<Item = Vec2>) -> Vec<Vec2> {
    let mut out: Vec<Vec2> = Vec::new();
    for p in points {
        match out.last() {
            Some(last) if (p - *last).length_squared() <= EPSILON => {}
            _ => out.push(p),
        }
    }
    out
}

/// Sample a cubic Bézier curve at `segments + 1` evenly spaced parameters
pub fn sample_cubic_bezier(control: [Vec2; 4], segments: usize) -> Vec<Vec2> {
    let segments = segments.max(1);
    let [p0, p1, p2, p3] = control;
    (0..=segments)
        .map(|i| {
            let t = i as f32 / segments as f32;
            let u = 1.0 - t;
            p0 * (u * u * u) + p1 * (3.0 * u * u * t) + p2 * (3.0 * u * t * t) + p3 * (t * t * t)
        })
        .collect()
}
