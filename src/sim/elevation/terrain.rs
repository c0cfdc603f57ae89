//! Rolling terrain
//!
//! Smooth cosine hills summed together. A small deterministic ripple can be
//! layered on top for visuals; it stays out of the physics query unless asked.

use glam::{Vec2, Vec3};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::{ElevationSample, ElevationSource, SurfacePatch};
use crate::error::{ConfigError, require_non_negative, require_positive};
use crate::{clamp01, planar};

/// Finite difference step for terrain normals (m)
const NORMAL_EPS: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hill {
    pub center: Vec2,
    pub radius: f32,
    pub height: f32,
}

impl Hill {
    pub fn new(center: Vec2, radius: f32, height: f32) -> Result<Self, ConfigError> {
        require_positive("hill radius", radius)?;
        require_non_negative("hill height", height)?;
        Ok(Self { center, radius, height })
    }

    /// Cosine falloff, zero at and beyond the radius
    #[inline]
    pub fn height_at(&self, p: Vec2) -> f32 {
        let dist = (p - self.center).length();
        if dist >= self.radius {
            return 0.0;
        }
        let k = clamp01(dist / self.radius);
        self.height * 0.5 * ((std::f32::consts::PI * k).cos() + 1.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Terrain {
    pub hills: Vec<Hill>,
    /// Amplitude of the cosmetic ripple (m)
    pub noise_amplitude: f32,
    /// Include the ripple in physics queries
    pub noise_in_physics: bool,
}

impl Terrain {
    pub fn new(hills: Vec<Hill>) -> Self {
        Self {
            hills,
            ..Default::default()
        }
    }

    pub fn with_noise(mut self, amplitude: f32, in_physics: bool) -> Self {
        self.noise_amplitude = amplitude.max(0.0);
        self.noise_in_physics = in_physics;
        self
    }

    /// Sum of hill heights at `p`
    pub fn hill_height(&self, p: Vec2) -> f32 {
        self.hills.iter().map(|h| h.height_at(p)).sum()
    }

    /// Deterministic ripple; bounded by the amplitude
    pub fn noise(&self, p: Vec2) -> f32 {
        if self.noise_amplitude <= 0.0 {
            return 0.0;
        }
        let ripple = (p.x * 0.31).sin() * (p.y * 0.27).cos() * 0.6 + ((p.x + p.y) * 0.73).sin() * 0.4;
        ripple * self.noise_amplitude
    }

    /// Height used by the physics query
    pub fn height_at(&self, p: Vec2) -> f32 {
        let base = self.hill_height(p);
        if self.noise_in_physics { base + self.noise(p) } else { base }
    }

    /// Height a renderer should draw, ripple included
    pub fn visual_height(&self, p: Vec2) -> f32 {
        self.hill_height(p) + self.noise(p)
    }

    /// Surface normal by central differences
    pub fn normal_at(&self, p: Vec2) -> Vec3 {
        let dx = self.height_at(p + Vec2::new(NORMAL_EPS, 0.0)) - self.height_at(p - Vec2::new(NORMAL_EPS, 0.0));
        let dz = self.height_at(p + Vec2::new(0.0, NORMAL_EPS)) - self.height_at(p - Vec2::new(0.0, NORMAL_EPS));
        Vec3::new(-dx, 2.0 * NORMAL_EPS, -dz).normalize_or(Vec3::Y)
    }

    fn touches(&self, p: Vec2) -> bool {
        (self.noise_in_physics && self.noise_amplitude > 0.0)
            || self.hills.iter().any(|h| (p - h.center).length() < h.radius)
    }
}

impl ElevationSource for Terrain {
    fn query(&self, position: Vec3, _yaw: f32) -> ElevationSample {
        let p = planar(position);
        if !self.touches(p) {
            return ElevationSample::None;
        }
        ElevationSample::Surface(SurfacePatch {
            height: self.height_at(p),
            normal: self.normal_at(p),
            elevated: false,
            launch: None,
        })
    }
}

/// Random hill placement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HillScatter {
    pub seed: u64,
    pub count: usize,
    /// Hills are placed inside [-extent, extent] on both axes (m)
    pub extent: Vec2,
    pub min_radius: f32,
    pub max_radius: f32,
    pub min_height: f32,
    pub max_height: f32,
}

impl Default for HillScatter {
    fn default() -> Self {
        Self {
            seed: 0x5eed,
            count: 0,
            extent: Vec2::new(200.0, 150.0),
            min_radius: 10.0,
            max_radius: 25.0,
            min_height: 1.0,
            max_height: 4.0,
        }
    }
}

impl HillScatter {
    /// Place up to `count` hills, rejecting spots where `blocked(center, radius)`.
    ///
    /// Same seed, same hills.
    pub fn scatter<F>(&self, blocked: F) -> Result<Vec<Hill>, ConfigError>
    where
        F: Fn(Vec2, f32) -> bool,
    {
        require_positive("scatter extent x", self.extent.x)?;
        require_positive("scatter extent z", self.extent.y)?;
        require_positive("scatter min radius", self.min_radius)?;
        require_non_negative("scatter min height", self.min_height)?;
        if self.max_radius < self.min_radius || self.max_height < self.min_height {
            return Err(ConfigError::InvalidValue {
                what: "scatter range",
                value: self.max_radius.min(self.max_height),
            });
        }

        let mut rng = Pcg32::seed_from_u64(self.seed);
        let mut hills = Vec::with_capacity(self.count);
        let mut attempts = 0;
        while hills.len() < self.count && attempts < self.count * 32 {
            attempts += 1;
            let center = Vec2::new(
                rng.random_range(-self.extent.x..=self.extent.x),
                rng.random_range(-self.extent.y..=self.extent.y),
            );
            let radius = rng.random_range(self.min_radius..=self.max_radius);
            let height = rng.random_range(self.min_height..=self.max_height);
            if !blocked(center, radius) {
                hills.push(Hill { center, radius, height });
            }
        }

        if hills.len() < self.count {
            log::warn!(
                "Hill scatter placed {} of {} hills (seed {})",
                hills.len(),
                self.count,
                self.seed
            );
        }
        Ok(hills)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hill() -> Hill {
        Hill::new(Vec2::new(10.0, 0.0), 20.0, 4.0).unwrap()
    }

    #[test]
    fn test_hill_profile() {
        let h = hill();
        assert!((h.height_at(h.center) - 4.0).abs() < 1e-5);
        assert!((h.height_at(h.center + Vec2::new(10.0, 0.0)) - 2.0).abs() < 1e-5);
        assert_eq!(h.height_at(h.center + Vec2::new(20.0, 0.0)), 0.0);
        assert_eq!(h.height_at(h.center + Vec2::new(50.0, 0.0)), 0.0);
    }

    #[test]
    fn test_hills_sum() {
        let a = Hill::new(Vec2::ZERO, 10.0, 2.0).unwrap();
        let b = Hill::new(Vec2::new(5.0, 0.0), 10.0, 2.0).unwrap();
        let terrain = Terrain::new(vec![a, b]);
        let p = Vec2::new(2.5, 0.0);
        assert!((terrain.hill_height(p) - (a.height_at(p) + b.height_at(p))).abs() < 1e-6);
    }

    #[test]
    fn test_noise_stays_out_of_physics_by_default() {
        let terrain = Terrain::new(vec![hill()]).with_noise(0.2, false);
        let p = Vec2::new(3.0, 7.0);
        assert_eq!(terrain.height_at(p), terrain.hill_height(p));
        assert!(terrain.noise(p).abs() <= 0.2 + 1e-6);
        assert_eq!(terrain.visual_height(p), terrain.hill_height(p) + terrain.noise(p));

        // Far from every hill the physics sees nothing
        assert_eq!(terrain.query(Vec3::new(500.0, 0.0, 0.0), 0.0), ElevationSample::None);
    }

    #[test]
    fn test_normal_leans_away_from_summit() {
        let terrain = Terrain::new(vec![hill()]);
        // East flank of the hill: ground falls toward +x, so the normal leans +x
        let n = terrain.normal_at(Vec2::new(20.0, 0.0));
        assert!(n.x > 0.0);
        assert!(n.y > 0.0);
        assert!((n.length() - 1.0).abs() < 1e-5);

        let top = terrain.normal_at(Vec2::new(10.0, 0.0));
        assert!((top - Vec3::Y).length() < 1e-4);
    }

    #[test]
    fn test_scatter_is_deterministic_and_respects_blocked() {
        let scatter = HillScatter {
            count: 6,
            ..Default::default()
        };
        let keep_right = |c: Vec2, _r: f32| c.x < 0.0;
        let a = scatter.scatter(keep_right).unwrap();
        let b = scatter.scatter(keep_right).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 6);
        assert!(a.iter().all(|h| h.center.x >= 0.0));
        assert!(a.iter().all(|h| h.radius >= 10.0 && h.radius <= 25.0));
    }

    #[test]
    fn test_scatter_rejects_inverted_ranges() {
        let scatter = HillScatter {
            count: 1,
            min_radius: 30.0,
            max_radius: 10.0,
            ..Default::default()
        };
        assert!(scatter.scatter(|_, _| false).is_err());
    }
}
