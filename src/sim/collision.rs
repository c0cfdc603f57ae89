//! Collision response
//!
//! Detection lives with the geometry (barriers on the track, side walls in the
//! elevation sources). This module turns a contact into a push-out plus a
//! damped reflection, and rate-limits the bounces so the car cannot buzz
//! against a wall every tick.

use glam::Vec2;

use super::state::{ImpactEvent, ImpactKind, VehicleState};
use crate::lift;
use crate::tuning::VehicleTuning;

/// Reflect velocity off a surface
///
/// Standard reflection: v' = v - 2(v·n)n
#[inline]
pub fn reflect_velocity(velocity: Vec2, normal: Vec2) -> Vec2 {
    velocity - 2.0 * velocity.dot(normal) * normal
}

/// Bounce response for one contact normal
///
/// The normal component flips and keeps `restitution` of its magnitude, then
/// the whole planar velocity is scaled by `friction`.
#[inline]
pub fn bounce_velocity(velocity: Vec2, normal: Vec2, restitution: f32, friction: f32) -> Vec2 {
    let vn = velocity.dot(normal);
    let reflected = reflect_velocity(velocity, normal);
    // reflect() gives -vn along the normal; keep only `restitution` of it
    let damped = reflected + normal * (vn * (1.0 - restitution));
    damped * friction
}

/// Shared cooldown between bounces
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CollisionResolver {
    cooldown_remaining: f32,
}

impl CollisionResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cooldown_remaining(&self) -> f32 {
        self.cooldown_remaining
    }

    pub fn cool_down(&mut self, dt: f32) {
        self.cooldown_remaining = (self.cooldown_remaining - dt).max(0.0);
    }

    pub fn reset(&mut self) {
        self.cooldown_remaining = 0.0;
    }

    /// Push the car out of a contact and bounce it if it is moving inward.
    ///
    /// Positional correction always happens; the velocity response and the
    /// impact event only when no cooldown is running.
    pub fn resolve(
        &mut self,
        state: &mut VehicleState,
        kind: ImpactKind,
        normal: Vec2,
        penetration: f32,
        impact_speed: f32,
        tuning: &VehicleTuning,
    ) -> Option<ImpactEvent> {
        let normal = normal.normalize_or_zero();
        if normal == Vec2::ZERO || !penetration.is_finite() {
            return None;
        }

        let push = normal * (penetration.max(0.0) + tuning.collision_epsilon);
        state.position += lift(push, 0.0);

        let planar = Vec2::new(state.velocity.x, state.velocity.z);
        if planar.dot(normal) >= 0.0 || self.cooldown_remaining > 0.0 {
            return None;
        }

        let bounced = bounce_velocity(planar, normal, tuning.restitution, tuning.friction);
        state.velocity.x = bounced.x;
        state.velocity.z = bounced.y;
        self.cooldown_remaining = tuning.collision_cooldown;

        log::debug!("Impact {kind:?} at {impact_speed:.1} m/s");
        Some(ImpactEvent {
            kind,
            speed: impact_speed,
            position: state.position,
            normal,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn tuning() -> VehicleTuning {
        VehicleTuning::default()
    }

    #[test]
    fn test_reflect_velocity() {
        let reflected = reflect_velocity(Vec2::new(100.0, 0.0), Vec2::new(-1.0, 0.0));
        assert!((reflected.x + 100.0).abs() < 0.001);
        assert!(reflected.y.abs() < 0.001);
    }

    #[test]
    fn test_bounce_damps_normal_and_scales_by_friction() {
        // 20 m/s straight into a wall facing -x
        let v = bounce_velocity(Vec2::new(20.0, 0.0), Vec2::NEG_X, 0.3, 0.7);
        assert!((v.x + 20.0 * 0.3 * 0.7).abs() < 1e-4);
        assert!(v.y.abs() < 1e-6);

        // Tangential part only loses friction
        let v = bounce_velocity(Vec2::new(10.0, 10.0), Vec2::NEG_X, 0.3, 0.7);
        assert!((v.y - 7.0).abs() < 1e-4);
        assert!((v.x + 2.1).abs() < 1e-4);
    }

    #[test]
    fn test_barrier_bounce() {
        let mut resolver = CollisionResolver::new();
        let mut state = VehicleState::spawn(Vec3::ZERO, 0.0);
        state.velocity = Vec3::new(0.0, 0.0, 20.0);

        let event = resolver
            .resolve(&mut state, ImpactKind::Barrier, Vec2::NEG_Y, 0.5, 20.0, &tuning())
            .expect("impact");
        assert_eq!(event.kind, ImpactKind::Barrier);
        assert_eq!(event.speed, 20.0);

        // Moving away from the barrier now, with reduced speed
        assert!(state.velocity.z < 0.0);
        assert!(state.velocity.z.abs() < 20.0);
        // Pushed out by penetration + epsilon
        assert!((state.position.z + 0.51).abs() < 1e-5);
        assert!(resolver.cooldown_remaining() > 0.0);
    }

    #[test]
    fn test_cooldown_suppresses_second_bounce_but_still_pushes() {
        let mut resolver = CollisionResolver::new();
        let t = tuning();
        let mut state = VehicleState::spawn(Vec3::ZERO, 0.0);
        state.velocity = Vec3::new(0.0, 0.0, 20.0);
        assert!(resolver.resolve(&mut state, ImpactKind::Barrier, Vec2::NEG_Y, 0.2, 20.0, &t).is_some());

        state.velocity = Vec3::new(0.0, 0.0, 5.0);
        let z = state.position.z;
        assert!(resolver.resolve(&mut state, ImpactKind::Barrier, Vec2::NEG_Y, 0.2, 5.0, &t).is_none());
        assert_eq!(state.velocity.z, 5.0);
        assert!(state.position.z < z);

        // Cooldown expires
        resolver.cool_down(t.collision_cooldown);
        assert!(resolver.resolve(&mut state, ImpactKind::Barrier, Vec2::NEG_Y, 0.2, 5.0, &t).is_some());
    }

    #[test]
    fn test_separating_contact_only_pushes() {
        let mut resolver = CollisionResolver::new();
        let mut state = VehicleState::spawn(Vec3::ZERO, 0.0);
        state.velocity = Vec3::new(0.0, 0.0, -3.0);
        let event = resolver.resolve(&mut state, ImpactKind::RampSide, Vec2::NEG_Y, 0.1, 3.0, &tuning());
        assert!(event.is_none());
        assert_eq!(state.velocity.z, -3.0);
        assert_eq!(resolver.cooldown_remaining(), 0.0);
    }

    #[test]
    fn test_zero_normal_is_ignored() {
        let mut resolver = CollisionResolver::new();
        let mut state = VehicleState::spawn(Vec3::ZERO, 0.0);
        state.velocity = Vec3::new(0.0, 0.0, 10.0);
        let before = state;
        assert!(resolver.resolve(&mut state, ImpactKind::Barrier, Vec2::ZERO, 1.0, 10.0, &tuning()).is_none());
        assert_eq!(state, before);
    }
}
