//! Vehicle dynamics
//!
//! Planar bicycle-style model while grounded, ballistic flight while airborne.
//! One call to [`VehicleDynamics::update`] advances one fixed tick:
//!
//! Grounded: smooth steer → yaw from the bicycle approximation → longitudinal
//! engine/brake/drag → lateral slip correction → speed clamp → ramp launch →
//! integrate → follow the ground.
//!
//! Airborne: gravity, 20% steering authority, free integration until the
//! car comes back down to the ground height.

use glam::{Vec2, Vec3};

use super::elevation::GroundInfo;
use super::state::{Telemetry, VehicleState};
use super::tick::TickInput;
use super::track::Surface;
use crate::tuning::VehicleTuning;
use crate::{clamp01, normalize_angle};

/// Wheelbases shorter than this produce no yaw
const WHEELBASE_EPS: f32 = 1e-3;
/// Pitch limit while airborne (rad)
const MAX_AIR_PITCH: f32 = 0.6;

/// What happened during one update, for event emission
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct UpdateOutcome {
    /// (forward speed, vertical launch speed)
    pub launched: Option<(f32, f32)>,
    /// (landing speed, air time)
    pub landed: Option<(f32, f32)>,
    pub nitro_ended: bool,
}

/// Move `value` toward zero by `amount` without crossing it
#[inline]
fn approach_zero(value: f32, amount: f32) -> f32 {
    if value > 0.0 {
        (value - amount).max(0.0)
    } else if value < 0.0 {
        (value + amount).min(0.0)
    } else {
        0.0
    }
}

#[derive(Debug, Clone)]
pub struct VehicleDynamics {
    tuning: VehicleTuning,
    state: VehicleState,
    last_valid: VehicleState,
    telemetry: Telemetry,
}

impl VehicleDynamics {
    pub fn new(tuning: VehicleTuning, spawn: VehicleState) -> Self {
        Self {
            tuning,
            state: spawn,
            last_valid: spawn,
            telemetry: Telemetry::default(),
        }
    }

    pub fn state(&self) -> &VehicleState {
        &self.state
    }

    /// Direct access for collision response and containment
    pub fn state_mut(&mut self) -> &mut VehicleState {
        &mut self.state
    }

    pub fn tuning(&self) -> &VehicleTuning {
        &self.tuning
    }

    /// Mutable state alongside the tuning it is resolved against
    pub fn state_and_tuning_mut(&mut self) -> (&mut VehicleState, &VehicleTuning) {
        (&mut self.state, &self.tuning)
    }

    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }

    /// Put the car back at rest at the given pose
    pub fn reset(&mut self, position: Vec3, yaw: f32) {
        self.state = VehicleState::spawn(position, yaw);
        self.last_valid = self.state;
        self.telemetry = Telemetry::default();
    }

    /// Start a nitro boost; a new boost replaces any running one
    pub fn activate_nitro(&mut self, duration: f32, multiplier: f32) {
        if !(duration.is_finite() && duration > 0.0 && multiplier.is_finite()) {
            return;
        }
        self.state.nitro_multiplier = multiplier.max(1.0);
        self.state.nitro_time_remaining = duration;
    }

    /// Advance one fixed tick
    pub fn update(&mut self, dt: f32, input: &TickInput, surface: &Surface, ground: &GroundInfo) -> UpdateOutcome {
        let mut outcome = UpdateOutcome::default();
        if !(dt.is_finite() && dt > 0.0) {
            return outcome;
        }

        let input = input.sanitized();
        let previous_velocity = self.state.velocity;

        self.tick_nitro(dt, &mut outcome);
        if self.state.is_airborne {
            self.update_airborne(dt, &input, ground, &mut outcome);
        } else {
            self.update_grounded(dt, &input, surface, ground, &mut outcome);
        }

        self.enforce_speed_limit();
        self.update_telemetry(previous_velocity, dt);
        self.guard_invariants();
        outcome
    }

    fn tick_nitro(&mut self, dt: f32, outcome: &mut UpdateOutcome) {
        let s = &mut self.state;
        if s.nitro_time_remaining > 0.0 {
            s.nitro_time_remaining -= dt;
            if s.nitro_time_remaining <= 0.0 {
                s.nitro_time_remaining = 0.0;
                s.nitro_multiplier = 1.0;
                outcome.nitro_ended = true;
            }
        }
    }

    fn update_grounded(
        &mut self,
        dt: f32,
        input: &TickInput,
        surface: &Surface,
        ground: &GroundInfo,
        outcome: &mut UpdateOutcome,
    ) {
        let t = &self.tuning;
        let s = &mut self.state;

        // Steering smoothing
        s.steer_smoothed += (input.steer - s.steer_smoothed) * (t.steer_rate * dt).min(1.0);

        // Velocity in the car frame
        let planar_velocity = Vec2::new(s.velocity.x, s.velocity.z);
        let mut v_f = planar_velocity.dot(s.forward());
        let mut v_r = planar_velocity.dot(s.right());
        let speed = planar_velocity.length();

        let grip = surface.grip * (1.0 - input.handbrake * (1.0 - t.handbrake_grip_scale));

        // Bicycle yaw; steering tightens less at speed
        let speed_frac = clamp01(speed / t.max_speed);
        let steer_scale = 1.0 + (t.high_speed_steer_scale - 1.0) * speed_frac;
        let steer_angle = s.steer_smoothed * t.max_steer_angle * steer_scale;
        let yaw_rate = if t.wheelbase > WHEELBASE_EPS {
            v_f / t.wheelbase * steer_angle.tan() * grip
        } else {
            0.0
        };
        s.yaw = normalize_angle(s.yaw + yaw_rate * dt);
        let forward = s.forward();
        let right = s.right();

        // Longitudinal: engine, brake or reverse, then resistance
        let reversing = input.brake > 0.0 && input.throttle <= 0.0 && v_f < t.reverse_engage_speed;
        let mut engine = input.throttle * t.engine_accel * s.nitro_multiplier;
        if !surface.on_track && speed < t.offroad_boost_speed {
            engine *= t.offroad_torque_boost;
        }
        v_f += engine * dt;
        if reversing {
            v_f = (v_f - input.brake * t.reverse_accel * dt).max(-t.max_reverse_speed);
        } else if input.brake > 0.0 {
            v_f = approach_zero(v_f, input.brake * t.brake_accel * dt);
        }

        let fade = if t.low_speed_fade > 0.0 {
            (speed / t.low_speed_fade).clamp(0.2, 1.0)
        } else {
            1.0
        };
        let resistance = (t.drag * v_f * v_f + t.rolling_resistance) * surface.drag_scale * fade;
        v_f = approach_zero(v_f, resistance * dt);

        // Lateral slip correction
        let slip_angle = v_r.atan2(v_f.abs() + 1.0);
        let a_lat = -slip_angle * t.lateral_grip * grip * (0.25 + speed / 14.0).min(1.0);
        v_r = approach_zero(v_r, a_lat.abs() * dt);

        let planar_velocity = forward * v_f + right * v_r;
        s.velocity = Vec3::new(planar_velocity.x, 0.0, planar_velocity.y);
        let limit = t.speed_limit(s.nitro_multiplier);
        s.velocity = s.velocity.clamp_length_max(limit);

        // Ramp launch
        if ground.at_launch_edge && v_f > t.launch_min_speed {
            let vertical = (v_f * ground.launch_angle.sin() * t.launch_multiplier).max(t.min_launch_velocity);
            s.velocity.y = vertical;
            s.is_airborne = true;
            s.air_time = 0.0;
            outcome.launched = Some((v_f, vertical));
            log::debug!("Launched at {v_f:.1} m/s, vertical {vertical:.2} m/s");
        }

        s.position += s.velocity * dt;
        if s.is_airborne {
            s.position.y = s.position.y.max(ground.height);
        } else if s.position.y > ground.height + t.airborne_epsilon {
            // Ground fell away under the car
            s.is_airborne = true;
            s.air_time = 0.0;
        } else {
            s.position.y = ground.height;
        }

        // Visual pitch follows the slope on ramps and decks
        let target_pitch = if ground.on_elevated_surface && !s.is_airborne {
            let along = ground.normal.dot(Vec3::new(forward.x, 0.0, forward.y));
            -along.clamp(-1.0, 1.0).asin()
        } else {
            0.0
        };
        s.pitch += (target_pitch - s.pitch) * (t.pitch_rate * dt).min(1.0);
    }

    fn update_airborne(&mut self, dt: f32, input: &TickInput, ground: &GroundInfo, outcome: &mut UpdateOutcome) {
        let t = &self.tuning;
        let s = &mut self.state;

        let target = input.steer * t.air_steer_authority;
        s.steer_smoothed += (target - s.steer_smoothed) * (t.steer_rate * dt).min(1.0);
        s.yaw = normalize_angle(s.yaw + s.steer_smoothed * t.air_yaw_rate * dt);

        s.velocity.y -= t.gravity * dt;
        s.air_time += dt;
        s.position += s.velocity * dt;

        let target_pitch = (s.velocity.y * t.air_pitch_factor).clamp(-MAX_AIR_PITCH, MAX_AIR_PITCH);
        s.pitch += (target_pitch - s.pitch) * (t.pitch_rate * dt).min(1.0);

        if s.position.y <= ground.height {
            let landing_speed = s.velocity.y.abs();
            let air_time = s.air_time;
            s.position.y = ground.height;
            s.velocity.y = 0.0;
            s.is_airborne = false;
            s.air_time = 0.0;
            s.landing_speed = landing_speed;
            outcome.landed = Some((landing_speed, air_time));
            log::debug!("Landed at {landing_speed:.2} m/s after {air_time:.2} s");
        }
    }

    fn enforce_speed_limit(&mut self) {
        let limit = self.tuning.speed_limit(self.state.nitro_multiplier);
        self.state.velocity = self.state.velocity.clamp_length_max(limit);
    }

    fn update_telemetry(&mut self, previous_velocity: Vec3, dt: f32) {
        let accel = (self.state.velocity - previous_velocity) / dt;
        let planar_accel = Vec2::new(accel.x, accel.z);
        self.telemetry = Telemetry {
            longitudinal: planar_accel.dot(self.state.forward()),
            lateral: planar_accel.dot(self.state.right()),
            vertical: accel.y,
        };
    }

    /// NaN or infinity in the state is a modeling bug: loud in debug builds,
    /// rolled back to the last good state in release builds.
    fn guard_invariants(&mut self) {
        debug_assert!(
            self.state.is_finite(),
            "vehicle state became non-finite: {:?}",
            self.state
        );
        if self.state.is_finite() {
            self.last_valid = self.state;
        } else {
            log::error!("Vehicle state became non-finite, restoring last valid state");
            self.state = self.last_valid;
            self.telemetry = Telemetry::default();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SIM_DT;
    use proptest::prelude::*;

    fn car() -> VehicleDynamics {
        VehicleDynamics::new(VehicleTuning::default(), VehicleState::spawn(Vec3::ZERO, 0.0))
    }

    fn moving(speed: f32) -> VehicleDynamics {
        let mut car = car();
        car.state_mut().velocity = Vec3::new(0.0, 0.0, speed);
        car
    }

    fn throttle(amount: f32) -> TickInput {
        TickInput {
            throttle: amount,
            ..Default::default()
        }
    }

    fn flat_tick(car: &mut VehicleDynamics, input: &TickInput) -> UpdateOutcome {
        car.update(SIM_DT, input, &Surface::track(), &GroundInfo::flat())
    }

    #[test]
    fn test_rest_state_is_idempotent() {
        let mut car = car();
        let start = *car.state();
        for _ in 0..600 {
            flat_tick(&mut car, &TickInput::default());
        }
        assert_eq!(car.state().velocity, Vec3::ZERO);
        assert_eq!(car.state().position, start.position);
        assert_eq!(car.state().yaw, start.yaw);
    }

    #[test]
    fn test_drag_slows_monotonically_to_zero() {
        let mut car = moving(20.0);
        let mut previous = car.state().forward_speed();
        let mut stopped_at = None;

        for tick in 0..12_000 {
            flat_tick(&mut car, &TickInput::default());
            let v = car.state().forward_speed();
            assert!(v >= 0.0, "drag alone must never reverse the car");
            if previous > 0.0 {
                assert!(v < previous, "tick {tick}: {v} !< {previous}");
            } else {
                assert_eq!(v, 0.0);
            }
            if v == 0.0 && stopped_at.is_none() {
                stopped_at = Some(tick);
            }
            previous = v;
        }
        assert!(stopped_at.is_some(), "car never came to rest");
    }

    #[test]
    fn test_full_throttle_converges_to_max_speed() {
        let mut car = car();
        let max = car.tuning().max_speed;
        for _ in 0..(20 * 120) {
            flat_tick(&mut car, &throttle(1.0));
            assert!(car.state().speed() <= max + 1e-3);
        }
        assert!(car.state().speed() > max - 0.1);
    }

    #[test]
    fn test_nitro_raises_speed_limit_by_half() {
        let mut car = car();
        car.activate_nitro(100.0, 1.6);
        let limit = car.tuning().max_speed * 1.5;
        for _ in 0..(30 * 120) {
            flat_tick(&mut car, &throttle(1.0));
            assert!(car.state().speed() <= limit + 1e-3);
        }
        assert!(car.state().speed() > limit - 0.1);
    }

    #[test]
    fn test_nitro_expires() {
        let mut car = car();
        car.activate_nitro(0.5, 1.5);
        assert!(car.state().nitro_active());

        let mut ended = 0;
        for _ in 0..120 {
            if flat_tick(&mut car, &TickInput::default()).nitro_ended {
                ended += 1;
            }
        }
        assert_eq!(ended, 1);
        assert_eq!(car.state().nitro_multiplier, 1.0);
        assert_eq!(car.state().nitro_time_remaining, 0.0);
    }

    #[test]
    fn test_positive_steer_turns_right() {
        let mut car = moving(15.0);
        let input = TickInput {
            steer: 1.0,
            throttle: 0.3,
            ..Default::default()
        };
        for _ in 0..60 {
            flat_tick(&mut car, &input);
        }
        assert!(car.state().yaw > 0.1);
        assert!(car.state().steer_smoothed > 0.9);
        assert!(car.telemetry().lateral.abs() > 0.0);
    }

    #[test]
    fn test_zero_wheelbase_degrades_to_no_yaw() {
        let tuning = VehicleTuning {
            wheelbase: 0.0,
            ..Default::default()
        };
        let mut car = VehicleDynamics::new(tuning, VehicleState::spawn(Vec3::ZERO, 0.0));
        car.state_mut().velocity = Vec3::new(0.0, 0.0, 10.0);
        let input = TickInput {
            steer: 1.0,
            ..Default::default()
        };
        for _ in 0..120 {
            flat_tick(&mut car, &input);
        }
        assert_eq!(car.state().yaw, 0.0);
        assert!(car.state().is_finite());
    }

    #[test]
    fn test_brake_at_rest_reverses() {
        let mut car = car();
        let brake = TickInput {
            brake: 1.0,
            ..Default::default()
        };
        for _ in 0..(10 * 120) {
            flat_tick(&mut car, &brake);
        }
        let v = car.state().forward_speed();
        assert!(v < 0.0);
        assert!(v >= -car.tuning().max_reverse_speed - 1e-4);
    }

    #[test]
    fn test_brake_while_rolling_stops_before_reversing() {
        let mut car = moving(20.0);
        let brake = TickInput {
            brake: 1.0,
            ..Default::default()
        };
        flat_tick(&mut car, &brake);
        let v = car.state().forward_speed();
        assert!(v > 0.0 && v < 20.0);
    }

    #[test]
    fn test_offroad_coasts_shorter() {
        let tuning = VehicleTuning::default();
        let grass = Surface::classify(false, &tuning);
        let mut on_track = moving(20.0);
        let mut off_track = moving(20.0);
        for _ in 0..120 {
            on_track.update(SIM_DT, &TickInput::default(), &Surface::track(), &GroundInfo::flat());
            off_track.update(SIM_DT, &TickInput::default(), &grass, &GroundInfo::flat());
        }
        assert!(off_track.state().forward_speed() < on_track.state().forward_speed());
    }

    #[test]
    fn test_handbrake_keeps_more_slide() {
        let mut gripping = car();
        let mut sliding = car();
        for c in [&mut gripping, &mut sliding] {
            c.state_mut().velocity = Vec3::new(6.0, 0.0, 15.0);
        }
        let handbrake = TickInput {
            handbrake: 1.0,
            ..Default::default()
        };
        for _ in 0..10 {
            flat_tick(&mut gripping, &TickInput::default());
            flat_tick(&mut sliding, &handbrake);
        }
        let lateral = |c: &VehicleDynamics| {
            let v = c.state().velocity;
            Vec2::new(v.x, v.z).dot(c.state().right()).abs()
        };
        assert!(lateral(&sliding) > lateral(&gripping));
    }

    #[test]
    fn test_airborne_round_trip() {
        let mut car = moving(15.0);
        let ramp_edge = GroundInfo {
            at_launch_edge: true,
            launch_angle: 0.3,
            launch_direction: Vec2::Y,
            on_elevated_surface: true,
            ..GroundInfo::flat()
        };

        let outcome = car.update(SIM_DT, &TickInput::default(), &Surface::track(), &ramp_edge);
        let (_, vertical) = outcome.launched.expect("should launch");
        // 15 * sin(0.3) * 0.55 ≈ 2.44, lifted to the 3 m/s floor
        assert!(vertical >= 3.0);
        assert!(car.state().velocity.y >= 3.0);
        assert!(car.state().is_airborne);
        assert!(car.state().position.y > 0.0);

        let mut landed = None;
        let mut peak = 0.0f32;
        for _ in 0..600 {
            let outcome = flat_tick(&mut car, &TickInput::default());
            peak = peak.max(car.state().position.y);
            if let Some(l) = outcome.landed {
                landed = Some(l);
                break;
            }
            assert!(car.state().is_airborne);
        }
        let (landing_speed, air_time) = landed.expect("should come back down");
        assert!(!car.state().is_airborne);
        assert_eq!(car.state().velocity.y, 0.0);
        assert_eq!(car.state().position.y, 0.0);
        assert!(landing_speed > 2.5);
        assert!(air_time > 0.2);
        assert!(peak > 0.1);
    }

    #[test]
    fn test_no_launch_below_min_speed() {
        let mut car = moving(5.0);
        let ramp_edge = GroundInfo {
            at_launch_edge: true,
            launch_angle: 0.3,
            on_elevated_surface: true,
            height: 1.4,
            ..GroundInfo::flat()
        };
        let outcome = car.update(SIM_DT, &TickInput::default(), &Surface::track(), &ramp_edge);
        assert!(outcome.launched.is_none());
        assert!(!car.state().is_airborne);
        assert_eq!(car.state().position.y, 1.4);
        assert_eq!(car.state().velocity.y, 0.0);
    }

    #[test]
    fn test_ground_dropping_away_goes_airborne() {
        let mut car = moving(10.0);
        car.state_mut().position.y = 2.0;
        flat_tick(&mut car, &TickInput::default());
        assert!(car.state().is_airborne);
        assert!(car.state().position.y > 1.9);
    }

    #[test]
    fn test_pitch_follows_ramp_slope() {
        let mut car = moving(10.0);
        let slope = GroundInfo {
            on_elevated_surface: true,
            height: 0.5,
            normal: Vec3::new(0.0, 1.0, -0.2).normalize(),
            ..GroundInfo::flat()
        };
        for _ in 0..120 {
            car.update(SIM_DT, &TickInput::default(), &Surface::track(), &slope);
        }
        assert!(car.state().pitch > 0.15, "nose should point up the ramp");
    }

    #[test]
    fn test_non_finite_input_is_ignored() {
        let mut car = moving(10.0);
        let input = TickInput {
            throttle: f32::NAN,
            steer: f32::INFINITY,
            brake: f32::NEG_INFINITY,
            ..Default::default()
        };
        flat_tick(&mut car, &input);
        assert!(car.state().is_finite());
        assert_eq!(car.state().steer_smoothed, 0.0);
    }

    fn poisoned() -> (VehicleDynamics, VehicleState) {
        let mut car = moving(10.0);
        flat_tick(&mut car, &throttle(1.0));
        let good = *car.state();
        car.state_mut().velocity.x = f32::NAN;
        (car, good)
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "non-finite")]
    fn test_non_finite_state_panics_in_debug() {
        let (mut car, _) = poisoned();
        flat_tick(&mut car, &throttle(1.0));
    }

    #[cfg(not(debug_assertions))]
    #[test]
    fn test_non_finite_state_restores_last_valid() {
        let (mut car, good) = poisoned();
        flat_tick(&mut car, &throttle(1.0));
        assert_eq!(*car.state(), good);
        assert_eq!(*car.telemetry(), Telemetry::default());

        // Keeps driving normally from there
        flat_tick(&mut car, &throttle(1.0));
        assert!(car.state().is_finite());
        assert!(car.state().forward_speed() > good.forward_speed());
    }

    #[test]
    fn test_bad_dt_is_a_no_op() {
        let mut car = moving(10.0);
        let before = *car.state();
        car.update(0.0, &throttle(1.0), &Surface::track(), &GroundInfo::flat());
        car.update(f32::NAN, &throttle(1.0), &Surface::track(), &GroundInfo::flat());
        assert_eq!(*car.state(), before);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]
        #[test]
        fn prop_speed_never_exceeds_limit(
            inputs in prop::collection::vec((0.0f32..=1.0, 0.0f32..=1.0, 0.0f32..=1.0, -1.0f32..=1.0), 1..400),
            nitro in prop::bool::ANY,
        ) {
            let mut car = car();
            if nitro {
                car.activate_nitro(1000.0, 1.8);
            }
            let limit = car.tuning().speed_limit(car.state().nitro_multiplier);
            for (throttle, brake, handbrake, steer) in inputs {
                // Hold each sample for a while so high speeds are reached
                for _ in 0..8 {
                    let input = TickInput { throttle, brake, handbrake, steer, reset_requested: false };
                    flat_tick(&mut car, &input);
                    prop_assert!(car.state().speed() <= limit + 1e-3);
                    prop_assert!(car.state().is_finite());
                }
            }
        }
    }
}
