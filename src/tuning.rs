//! Vehicle handling constants
//!
//! Every number the dynamics model reads lives here so a tuning profile can be
//! loaded from JSON, swapped in tests, or tweaked without touching the model.

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, require_non_negative, require_positive};

/// Vehicle tuning profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleTuning {
    // === Chassis ===
    /// Distance between axles (m); zero degrades to no yaw response
    pub wheelbase: f32,
    /// Half the car's length, used for barrier contact (m)
    pub half_length: f32,
    /// Half the car's width, used for barrier contact (m)
    pub half_width: f32,

    // === Steering ===
    /// Front wheel lock at full steer (rad)
    pub max_steer_angle: f32,
    /// Exponential approach rate of the smoothed steer value (1/s)
    pub steer_rate: f32,
    /// Fraction of the steer angle left at top speed
    pub high_speed_steer_scale: f32,

    // === Longitudinal ===
    /// Full-throttle acceleration (m/s²)
    pub engine_accel: f32,
    /// Full-brake deceleration (m/s²)
    pub brake_accel: f32,
    /// Reverse acceleration at full brake (m/s²)
    pub reverse_accel: f32,
    /// Forward speed below which braking engages reverse (m/s)
    pub reverse_engage_speed: f32,
    /// Top reverse speed (m/s)
    pub max_reverse_speed: f32,
    /// Quadratic aerodynamic drag coefficient (1/m)
    pub drag: f32,
    /// Constant rolling resistance (m/s²)
    pub rolling_resistance: f32,
    /// Speed under which resistance fades out (m/s)
    pub low_speed_fade: f32,
    /// Top speed without nitro (m/s)
    pub max_speed: f32,

    // === Grip ===
    /// Lateral slip correction strength (m/s²)
    pub lateral_grip: f32,
    /// Grip multiplier at full handbrake
    pub handbrake_grip_scale: f32,
    /// Grip multiplier off the track
    pub offroad_grip_scale: f32,
    /// Drag multiplier off the track
    pub offroad_drag_scale: f32,
    /// Engine multiplier off the track at low speed (keeps the car from bogging down in grass)
    pub offroad_torque_boost: f32,
    /// Speed under which the off-road torque boost applies (m/s)
    pub offroad_boost_speed: f32,

    // === Airborne ===
    /// Downward acceleration (m/s²)
    pub gravity: f32,
    /// Height above ground that counts as airborne (m)
    pub airborne_epsilon: f32,
    /// Steering authority left in the air
    pub air_steer_authority: f32,
    /// Yaw rate at full (reduced) air steer (rad/s)
    pub air_yaw_rate: f32,
    /// Pitch per m/s of vertical speed in the air (rad·s/m)
    pub air_pitch_factor: f32,
    /// Pitch smoothing rate (1/s)
    pub pitch_rate: f32,

    // === Ramps ===
    /// Forward speed needed to launch off a ramp edge (m/s)
    pub launch_min_speed: f32,
    /// Share of forward speed converted into launch velocity
    pub launch_multiplier: f32,
    /// Floor on launch vertical velocity (m/s)
    pub min_launch_velocity: f32,

    // === Nitro ===
    /// Top speed multiplier while nitro is active
    pub nitro_top_speed_scale: f32,

    // === Collisions ===
    /// Share of the normal velocity kept after a bounce
    pub restitution: f32,
    /// Velocity scale applied after a bounce
    pub friction: f32,
    /// Extra push-out distance beyond the penetration (m)
    pub collision_epsilon: f32,
    /// Window in which repeated contacts count as the same impact (s)
    pub collision_cooldown: f32,

    // === Off-road containment ===
    /// Distance beyond the track edge before the car is nudged back (m)
    pub soft_margin: f32,
    /// Share of the excess distance removed per second
    pub soft_push_rate: f32,
}

impl Default for VehicleTuning {
    fn default() -> Self {
        Self {
            // Chassis
            wheelbase: 2.6,
            half_length: 2.1,
            half_width: 0.95,

            // Steering
            max_steer_angle: 0.55,
            steer_rate: 8.0,
            high_speed_steer_scale: 0.35,

            // Longitudinal
            engine_accel: 18.0,
            brake_accel: 32.0,
            reverse_accel: 9.0,
            reverse_engage_speed: 1.0,
            max_reverse_speed: 10.0,
            drag: 0.0035,
            rolling_resistance: 0.6,
            low_speed_fade: 2.0,
            max_speed: 45.0,

            // Grip
            lateral_grip: 28.0,
            handbrake_grip_scale: 0.35,
            offroad_grip_scale: 0.6,
            offroad_drag_scale: 2.5,
            offroad_torque_boost: 1.4,
            offroad_boost_speed: 6.0,

            // Airborne
            gravity: 25.0,
            airborne_epsilon: 0.1,
            air_steer_authority: 0.2,
            air_yaw_rate: 2.0,
            air_pitch_factor: 0.03,
            pitch_rate: 6.0,

            // Ramps
            launch_min_speed: 8.0,
            launch_multiplier: 0.55,
            min_launch_velocity: 3.0,

            // Nitro
            nitro_top_speed_scale: 1.5,

            // Collisions
            restitution: 0.3,
            friction: 0.7,
            collision_epsilon: 0.01,
            collision_cooldown: 0.15,

            // Off-road containment
            soft_margin: 25.0,
            soft_push_rate: 2.0,
        }
    }
}

impl VehicleTuning {
    /// Parse a tuning profile; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let tuning: Self = serde_json::from_str(json)?;
        tuning.validate()?;
        Ok(tuning)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject values the model cannot run with.
    ///
    /// A zero wheelbase is accepted (yaw response degrades to zero), but
    /// negative or non-finite numbers are not.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_positive("max_speed", self.max_speed)?;
        require_positive("gravity", self.gravity)?;
        require_positive("nitro_top_speed_scale", self.nitro_top_speed_scale)?;

        let non_negative = [
            ("wheelbase", self.wheelbase),
            ("half_length", self.half_length),
            ("half_width", self.half_width),
            ("max_steer_angle", self.max_steer_angle),
            ("steer_rate", self.steer_rate),
            ("high_speed_steer_scale", self.high_speed_steer_scale),
            ("engine_accel", self.engine_accel),
            ("brake_accel", self.brake_accel),
            ("reverse_accel", self.reverse_accel),
            ("reverse_engage_speed", self.reverse_engage_speed),
            ("max_reverse_speed", self.max_reverse_speed),
            ("drag", self.drag),
            ("rolling_resistance", self.rolling_resistance),
            ("low_speed_fade", self.low_speed_fade),
            ("lateral_grip", self.lateral_grip),
            ("handbrake_grip_scale", self.handbrake_grip_scale),
            ("offroad_grip_scale", self.offroad_grip_scale),
            ("offroad_drag_scale", self.offroad_drag_scale),
            ("offroad_torque_boost", self.offroad_torque_boost),
            ("offroad_boost_speed", self.offroad_boost_speed),
            ("airborne_epsilon", self.airborne_epsilon),
            ("air_steer_authority", self.air_steer_authority),
            ("air_yaw_rate", self.air_yaw_rate),
            ("air_pitch_factor", self.air_pitch_factor),
            ("pitch_rate", self.pitch_rate),
            ("launch_min_speed", self.launch_min_speed),
            ("launch_multiplier", self.launch_multiplier),
            ("min_launch_velocity", self.min_launch_velocity),
            ("collision_epsilon", self.collision_epsilon),
            ("collision_cooldown", self.collision_cooldown),
            ("soft_margin", self.soft_margin),
            ("soft_push_rate", self.soft_push_rate),
        ];
        for (what, value) in non_negative {
            require_non_negative(what, value)?;
        }

        for (what, value) in [("restitution", self.restitution), ("friction", self.friction)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidValue { what, value });
            }
        }
        Ok(())
    }

    /// Top speed for the given nitro multiplier
    #[inline]
    pub fn speed_limit(&self, nitro_multiplier: f32) -> f32 {
        if nitro_multiplier > 1.0 {
            self.max_speed * self.nitro_top_speed_scale
        } else {
            self.max_speed
        }
    }
}
