//! Fixed timestep simulation tick
//!
//! [`Simulation`] owns everything one car needs and runs the per-tick flow:
//! project onto the track → classify the surface → query the ground →
//! vehicle update → barrier and side contacts → off-road containment →
//! lap tracking.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::collision::CollisionResolver;
use super::elevation::GroundInfo;
use super::lap::{LapState, LapTracker};
use super::state::{ImpactKind, SimEvent, Telemetry, VehicleState};
use super::timestep::FixedTimestep;
use super::track::{Projection, Surface};
use super::vehicle::VehicleDynamics;
use crate::error::ConfigError;
use crate::layout::Circuit;
use crate::tuning::VehicleTuning;
use crate::{lift, normalize_angle, planar, yaw_of};

/// Driver input for a single tick (deterministic)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TickInput {
    /// Accelerator in [0, 1]
    pub throttle: f32,
    /// Brake in [0, 1]; held at a standstill it reverses
    pub brake: f32,
    /// Handbrake in [0, 1], cuts rear grip
    pub handbrake: f32,
    /// Steering in [-1, 1], positive turns right
    pub steer: f32,
    /// Put the car back on the start line
    pub reset_requested: bool,
}

impl TickInput {
    /// Clamp every axis into range; NaN and infinities become 0
    pub fn sanitized(&self) -> Self {
        fn finite(v: f32) -> f32 {
            if v.is_finite() { v } else { 0.0 }
        }
        Self {
            throttle: finite(self.throttle).clamp(0.0, 1.0),
            brake: finite(self.brake).clamp(0.0, 1.0),
            handbrake: finite(self.handbrake).clamp(0.0, 1.0),
            steer: finite(self.steer).clamp(-1.0, 1.0),
            reset_requested: self.reset_requested,
        }
    }
}

/// Snapshot of the per-tick intermediates, for debug overlays and tests
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Inspection {
    pub tick: u64,
    pub time: f32,
    pub vehicle: VehicleState,
    pub telemetry: Telemetry,
    pub projection: Projection,
    pub surface: Surface,
    pub ground: GroundInfo,
    pub collision_cooldown: f32,
    pub lap_count: u32,
}

pub struct Simulation {
    circuit: Circuit,
    vehicle: VehicleDynamics,
    resolver: CollisionResolver,
    laps: LapTracker,
    timestep: FixedTimestep,
    tick: u64,
    time: f32,
    projection: Projection,
    surface: Surface,
    ground: GroundInfo,
    events: Vec<SimEvent>,
}

impl Simulation {
    /// Place a car at the circuit's start pose
    pub fn new(circuit: Circuit, tuning: VehicleTuning) -> Result<Self, ConfigError> {
        tuning.validate()?;
        let (position, yaw) = circuit.track.start_pose();
        let laps = LapTracker::new(circuit.track.total_length());
        let mut sim = Self {
            vehicle: VehicleDynamics::new(tuning, VehicleState::spawn(position, yaw)),
            circuit,
            resolver: CollisionResolver::new(),
            laps,
            timestep: FixedTimestep::default(),
            tick: 0,
            time: 0.0,
            projection: Projection::default(),
            surface: Surface::track(),
            ground: GroundInfo::flat(),
            events: Vec::new(),
        };
        sim.place_at_start();
        log::info!(
            "Simulation ready: {:.1} m circuit, {} ramps, {} bridges, {} hills",
            sim.circuit.track.total_length(),
            sim.circuit.elevation.ramps().len(),
            sim.circuit.elevation.bridges().len(),
            sim.circuit.elevation.terrain().hills.len()
        );
        Ok(sim)
    }

    /// Feed one rendered frame; runs as many fixed ticks as the frame covers.
    ///
    /// Returns the number of ticks run.
    pub fn advance(&mut self, frame_delta: f32, input: &TickInput) -> u32 {
        let mut steps = 0;
        self.timestep.step(frame_delta, |_| steps += 1);
        for _ in 0..steps {
            self.tick(input);
        }
        steps
    }

    /// Run exactly one fixed tick
    pub fn tick(&mut self, input: &TickInput) {
        if input.reset_requested {
            self.reset();
            return;
        }
        let dt = self.timestep.step_size();
        self.resolver.cool_down(dt);

        let state = *self.vehicle.state();
        let track = &self.circuit.track;
        track.project_into(planar(state.position), &mut self.projection);
        self.surface = Surface::classify(track.on_track(&self.projection), self.vehicle.tuning());
        self.ground = self.circuit.elevation.query(state.position, state.yaw);

        let outcome = self.vehicle.update(dt, input, &self.surface, &self.ground);
        if let Some((forward_speed, vertical_speed)) = outcome.launched {
            self.events.push(SimEvent::Launched {
                forward_speed,
                vertical_speed,
            });
        }
        if let Some((landing_speed, air_time)) = outcome.landed {
            self.events.push(SimEvent::Landed {
                landing_speed,
                air_time,
            });
        }
        if outcome.nitro_ended {
            self.events.push(SimEvent::NitroEnded);
        }

        self.resolve_contacts();
        self.contain(dt);

        self.time += dt;
        self.tick += 1;

        let state = self.vehicle.state();
        self.circuit
            .track
            .project_into(planar(state.position), &mut self.projection);
        if let Some(lap) = self.laps.update(self.projection.s, state.forward_speed(), self.time) {
            self.events.push(SimEvent::LapCompleted(lap));
        }
    }

    fn resolve_contacts(&mut self) {
        let (state, tuning) = self.vehicle.state_and_tuning_mut();

        let barrier = self
            .circuit
            .track
            .check_barrier_collision(state.position, state.yaw, state.velocity, tuning);
        if barrier.collided {
            let impact = self.resolver.resolve(
                state,
                ImpactKind::Barrier,
                barrier.normal,
                barrier.penetration,
                barrier.impact_speed,
                tuning,
            );
            if let Some(event) = impact {
                self.events.push(SimEvent::Impact(event));
            }
        }

        if let Some(side) = self.ground.side_collision {
            let speed = state.velocity.length();
            let impact = self
                .resolver
                .resolve(state, side.kind.into(), side.normal, side.penetration, speed, tuning);
            if let Some(event) = impact {
                self.events.push(SimEvent::Impact(event));
            }
        }
    }

    /// Nudge a car that wandered far off the track back toward the centerline
    fn contain(&mut self, dt: f32) {
        let (state, tuning) = self.vehicle.state_and_tuning_mut();
        let track = &self.circuit.track;
        let projection = track.project(planar(state.position));
        let excess = projection.distance - (track.half_width() + tuning.soft_margin);
        if excess <= 0.0 {
            return;
        }
        let pull = -projection.normal * excess * (tuning.soft_push_rate * dt).min(1.0);
        state.position += lift(pull, 0.0);
        log::debug!("Soft push-back {:.3} m, {excess:.1} m past the margin", pull.length());
    }

    /// Back to the start line at rest, laps cleared
    pub fn reset(&mut self) {
        self.place_at_start();
        self.events.push(SimEvent::Reset);
        log::info!("Vehicle reset to start");
    }

    fn place_at_start(&mut self) {
        let (position, yaw) = self.circuit.track.start_pose();
        let ground = self.circuit.elevation.query(position, yaw);
        let position = lift(planar(position), ground.height);

        self.vehicle.reset(position, yaw);
        self.resolver.reset();
        self.timestep.reset();
        self.circuit
            .track
            .project_into(planar(position), &mut self.projection);
        self.surface = Surface::classify(self.circuit.track.on_track(&self.projection), self.vehicle.tuning());
        self.ground = ground;
        self.laps.reset(self.projection.s, self.time);
    }

    pub fn activate_nitro(&mut self, duration: f32, multiplier: f32) {
        self.vehicle.activate_nitro(duration, multiplier);
    }

    pub fn vehicle(&self) -> &VehicleState {
        self.vehicle.state()
    }

    pub fn telemetry(&self) -> &Telemetry {
        self.vehicle.telemetry()
    }

    pub fn tuning(&self) -> &VehicleTuning {
        self.vehicle.tuning()
    }

    pub fn lap(&self) -> &LapState {
        self.laps.state()
    }

    /// Ground under the car at the start of the last tick
    pub fn ground(&self) -> &GroundInfo {
        &self.ground
    }

    /// Surface under the car at the start of the last tick
    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn circuit(&self) -> &Circuit {
        &self.circuit
    }

    /// Sim time (s)
    pub fn time(&self) -> f32 {
        self.time
    }

    /// Interpolation factor toward the next tick, for rendering
    pub fn alpha(&self) -> f32 {
        self.timestep.alpha()
    }

    /// Take every event emitted since the last drain
    pub fn drain_events(&mut self) -> Vec<SimEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn inspect(&self) -> Inspection {
        Inspection {
            tick: self.tick,
            time: self.time,
            vehicle: *self.vehicle.state(),
            telemetry: *self.vehicle.telemetry(),
            projection: self.projection,
            surface: self.surface,
            ground: self.ground,
            collision_cooldown: self.resolver.cooldown_remaining(),
            lap_count: self.laps.state().lap_count,
        }
    }

    /// Demo driver: chase a point ahead on the centerline at `target_speed`
    pub fn autopilot(&self, target_speed: f32) -> TickInput {
        let state = self.vehicle.state();
        let track = &self.circuit.track;
        let p = planar(state.position);
        let speed = state.forward_speed();

        let look_ahead = 10.0 + speed.max(0.0) * 0.6;
        let (target, _) = track.point_at(track.project(p).s + look_ahead);
        let to_target: Vec2 = target - p;
        let error = normalize_angle(yaw_of(to_target) - state.yaw);

        TickInput {
            throttle: if speed < target_speed { 1.0 } else { 0.0 },
            brake: if speed > target_speed + 5.0 { 0.5 } else { 0.0 },
            handbrake: 0.0,
            steer: (error * 2.0).clamp(-1.0, 1.0),
            reset_requested: false,
        }
    }
}
