//! Fixed timestep accumulator
//!
//! Turns whatever frame delta the host loop produces into a whole number of
//! fixed simulation steps.

use crate::consts::{MAX_FRAME_DELTA, SIM_DT};

#[derive(Debug, Clone)]
pub struct FixedTimestep {
    step: f32,
    max_frame_delta: f32,
    accumulator: f32,
    total_ticks: u64,
}

impl Default for FixedTimestep {
    fn default() -> Self {
        Self::new(SIM_DT, MAX_FRAME_DELTA)
    }
}

impl FixedTimestep {
    pub fn new(step: f32, max_frame_delta: f32) -> Self {
        Self {
            step: if step.is_finite() && step > 0.0 { step } else { SIM_DT },
            max_frame_delta: max_frame_delta.max(0.0),
            accumulator: 0.0,
            total_ticks: 0,
        }
    }

    /// Feed one rendered frame's delta and run every whole step it covers.
    ///
    /// `tick` must not call back into this scheduler.
    pub fn step<F: FnMut(f32)>(&mut self, frame_delta: f32, mut tick: F) {
        let frame_delta = if frame_delta.is_finite() {
            frame_delta.clamp(0.0, self.max_frame_delta)
        } else {
            0.0
        };
        self.accumulator += frame_delta;

        while self.accumulator >= self.step {
            tick(self.step);
            self.accumulator -= self.step;
            self.total_ticks += 1;
        }
    }

    /// Fixed step size (seconds)
    pub fn step_size(&self) -> f32 {
        self.step
    }

    /// How far the accumulator is into the next step, in [0, 1)
    pub fn alpha(&self) -> f32 {
        self.accumulator / self.step
    }

    pub fn total_ticks(&self) -> u64 {
        self.total_ticks
    }

    /// Drop any partial step (after a reset or a long pause)
    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }
}
