//! Lap counting
//!
//! A lap is counted when the centerline arclength wraps from the last third
//! of the loop back into the first third while the car is genuinely driving
//! forward, and only if the lap took a plausible amount of time.

use serde::{Deserialize, Serialize};

use super::state::LapCompleted;
use crate::consts::{LAP_MIN_FORWARD_SPEED, LAP_MIN_SECONDS, LAP_WRAP_HIGH, LAP_WRAP_LOW};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LapState {
    /// Sim time the current lap started (s)
    pub lap_start_time: f32,
    pub last_arclength: f32,
    pub lap_count: u32,
    pub best_lap_seconds: Option<f32>,
    pub current_lap_seconds: f32,
    pub last_lap_seconds: Option<f32>,
    /// Every counted lap, in order
    pub lap_times: Vec<f32>,
}

#[derive(Debug, Clone)]
pub struct LapTracker {
    total_length: f32,
    state: LapState,
}

impl LapTracker {
    pub fn new(total_length: f32) -> Self {
        Self {
            total_length,
            state: LapState::default(),
        }
    }

    pub fn state(&self) -> &LapState {
        &self.state
    }

    /// Clear all laps; the clock restarts at `now` from arclength `s`
    pub fn reset(&mut self, s: f32, now: f32) {
        self.state = LapState {
            lap_start_time: now,
            last_arclength: s,
            ..Default::default()
        };
    }

    /// Feed the latest arclength; returns the lap just completed, if any
    pub fn update(&mut self, s: f32, forward_speed: f32, now: f32) -> Option<LapCompleted> {
        let lap = &mut self.state;
        let wrapped = lap.last_arclength > LAP_WRAP_HIGH * self.total_length
            && s < LAP_WRAP_LOW * self.total_length
            && forward_speed > LAP_MIN_FORWARD_SPEED;
        lap.last_arclength = s;

        let elapsed = now - lap.lap_start_time;
        lap.current_lap_seconds = elapsed;
        if !wrapped {
            return None;
        }
        if elapsed <= LAP_MIN_SECONDS {
            log::debug!("Ignoring {elapsed:.2} s lap wrap");
            return None;
        }

        let best = lap.best_lap_seconds.is_none_or(|b| elapsed < b);
        if best {
            lap.best_lap_seconds = Some(elapsed);
        }
        lap.lap_count += 1;
        lap.last_lap_seconds = Some(elapsed);
        lap.lap_times.push(elapsed);
        lap.lap_start_time = now;
        lap.current_lap_seconds = 0.0;

        log::info!("Lap {} completed in {:.2} s{}", lap.lap_count, elapsed, if best { " (best)" } else { "" });
        Some(LapCompleted {
            lap: lap.lap_count,
            seconds: elapsed,
            best,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slow_crossing_does_not_count() {
        let mut tracker = LapTracker::new(100.0);
        tracker.update(70.0, 2.0, 10.0);
        assert!(tracker.update(10.0, 2.0, 10.1).is_none());
        assert_eq!(tracker.state().lap_count, 0);
        // Stationary exactly at the threshold
        tracker.update(90.0, 4.0, 11.0);
        assert!(tracker.update(1.0, 4.0, 11.1).is_none());
        assert_eq!(tracker.state().lap_count, 0);
    }

    #[test]
    fn test_forward_crossing_counts_once() {
        let mut tracker = LapTracker::new(100.0);
        tracker.update(70.0, 10.0, 11.0);
        let lap = tracker.update(10.0, 10.0, 12.0).expect("lap");
        assert_eq!(lap.lap, 1);
        assert!(lap.best);
        assert_eq!(tracker.state().best_lap_seconds, Some(12.0));

        // Staying past the line does not count again
        assert!(tracker.update(12.0, 10.0, 12.1).is_none());
        assert_eq!(tracker.state().lap_count, 1);
    }

    #[test]
    fn test_best_lap_only_improves() {
        let mut tracker = LapTracker::new(100.0);
        tracker.update(70.0, 10.0, 11.0);
        tracker.update(10.0, 10.0, 12.0);

        tracker.update(70.0, 10.0, 20.0);
        let faster = tracker.update(5.0, 10.0, 21.0).expect("lap");
        assert!(faster.best);
        assert_eq!(tracker.state().best_lap_seconds, Some(9.0));

        tracker.update(70.0, 10.0, 35.0);
        let slower = tracker.update(5.0, 10.0, 36.0).expect("lap");
        assert!(!slower.best);
        assert_eq!(tracker.state().best_lap_seconds, Some(9.0));
        assert_eq!(tracker.state().last_lap_seconds, Some(15.0));
        assert_eq!(tracker.state().lap_times, vec![12.0, 9.0, 15.0]);
    }

    #[test]
    fn test_too_short_lap_is_rejected() {
        let mut tracker = LapTracker::new(100.0);
        tracker.update(80.0, 10.0, 2.0);
        assert!(tracker.update(5.0, 10.0, 3.0).is_none());
        assert_eq!(tracker.state().lap_count, 0);
        // The clock keeps running from the original start
        assert_eq!(tracker.state().current_lap_seconds, 3.0);
    }

    #[test]
    fn test_reset_clears_history() {
        let mut tracker = LapTracker::new(100.0);
        tracker.update(70.0, 10.0, 11.0);
        tracker.update(10.0, 10.0, 12.0);
        tracker.reset(0.0, 20.0);
        assert_eq!(tracker.state().lap_count, 0);
        assert!(tracker.state().best_lap_seconds.is_none());
        assert_eq!(tracker.state().lap_start_time, 20.0);
    }
}
