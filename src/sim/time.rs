//! Simulation clock
//!
//! Turns host frame deltas into a whole number of fixed steps. Pausing is a
//! delta-zeroing gate, not a suspension: while paused every frame yields zero
//! steps, and resuming drops the host timestamp baseline so the first frame
//! after a pause does not try to catch up.

use serde::{Deserialize, Serialize};

use crate::consts::{MAX_FRAME_MS, MAX_SUBSTEPS, SIM_DT_MS};

/// A temporary time-scale override
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeWarp {
    pub scale: f32,
    /// Host (unscaled) milliseconds until the warp reverts
    pub remaining_ms: f64,
}

/// Result of feeding one host frame to the clock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameSteps {
    /// Fixed steps to run this frame
    pub steps: u32,
    /// A time warp ran out during this frame
    pub warp_expired: bool,
}

#[derive(Debug, Clone)]
pub struct TimeController {
    base_scale: f32,
    warp: Option<TimeWarp>,
    paused: bool,
    accumulator_ms: f64,
    last_update_ms: Option<f64>,
    step_ms: f64,
    max_substeps: u32,
}

impl Default for TimeController {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeController {
    pub fn new() -> Self {
        Self::with_step(SIM_DT_MS, MAX_SUBSTEPS)
    }

    pub fn with_step(step_ms: f64, max_substeps: u32) -> Self {
        Self {
            base_scale: 1.0,
            warp: None,
            paused: false,
            accumulator_ms: 0.0,
            last_update_ms: None,
            step_ms,
            max_substeps: max_substeps.max(1),
        }
    }

    pub fn step_ms(&self) -> f64 {
        self.step_ms
    }

    pub fn pause(&mut self) {
        if !self.paused {
            log::debug!("Simulation paused");
        }
        self.paused = true;
    }

    pub fn resume(&mut self) {
        if self.paused {
            log::debug!("Simulation resumed");
        }
        self.paused = false;
        self.last_update_ms = None;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Set the persistent time scale (a running warp still takes precedence)
    pub fn set_time_scale(&mut self, scale: f32) {
        self.base_scale = scale.max(0.0);
    }

    /// Effective time scale right now
    pub fn time_scale(&self) -> f32 {
        self.warp.map(|w| w.scale).unwrap_or(self.base_scale)
    }

    /// Override the time scale for `duration_ms` of host time, replacing any running warp
    pub fn apply_warp(&mut self, scale: f32, duration_ms: f64) {
        log::debug!("Time warp x{} for {}ms", scale, duration_ms);
        self.warp = Some(TimeWarp {
            scale: scale.max(0.0),
            remaining_ms: duration_ms.max(0.0),
        });
    }

    pub fn clear_warp(&mut self) {
        self.warp = None;
    }

    pub fn warp(&self) -> Option<&TimeWarp> {
        self.warp.as_ref()
    }

    /// Convert a host timestamp into a frame delta
    ///
    /// Returns zero while paused and on the first call after construction or
    /// `resume()`, which only establishes the baseline.
    pub fn frame_delta(&mut self, now_ms: f64) -> f64 {
        if self.paused {
            self.last_update_ms = None;
            return 0.0;
        }
        let delta = match self.last_update_ms {
            Some(last) => (now_ms - last).max(0.0),
            None => 0.0,
        };
        self.last_update_ms = Some(now_ms);
        delta
    }

    /// Feed a host frame delta and get the number of fixed steps to run
    pub fn advance(&mut self, delta_ms: f64) -> FrameSteps {
        if self.paused || !delta_ms.is_finite() {
            return FrameSteps::default();
        }
        let delta_ms = delta_ms.clamp(0.0, MAX_FRAME_MS);
        let scale = self.time_scale() as f64;

        let mut warp_expired = false;
        if let Some(warp) = &mut self.warp {
            warp.remaining_ms -= delta_ms;
            if warp.remaining_ms <= 0.0 {
                self.warp = None;
                warp_expired = true;
            }
        }

        self.accumulator_ms += delta_ms * scale;
        let mut steps = 0;
        while self.accumulator_ms >= self.step_ms && steps < self.max_substeps {
            self.accumulator_ms -= self.step_ms;
            steps += 1;
        }
        if steps == self.max_substeps && self.accumulator_ms >= self.step_ms {
            log::debug!(
                "Dropping {:.1}ms of simulation time after {} substeps",
                self.accumulator_ms,
                steps
            );
            self.accumulator_ms %= self.step_ms;
        }

        FrameSteps {
            steps,
            warp_expired,
        }
    }

    /// Forget any partially accumulated step
    pub fn reset_accumulator(&mut self) {
        self.accumulator_ms = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_steps_from_delta() {
        let mut time = TimeController::with_step(10.0, 8);
        assert_eq!(time.advance(25.0).steps, 2);
        // 5ms carried over
        assert_eq!(time.advance(5.0).steps, 1);
        assert_eq!(time.advance(9.0).steps, 0);
    }

    #[test]
    fn test_pause_zeroes_delta() {
        let mut time = TimeController::with_step(10.0, 8);
        time.pause();
        time.pause();
        assert!(time.is_paused());
        assert_eq!(time.advance(50.0).steps, 0);
        assert_eq!(time.frame_delta(1000.0), 0.0);
        time.resume();
        time.resume();
        assert!(!time.is_paused());
        assert_eq!(time.advance(10.0).steps, 1);
    }

    #[test]
    fn test_resume_resets_baseline() {
        let mut time = TimeController::new();
        assert_eq!(time.frame_delta(100.0), 0.0);
        assert_eq!(time.frame_delta(116.0), 16.0);
        time.pause();
        time.resume();
        // Five seconds later: no catch-up delta
        assert_eq!(time.frame_delta(5116.0), 0.0);
        assert_eq!(time.frame_delta(5132.0), 16.0);
    }

    #[test]
    fn test_substep_cap() {
        let mut time = TimeController::with_step(10.0, 3);
        // 100ms frame clamped, capped at 3 steps, excess dropped
        assert_eq!(time.advance(500.0).steps, 3);
        assert_eq!(time.advance(0.0).steps, 0);
    }

    #[test]
    fn test_time_scale() {
        let mut time = TimeController::with_step(10.0, 8);
        time.set_time_scale(0.5);
        assert_eq!(time.advance(20.0).steps, 1);
        time.set_time_scale(2.0);
        assert_eq!(time.advance(20.0).steps, 4);
    }

    #[test]
    fn test_warp_overrides_and_reverts() {
        let mut time = TimeController::with_step(10.0, 8);
        time.apply_warp(0.5, 30.0);
        assert_eq!(time.time_scale(), 0.5);
        let frame = time.advance(20.0);
        assert_eq!(frame.steps, 1);
        assert!(!frame.warp_expired);

        let frame = time.advance(20.0);
        assert!(frame.warp_expired);
        assert!(time.warp().is_none());
        assert_eq!(time.time_scale(), 1.0);
    }
}
