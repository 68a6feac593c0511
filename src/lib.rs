//! Gridrunner - a grid-based platformer runtime
//!
//! Core modules:
//! - `level`: Level grammar, typed cells and the wraparound grid
//! - `sim`: Deterministic simulation (player, collision, triggers, time)
//! - `tuning`: Data-driven gameplay constants

pub mod level;
pub mod sim;
pub mod tuning;

pub use level::{Cell, CellKind, Collision, LevelError, Lock, Matrix, parse_level, parse_level_json};
pub use sim::{Collaborator, PhysicsSimulation, PlayerState, SimEvent, TickInput};
pub use tuning::Tuning;

/// Simulation constants
pub mod consts {
    /// Fixed simulation timestep in milliseconds (60 Hz)
    pub const SIM_DT_MS: f64 = 1000.0 / 60.0;
    /// Maximum substeps per host frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;
    /// Largest host frame delta accepted before clamping (ms)
    pub const MAX_FRAME_MS: f64 = 100.0;

    /// Pixels per block, used for pixel-space event payloads
    pub const BLOCK_SIZE_PX: f32 = 50.0;
    /// Player box edge length in blocks
    pub const PLAYER_SIZE: f32 = 1.0;

    /// Vertical offset of the head probe above the player box
    pub const HEAD_PROBE_EPSILON: f32 = 0.001;
    /// Distance from the floor that still counts as standing on it
    pub const GROUND_EPSILON: f32 = 1e-4;
}

/// Wrap an angle in degrees into [0, 360)
#[inline]
pub fn wrap_degrees(angle: f32) -> f32 {
    let wrapped = angle.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

/// Wrap a column index into [0, width)
#[inline]
pub fn wrap_column(col: i64, width: usize) -> usize {
    col.rem_euclid(width as i64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_degrees() {
        assert_eq!(wrap_degrees(0.0), 0.0);
        assert_eq!(wrap_degrees(370.0), 10.0);
        assert_eq!(wrap_degrees(-90.0), 270.0);
        assert!(wrap_degrees(-1e-9) < 360.0);
    }

    #[test]
    fn test_wrap_column() {
        assert_eq!(wrap_column(5, 4), 1);
        assert_eq!(wrap_column(-1, 4), 3);
        assert_eq!(wrap_column(8, 4), 0);
    }
}
