//! Gameplay tuning
//!
//! Every physics and timing constant the simulation reads, loadable from JSON.
//! Missing fields fall back to the defaults below.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::SIM_DT_MS;
use crate::level::Color;

#[derive(Debug, Error)]
pub enum TuningError {
    #[error("failed to read tuning file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid tuning JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid tuning value: {0}")]
    Invalid(String),
}

/// Gameplay constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    // === Classic mode ===
    /// Gravity, blocks/tick² (positive is down)
    pub gravity: f32,
    /// Terminal fall speed, blocks/tick
    pub max_fall_speed: f32,
    /// Horizontal speed along facing, blocks/tick
    pub horizontal_speed: f32,
    /// Upward speed given by either jump, blocks/tick
    pub jump_velocity: f32,
    /// Grace window after leaving a platform (ms)
    pub coyote_ms: f64,
    /// Minimum spacing between accepted jumps (ms)
    pub jump_buffer_ms: f64,
    /// Airborne spin, degrees per second
    pub rotation_speed_deg: f32,

    // === Clipper mode ===
    pub lane_switch_cooldown_ms: f64,
    /// Free-move vertical speed, blocks/tick
    pub free_move_speed: f32,

    // === Triggers ===
    pub teleport_distance_px: f32,
    pub teleport_cooldown_ticks: u32,
    /// Modifier cells re-arm once the player is farther than this (blocks)
    pub modifier_radius: f32,

    // === Death / spawn ===
    pub death_settle_ms: f64,
    pub auto_restart: bool,
    pub spawn_x: f32,
    /// Spawn row; `None` places the player on the floor
    pub spawn_y: Option<f32>,
    /// Explosion colour when the hazard has no colour of its own
    pub death_color: String,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            gravity: 0.015,
            max_fall_speed: 0.4,
            horizontal_speed: 0.1,
            jump_velocity: 0.3,
            coyote_ms: 200.0,
            jump_buffer_ms: 200.0,
            rotation_speed_deg: 180.0,

            lane_switch_cooldown_ms: 150.0,
            free_move_speed: 0.15,

            teleport_distance_px: 100.0,
            teleport_cooldown_ticks: 15,
            modifier_radius: 1.5,

            death_settle_ms: 500.0,
            auto_restart: true,
            spawn_x: 0.0,
            spawn_y: None,
            death_color: "#ff0000".to_string(),
        }
    }
}

impl Tuning {
    /// Parse tuning from JSON and validate it
    pub fn from_json_str(json: &str) -> Result<Self, TuningError> {
        let tuning: Tuning = serde_json::from_str(json)?;
        tuning.validate()?;
        Ok(tuning)
    }

    /// Load tuning from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TuningError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let tuning = Self::from_json_str(&json)?;
        log::info!("Loaded tuning from {}", path.display());
        Ok(tuning)
    }

    pub fn validate(&self) -> Result<(), TuningError> {
        let non_negative = [
            ("gravity", self.gravity as f64),
            ("max_fall_speed", self.max_fall_speed as f64),
            ("horizontal_speed", self.horizontal_speed as f64),
            ("jump_velocity", self.jump_velocity as f64),
            ("coyote_ms", self.coyote_ms),
            ("jump_buffer_ms", self.jump_buffer_ms),
            ("lane_switch_cooldown_ms", self.lane_switch_cooldown_ms),
            ("free_move_speed", self.free_move_speed as f64),
            ("teleport_distance_px", self.teleport_distance_px as f64),
            ("modifier_radius", self.modifier_radius as f64),
            ("death_settle_ms", self.death_settle_ms),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(TuningError::Invalid(format!("{} must be >= 0, got {}", name, value)));
            }
        }
        let finite = [
            ("rotation_speed_deg", self.rotation_speed_deg),
            ("spawn_x", self.spawn_x),
            ("spawn_y", self.spawn_y.unwrap_or(0.0)),
        ];
        for (name, value) in finite {
            if !value.is_finite() {
                return Err(TuningError::Invalid(format!("{} must be finite, got {}", name, value)));
            }
        }
        if Color::from_hex(&self.death_color).is_none() {
            return Err(TuningError::Invalid(format!(
                "death_color `{}` must be #RRGGBB",
                self.death_color
            )));
        }
        Ok(())
    }

    /// Settle window expressed in fixed ticks (at least one)
    pub fn death_settle_ticks(&self) -> u32 {
        ((self.death_settle_ms / SIM_DT_MS).round() as u32).max(1)
    }
}
