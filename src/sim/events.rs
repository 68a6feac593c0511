//! Outbound simulation events
//!
//! Every event is both buffered on the simulation (see
//! `PhysicsSimulation::drain_events`) and delivered to the optional
//! [`Collaborator`].

use serde::{Deserialize, Serialize};

use super::state::{JumpKind, ModeKind};
use crate::level::{ModifierKind, ModifierParams};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SimEvent {
    Jump { kind: JumpKind },
    /// Death sequence started; colour of the hazard that killed the player
    Death { color: String },
    /// Visual burst at the player's pixel position
    Explosion { x: f32, y: f32, color: String },
    /// Player was respawned after the settle window
    DeathFinished { auto_restart: bool },
    LevelComplete,
    /// Pixel position the player was moved to
    Teleport { x: f32, y: f32 },
    ModifierActivated { kind: ModifierKind, params: ModifierParams },
    TimeWarpEnded,
    GroupUnlocked { group: u32 },
    ModeChanged { mode: ModeKind },
}

impl SimEvent {
    pub fn name(&self) -> &'static str {
        match self {
            SimEvent::Jump { .. } => "jump",
            SimEvent::Death { .. } => "death",
            SimEvent::Explosion { .. } => "explosion",
            SimEvent::DeathFinished { .. } => "death_finished",
            SimEvent::LevelComplete => "level_complete",
            SimEvent::Teleport { .. } => "teleport",
            SimEvent::ModifierActivated { .. } => "modifier_activated",
            SimEvent::TimeWarpEnded => "time_warp_ended",
            SimEvent::GroupUnlocked { .. } => "group_unlocked",
            SimEvent::ModeChanged { .. } => "mode_changed",
        }
    }

    /// Hand this event to the matching collaborator callback
    pub fn deliver(&self, collaborator: &mut dyn Collaborator) {
        match self {
            SimEvent::Jump { kind } => collaborator.on_jump(*kind),
            SimEvent::Death { color } => collaborator.on_death(color),
            SimEvent::Explosion { x, y, color } => collaborator.on_explosion(*x, *y, color),
            SimEvent::DeathFinished { auto_restart } => collaborator.on_death_finished(*auto_restart),
            SimEvent::LevelComplete => collaborator.on_level_complete(),
            SimEvent::Teleport { x, y } => collaborator.on_teleport(*x, *y),
            SimEvent::ModifierActivated { kind, params } => collaborator.on_modifier_activate(*kind, params),
            SimEvent::TimeWarpEnded => collaborator.on_time_warp_ended(),
            SimEvent::GroupUnlocked { group } => collaborator.on_group_unlocked(*group),
            SimEvent::ModeChanged { mode } => collaborator.on_mode_changed(*mode),
        }
    }
}

/// Event sink for audio, camera and render layers
///
/// Every method defaults to a no-op, so a host implements only what it
/// consumes.
pub trait Collaborator {
    fn on_jump(&mut self, _kind: JumpKind) {}
    fn on_death(&mut self, _color: &str) {}
    fn on_explosion(&mut self, _x: f32, _y: f32, _color: &str) {}
    fn on_death_finished(&mut self, _auto_restart: bool) {}
    fn on_level_complete(&mut self) {}
    fn on_teleport(&mut self, _x: f32, _y: f32) {}
    fn on_modifier_activate(&mut self, _kind: ModifierKind, _params: &ModifierParams) {}
    fn on_time_warp_ended(&mut self) {}
    fn on_group_unlocked(&mut self, _group: u32) {}
    fn on_mode_changed(&mut self, _mode: ModeKind) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::ParamValue;

    #[derive(Default)]
    struct Camera {
        shakes: Vec<f64>,
        unlocked: Vec<u32>,
    }

    impl Collaborator for Camera {
        fn on_modifier_activate(&mut self, kind: ModifierKind, params: &ModifierParams) {
            if kind == ModifierKind::Shake {
                self.shakes
                    .push(params.get("intensity").and_then(ParamValue::as_f64).unwrap_or(1.0));
            }
        }

        fn on_group_unlocked(&mut self, group: u32) {
            self.unlocked.push(group);
        }
    }

    #[test]
    fn test_deliver_routes_to_callbacks() {
        let mut camera = Camera::default();
        let mut params = ModifierParams::new();
        params.insert("intensity".to_string(), ParamValue::Number(2.5));

        SimEvent::ModifierActivated {
            kind: ModifierKind::Shake,
            params,
        }
        .deliver(&mut camera);
        SimEvent::GroupUnlocked { group: 7 }.deliver(&mut camera);
        // Unimplemented callbacks are no-ops
        SimEvent::LevelComplete.deliver(&mut camera);

        assert_eq!(camera.shakes, vec![2.5]);
        assert_eq!(camera.unlocked, vec![7]);
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_string(&SimEvent::GroupUnlocked { group: 3 }).unwrap();
        assert_eq!(json, r#"{"event":"group_unlocked","group":3}"#);
        let json = serde_json::to_string(&SimEvent::LevelComplete).unwrap();
        assert_eq!(json, r#"{"event":"level_complete"}"#);
    }
}
