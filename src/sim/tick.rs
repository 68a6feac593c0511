//! Fixed timestep simulation tick
//!
//! [`PhysicsSimulation`] owns the level, the player and the clock. The host
//! feeds it an input snapshot and a frame delta; the clock turns that into a
//! whole number of fixed steps, each of which runs the same ordered pipeline:
//! jump, death handling, integration, probing, resolution.

use std::collections::BTreeSet;

use glam::Vec2;

use super::collision::CollisionSample;
use super::events::{Collaborator, SimEvent};
use super::groups::GroupRegistry;
use super::state::{Facing, Lanes, ModeKind, Player, PlayerState, SessionStats};
use super::teleport::{launch_target, pad_target};
use super::time::TimeController;
use crate::consts::{BLOCK_SIZE_PX, GROUND_EPSILON, PLAYER_SIZE};
use crate::level::{CellKind, CellRef, Collision, Lock, Matrix, ModifierEffect};
use crate::tuning::Tuning;

/// Logical keys held during a tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickInput {
    /// Space: jump (Classic) or free-move hold (Clipper)
    pub space: bool,
    /// ArrowUp / w: jump (Classic) or lane up (Clipper)
    pub up: bool,
    /// ArrowDown / s: lane down (Clipper)
    pub down: bool,
}

impl TickInput {
    /// Build a snapshot from the names of currently held keys
    pub fn from_keys<'a>(keys: impl IntoIterator<Item = &'a str>) -> Self {
        let mut input = Self::default();
        for key in keys {
            match key {
                "Space" | " " => input.space = true,
                "ArrowUp" | "w" | "W" => input.up = true,
                "ArrowDown" | "s" | "S" => input.down = true,
                _ => {}
            }
        }
        input
    }

    pub fn jump(&self) -> bool {
        self.space || self.up
    }
}

/// Countdown between death-begin and respawn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DeathSequence {
    ticks_remaining: u32,
}

pub struct PhysicsSimulation {
    matrix: Matrix,
    /// Level as parsed, restored by `reset()`
    pristine: Matrix,
    lanes: Lanes,
    player: Player,
    tuning: Tuning,
    time: TimeController,
    groups: GroupRegistry,
    collaborator: Option<Box<dyn Collaborator>>,
    events: Vec<SimEvent>,
    /// Event kinds already reported as having no collaborator
    unheard: BTreeSet<&'static str>,
    /// Single-flight death guard
    death: Option<DeathSequence>,
    is_complete: bool,
    on_sticky: bool,
    now_ms: f64,
    travelled: f64,
    stats: SessionStats,
}

impl PhysicsSimulation {
    pub fn new(matrix: Matrix, tuning: Tuning) -> Self {
        Self::with_parts(matrix, tuning, TimeController::new(), GroupRegistry::new())
    }

    /// Build a simulation around an existing clock and group registry
    ///
    /// Groups already unlocked in `groups` are applied to `matrix`.
    pub fn with_parts(matrix: Matrix, tuning: Tuning, time: TimeController, groups: GroupRegistry) -> Self {
        let tuning = match tuning.validate() {
            Ok(()) => tuning,
            Err(e) => {
                log::warn!("Invalid tuning ({}), using defaults", e);
                Tuning::default()
            }
        };
        let lanes = Lanes::for_level(matrix.height());
        let player = Player::new(spawn_point(&tuning, &matrix), ModeKind::Classic, &lanes);
        let pristine = matrix.clone();
        let mut matrix = matrix;
        groups.reapply(&mut matrix);
        let mut sim = Self {
            matrix,
            pristine,
            lanes,
            player,
            tuning,
            time,
            groups,
            collaborator: None,
            events: Vec::new(),
            unheard: BTreeSet::new(),
            death: None,
            is_complete: false,
            on_sticky: false,
            now_ms: 0.0,
            travelled: 0.0,
            stats: SessionStats::default(),
        };
        sim.settle_at_spawn();
        sim
    }

    pub fn with_collaborator(mut self, collaborator: Box<dyn Collaborator>) -> Self {
        self.collaborator = Some(collaborator);
        self
    }

    pub fn set_collaborator(&mut self, collaborator: Option<Box<dyn Collaborator>>) {
        self.collaborator = collaborator;
    }

    // === Host API ===

    /// Advance by one host frame; returns the number of fixed steps run
    pub fn tick(&mut self, input: &TickInput, delta_ms: f64) -> u32 {
        let frame = self.time.advance(delta_ms);
        if frame.warp_expired {
            log::debug!("Time warp ended");
            self.emit(SimEvent::TimeWarpEnded);
        }
        for _ in 0..frame.steps {
            self.step(input);
        }
        frame.steps
    }

    /// Run exactly one fixed step, bypassing the frame accumulator
    pub fn step(&mut self, input: &TickInput) {
        if self.is_complete || self.time.is_paused() {
            return;
        }
        let dt = self.time.step_ms();
        self.now_ms += dt;

        if self.death.is_none() && input.jump() {
            if let Some(kind) = self.player.try_jump(self.now_ms, &self.tuning) {
                self.stats.jumps += 1;
                self.emit(SimEvent::Jump { kind });
            }
        }

        if self.death.is_some() {
            self.advance_death();
            return;
        }

        self.integrate(input);
        let sample = CollisionSample::probe(&self.matrix, self.player.pos);
        if !self.resolve(&sample) {
            return;
        }

        if self.player.is_on_platform {
            self.player.mark_grounded(self.now_ms);
        }
        self.player.advance_rotation(dt, self.tuning.rotation_speed_deg);
    }

    /// Restart the level: pristine matrix, no unlocks, no warp, player at spawn
    ///
    /// The player's mode and the session stats survive. A pending death
    /// sequence is cancelled without a death-finished event.
    pub fn reset(&mut self) {
        self.matrix = self.pristine.clone();
        self.groups.clear();
        self.time.clear_warp();
        self.time.reset_accumulator();
        if self.death.take().is_some() {
            log::debug!("Pending death cancelled by reset");
        }
        self.is_complete = false;
        self.on_sticky = false;
        self.respawn_player();
        log::info!("Level reset");
    }

    /// Swap in a new level, keeping unlocked groups and the player
    ///
    /// Modifier activations are forgotten and a pending death is cancelled.
    pub fn update_matrix(&mut self, matrix: Matrix) {
        self.pristine = matrix.clone();
        self.matrix = matrix;
        self.groups.reapply(&mut self.matrix);
        self.groups.clear_modifiers();
        if self.death.take().is_some() {
            log::debug!("Pending death cancelled by matrix update");
        }
        self.lanes = Lanes::for_level(self.matrix.height());
        let floor_y = self.matrix.floor_level() - PLAYER_SIZE;
        if self.player.pos.y > floor_y {
            self.player.pos.y = floor_y;
        }
        log::info!(
            "Level matrix replaced ({}x{})",
            self.matrix.width(),
            self.matrix.height()
        );
    }

    pub fn pause(&mut self) {
        self.time.pause();
    }

    pub fn resume(&mut self) {
        self.time.resume();
    }

    pub fn is_paused(&self) -> bool {
        self.time.is_paused()
    }

    /// Switch the player's movement mode directly
    pub fn set_mode(&mut self, kind: ModeKind) {
        if self.player.set_mode(kind, &self.lanes) {
            log::debug!("Mode switched to {:?}", kind);
            self.emit(SimEvent::ModeChanged { mode: kind });
        }
    }

    pub fn player_state(&self) -> PlayerState {
        self.player.snapshot()
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn matrix(&self) -> &Matrix {
        &self.matrix
    }

    pub fn groups(&self) -> &GroupRegistry {
        &self.groups
    }

    pub fn time(&self) -> &TimeController {
        &self.time
    }

    pub fn time_mut(&mut self) -> &mut TimeController {
        &mut self.time
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn is_complete(&self) -> bool {
        self.is_complete
    }

    pub fn is_dying(&self) -> bool {
        self.death.is_some()
    }

    /// Simulation time, advanced only by fixed steps
    pub fn now_ms(&self) -> f64 {
        self.now_ms
    }

    pub fn spawn_point(&self) -> Vec2 {
        spawn_point(&self.tuning, &self.matrix)
    }

    /// Take every event buffered since the last drain
    pub fn drain_events(&mut self) -> Vec<SimEvent> {
        std::mem::take(&mut self.events)
    }

    // === Step pipeline ===

    fn integrate(&mut self, input: &TickInput) {
        self.player.teleport_cooldown = self.player.teleport_cooldown.saturating_sub(1);

        let speed = if self.on_sticky {
            self.tuning.horizontal_speed * 0.5
        } else {
            self.tuning.horizontal_speed
        };
        self.player.vel.x = speed * self.player.facing.sign();

        match self.player.mode_kind() {
            ModeKind::Classic => {
                self.player.vel.y = (self.player.vel.y + self.tuning.gravity).min(self.tuning.max_fall_speed);
            }
            ModeKind::Clipper => {
                let delta = if input.up {
                    -1
                } else if input.down {
                    1
                } else {
                    0
                };
                if delta != 0 {
                    self.player.switch_lane(delta, self.now_ms, &self.tuning, &self.lanes);
                }
                self.player.update_free_move(input.space, &self.tuning, &self.lanes);
            }
        }

        self.player.pos += self.player.vel;
        self.travelled += self.player.vel.x.abs() as f64;
        self.stats.score = self.travelled.floor() as u64;

        let floor_y = self.matrix.floor_level() - PLAYER_SIZE;
        if self.player.pos.y >= floor_y - GROUND_EPSILON {
            self.player.pos.y = floor_y;
            self.player.land();
        } else {
            self.player.is_on_platform = false;
        }
        self.on_sticky = false;
    }

    /// Resolve the sampled cells in priority order; false ends the step
    fn resolve(&mut self, sample: &CollisionSample) -> bool {
        let center = sample.center_cell(&self.matrix).map(|(at, cell)| (at, cell.kind));

        // Finish
        if let Some((_, CellKind::Finish)) = center {
            self.complete();
            return false;
        }

        // Modifiers
        if let Some((at, CellKind::Modifier(_))) = center {
            self.activate_modifier(at);
        }
        let rearmed = self
            .groups
            .rearm_distant(self.player.center(), self.tuning.modifier_radius, &self.matrix);
        for at in rearmed {
            log::trace!("Modifier at {:?} re-armed", at);
        }

        // Hazards
        if let Some(cell) = sample.hazard(&self.matrix) {
            let color = cell
                .display_color()
                .map(|c| c.to_hex())
                .unwrap_or_else(|| self.tuning.death_color.clone());
            self.begin_death(color);
            return false;
        }

        // Surfaces
        if self.player.mode_kind() == ModeKind::Classic {
            if self.player.vel.y >= 0.0 {
                if let Some((at, surface)) = sample.support(&self.matrix) {
                    self.player.pos.y = at.row as f32 - PLAYER_SIZE;
                    self.player.land();
                    self.on_sticky = surface == Collision::Sticky;
                }
            } else if let Some((at, _)) = sample.ceiling(&self.matrix) {
                self.player.vel.y = 0.0;
                self.player.pos.y = at.row as f32 + 1.0;
            }
        }

        // Triggers
        if let Some((at, _)) = center {
            self.touch(at);
        }
        true
    }

    /// Player centre is inside the active cell at `at`
    fn touch(&mut self, at: CellRef) {
        let Some(cell) = self.matrix.cell(at) else {
            return;
        };
        let (kind, group, rotation) = (cell.kind, cell.group, cell.transform.rotation);
        let is_key = cell.lock == Lock::Unlock;
        let is_trigger = cell.is_trigger();

        if is_key {
            self.unlock_group(group);
        }
        if !is_trigger || self.player.teleport_cooldown > 0 {
            return;
        }

        match kind {
            CellKind::Teleporter => {
                let distance = self.tuning.teleport_distance_px / BLOCK_SIZE_PX;
                let target = launch_target(
                    self.player.pos,
                    rotation,
                    self.player.facing.sign(),
                    distance,
                    self.matrix.floor_level(),
                );
                self.teleport_to(target);
            }
            CellKind::TeleportIn | CellKind::TeleportOut => match pad_target(&self.matrix, at) {
                Some(target) => self.teleport_to(target),
                None => log::trace!("Teleport pad at {:?} has no pair", at),
            },
            CellKind::ClassicSwitch => {
                self.set_mode(ModeKind::Classic);
                self.unlock_group(group);
            }
            CellKind::ClipperSwitch => self.set_mode(ModeKind::Clipper),
            CellKind::FacingLeftOrb => self.player.facing = Facing::Left,
            CellKind::FacingRightOrb => self.player.facing = Facing::Right,
            CellKind::Finish => self.complete(),
            _ => self.unlock_group(group),
        }
    }

    fn activate_modifier(&mut self, at: CellRef) {
        if self.groups.is_modifier_active(at) {
            return;
        }
        let Some(cell) = self.matrix.cell(at) else {
            return;
        };
        let (Some(kind), Some(effect)) = (cell.kind.modifier_kind(), cell.modifier_effect()) else {
            return;
        };
        let params = cell.params.clone();
        self.groups.activate_modifier(at);
        if let ModifierEffect::TimeWarp { scale, duration_ms } = effect {
            self.time.apply_warp(scale, duration_ms as f64);
        }
        log::debug!("Modifier {} activated at {:?}", kind.as_str(), at);
        self.emit(SimEvent::ModifierActivated { kind, params });
    }

    fn unlock_group(&mut self, group: u32) {
        if self.groups.unlock(group, &mut self.matrix) {
            self.emit(SimEvent::GroupUnlocked { group });
        }
    }

    fn teleport_to(&mut self, target: Vec2) {
        self.player.pos = target;
        self.player.teleport_cooldown = self.tuning.teleport_cooldown_ticks;
        self.emit(SimEvent::Teleport {
            x: target.x * BLOCK_SIZE_PX,
            y: target.y * BLOCK_SIZE_PX,
        });
    }

    fn complete(&mut self) {
        if self.is_complete {
            return;
        }
        self.is_complete = true;
        log::info!(
            "Level complete after {} attempts, score {}",
            self.stats.attempts + 1,
            self.stats.score
        );
        self.emit(SimEvent::LevelComplete);
    }

    fn begin_death(&mut self, color: String) {
        if self.death.is_some() {
            return;
        }
        self.death = Some(DeathSequence {
            ticks_remaining: self.tuning.death_settle_ticks(),
        });
        let at = self.player.center() * BLOCK_SIZE_PX;
        log::info!("Player died at ({:.1}, {:.1})", self.player.pos.x, self.player.pos.y);
        self.emit(SimEvent::Death { color: color.clone() });
        self.emit(SimEvent::Explosion { x: at.x, y: at.y, color });
    }

    fn advance_death(&mut self) {
        let Some(death) = &mut self.death else {
            return;
        };
        death.ticks_remaining = death.ticks_remaining.saturating_sub(1);
        if death.ticks_remaining > 0 {
            return;
        }
        self.death = None;
        self.is_complete = false;
        self.on_sticky = false;
        self.respawn_player();
        self.stats.attempts += 1;
        log::debug!("Respawned (attempt {})", self.stats.attempts + 1);
        self.emit(SimEvent::DeathFinished {
            auto_restart: self.tuning.auto_restart,
        });
    }

    fn respawn_player(&mut self) {
        let spawn = self.spawn_point();
        let mode = self.player.mode_kind();
        self.player.respawn(spawn, mode, &self.lanes);
        self.settle_at_spawn();
    }

    /// A spawn on the floor or on a Classic surface starts grounded
    fn settle_at_spawn(&mut self) {
        let floor_y = self.matrix.floor_level() - PLAYER_SIZE;
        let on_floor = self.player.pos.y >= floor_y - GROUND_EPSILON;
        let on_surface = self.player.mode_kind() == ModeKind::Classic
            && CollisionSample::probe(&self.matrix, self.player.pos)
                .support(&self.matrix)
                .is_some();
        if on_floor || on_surface {
            self.player.land();
            self.player.mark_grounded(self.now_ms);
        }
    }

    fn emit(&mut self, event: SimEvent) {
        match self.collaborator.as_deref_mut() {
            Some(collaborator) => event.deliver(collaborator),
            None => {
                if self.unheard.insert(event.name()) {
                    log::debug!("No collaborator for {} events", event.name());
                }
            }
        }
        self.events.push(event);
    }
}

/// Spawn position: `spawn_x`, and `spawn_y` or the floor
fn spawn_point(tuning: &Tuning, matrix: &Matrix) -> Vec2 {
    let floor_y = matrix.floor_level() - PLAYER_SIZE;
    let y = tuning.spawn_y.map_or(floor_y, |y| y.min(floor_y));
    Vec2::new(tuning.spawn_x, y)
}
