//! Player state and movement rules
//!
//! The player is a plain value. Mode-specific data lives inside the [`Mode`]
//! variant, so a lane cannot exist in Classic mode and jump resources cannot
//! exist in Clipper mode.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::PLAYER_SIZE;
use crate::tuning::Tuning;
use crate::wrap_degrees;

/// Movement mode without its data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModeKind {
    /// Gravity, jump and double jump
    Classic,
    /// Three lanes with free vertical movement from the outer lanes
    Clipper,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Facing {
    Left,
    #[default]
    Right,
}

impl Facing {
    pub fn sign(self) -> f32 {
        match self {
            Facing::Left => -1.0,
            Facing::Right => 1.0,
        }
    }
}

/// Classic-mode jump resources and spin
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassicState {
    pub jumps_remaining: u8,
    pub double_jump_available: bool,
    /// Degrees in [0, 360); exactly 0 whenever grounded
    pub rotation: f32,
    /// Sim time of the last tick spent on a platform
    pub last_grounded_ms: f64,
    /// Sim time of the last accepted jump
    pub last_jump_ms: Option<f64>,
}

impl Default for ClassicState {
    fn default() -> Self {
        Self {
            jumps_remaining: 2,
            double_jump_available: true,
            rotation: 0.0,
            last_grounded_ms: f64::NEG_INFINITY,
            last_jump_ms: None,
        }
    }
}

impl ClassicState {
    fn land(&mut self) {
        self.jumps_remaining = 2;
        self.double_jump_available = true;
        self.rotation = 0.0;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClipperState {
    /// 0 = top lane, 2 = bottom lane
    pub lane: u8,
    pub is_free_moving: bool,
    pub last_lane_switch_ms: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Mode {
    Classic(ClassicState),
    Clipper(ClipperState),
}

impl Mode {
    pub fn kind(&self) -> ModeKind {
        match self {
            Mode::Classic(_) => ModeKind::Classic,
            Mode::Clipper(_) => ModeKind::Clipper,
        }
    }
}

/// Fixed lane heights for Clipper mode, derived from the level height
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lanes([f32; 3]);

impl Lanes {
    pub const MIDDLE: u8 = 1;
    pub const LAST: u8 = 2;

    pub fn for_level(height: usize) -> Self {
        let h = height as f32;
        let floor = h - PLAYER_SIZE;
        Self([0, 1, 2].map(|i| (h * (i + 1) as f32 / 4.0 - PLAYER_SIZE / 2.0).clamp(0.0, floor.max(0.0))))
    }

    /// Player y (top edge) for a lane
    pub fn y(&self, lane: u8) -> f32 {
        self.0[lane.min(Self::LAST) as usize]
    }

    pub fn nearest(&self, y: f32) -> u8 {
        (0..=Self::LAST)
            .min_by(|&a, &b| {
                (self.y(a) - y)
                    .abs()
                    .partial_cmp(&(self.y(b) - y).abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .unwrap_or(Self::MIDDLE)
    }
}

/// How an accepted jump was granted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JumpKind {
    /// From a platform
    Grounded,
    /// Shortly after leaving a platform
    Coyote,
    /// Airborne second jump
    Double,
}

/// The player entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    /// Top-left corner, in blocks
    pub pos: Vec2,
    /// Blocks per tick
    pub vel: Vec2,
    pub facing: Facing,
    pub is_on_platform: bool,
    /// Ticks before another teleport may fire
    pub teleport_cooldown: u32,
    pub mode: Mode,
}

impl Player {
    pub fn new(spawn: Vec2, mode: ModeKind, lanes: &Lanes) -> Self {
        let mut player = Self {
            pos: spawn,
            vel: Vec2::ZERO,
            facing: Facing::Right,
            is_on_platform: false,
            teleport_cooldown: 0,
            mode: Mode::Classic(ClassicState::default()),
        };
        player.respawn(spawn, mode, lanes);
        player
    }

    /// Centre of the player box
    pub fn center(&self) -> Vec2 {
        self.pos + Vec2::splat(PLAYER_SIZE / 2.0)
    }

    pub fn mode_kind(&self) -> ModeKind {
        self.mode.kind()
    }

    /// Back to spawn: position, velocity, jump resources, spin, facing,
    /// lane and cooldowns. The mode itself is kept.
    pub fn respawn(&mut self, spawn: Vec2, mode: ModeKind, lanes: &Lanes) {
        self.pos = spawn;
        self.vel = Vec2::ZERO;
        self.facing = Facing::Right;
        self.is_on_platform = false;
        self.teleport_cooldown = 0;
        self.mode = match mode {
            ModeKind::Classic => Mode::Classic(ClassicState::default()),
            ModeKind::Clipper => {
                self.pos.y = lanes.y(Lanes::MIDDLE);
                Mode::Clipper(ClipperState {
                    lane: Lanes::MIDDLE,
                    is_free_moving: false,
                    last_lane_switch_ms: None,
                })
            }
        };
    }

    /// Switch movement mode; returns false if already in `kind`
    pub fn set_mode(&mut self, kind: ModeKind, lanes: &Lanes) -> bool {
        if self.mode.kind() == kind {
            return false;
        }
        self.vel.y = 0.0;
        self.is_on_platform = false;
        self.mode = match kind {
            ModeKind::Classic => Mode::Classic(ClassicState::default()),
            ModeKind::Clipper => {
                let lane = lanes.nearest(self.pos.y);
                self.pos.y = lanes.y(lane);
                Mode::Clipper(ClipperState {
                    lane,
                    is_free_moving: false,
                    last_lane_switch_ms: None,
                })
            }
        };
        true
    }

    /// Evaluate a jump press at sim time `now_ms`
    ///
    /// Grounded (or within the coyote window with both jumps unused) consumes
    /// the first jump; otherwise an available double jump is consumed.
    /// Presses closer than the jump buffer to the previous accepted jump are
    /// ignored.
    pub fn try_jump(&mut self, now_ms: f64, tuning: &Tuning) -> Option<JumpKind> {
        let Mode::Classic(classic) = &mut self.mode else {
            return None;
        };
        if let Some(last) = classic.last_jump_ms {
            if now_ms - last < tuning.jump_buffer_ms {
                return None;
            }
        }

        let within_coyote =
            classic.jumps_remaining == 2 && now_ms - classic.last_grounded_ms <= tuning.coyote_ms;
        let kind = if self.is_on_platform || within_coyote {
            classic.jumps_remaining = 1;
            if self.is_on_platform {
                JumpKind::Grounded
            } else {
                JumpKind::Coyote
            }
        } else if classic.double_jump_available {
            classic.jumps_remaining = 0;
            classic.double_jump_available = false;
            JumpKind::Double
        } else {
            return None;
        };

        classic.last_jump_ms = Some(now_ms);
        self.vel.y = -tuning.jump_velocity;
        self.is_on_platform = false;
        Some(kind)
    }

    /// Touch down: zero vertical speed, restore jump resources, clear spin
    pub fn land(&mut self) {
        self.vel.y = 0.0;
        self.is_on_platform = true;
        if let Mode::Classic(classic) = &mut self.mode {
            classic.land();
        }
    }

    /// Record that the player stood on a platform at `now_ms`
    pub fn mark_grounded(&mut self, now_ms: f64) {
        if let Mode::Classic(classic) = &mut self.mode {
            classic.last_grounded_ms = now_ms;
        }
    }

    /// Spin while airborne in Classic mode; otherwise hold rotation at 0
    pub fn advance_rotation(&mut self, dt_ms: f64, speed_deg: f32) {
        let airborne = !self.is_on_platform;
        let facing = self.facing.sign();
        if let Mode::Classic(classic) = &mut self.mode {
            classic.rotation = if airborne {
                wrap_degrees(classic.rotation + speed_deg * (dt_ms / 1000.0) as f32 * facing)
            } else {
                0.0
            };
        }
    }

    /// Step one lane (`-1` up, `+1` down), rate-limited by the lane cooldown
    pub fn switch_lane(&mut self, delta: i8, now_ms: f64, tuning: &Tuning, lanes: &Lanes) -> bool {
        let Mode::Clipper(clipper) = &mut self.mode else {
            return false;
        };
        if let Some(last) = clipper.last_lane_switch_ms {
            if now_ms - last < tuning.lane_switch_cooldown_ms {
                return false;
            }
        }
        let target = (clipper.lane as i8 + delta).clamp(0, Lanes::LAST as i8) as u8;
        if target == clipper.lane {
            return false;
        }
        clipper.lane = target;
        clipper.last_lane_switch_ms = Some(now_ms);
        if !clipper.is_free_moving {
            self.pos.y = lanes.y(target);
            self.vel.y = 0.0;
        }
        true
    }

    /// Apply the Clipper vertical rule for this tick
    ///
    /// Holding free-move in the top lane rises without bound, in the bottom
    /// lane sinks toward the floor. Anywhere else, or when released, the
    /// player sits exactly on its lane.
    pub fn update_free_move(&mut self, hold: bool, tuning: &Tuning, lanes: &Lanes) {
        let Mode::Clipper(clipper) = &mut self.mode else {
            return;
        };
        let direction = match clipper.lane {
            0 => -1.0,
            Lanes::LAST => 1.0,
            _ => 0.0,
        };
        if hold && direction != 0.0 {
            clipper.is_free_moving = true;
            self.vel.y = direction * tuning.free_move_speed;
        } else {
            clipper.is_free_moving = false;
            self.vel.y = 0.0;
            self.pos.y = lanes.y(clipper.lane);
        }
    }

    pub fn rotation(&self) -> f32 {
        match &self.mode {
            Mode::Classic(c) => c.rotation,
            Mode::Clipper(_) => 0.0,
        }
    }

    pub fn jumps_remaining(&self) -> u8 {
        match &self.mode {
            Mode::Classic(c) => c.jumps_remaining,
            Mode::Clipper(_) => 0,
        }
    }

    pub fn double_jump_available(&self) -> bool {
        matches!(&self.mode, Mode::Classic(c) if c.double_jump_available)
    }

    pub fn lane(&self) -> Option<u8> {
        match &self.mode {
            Mode::Clipper(c) => Some(c.lane),
            Mode::Classic(_) => None,
        }
    }

    pub fn is_free_moving(&self) -> bool {
        matches!(&self.mode, Mode::Clipper(c) if c.is_free_moving)
    }

    pub fn snapshot(&self) -> PlayerState {
        PlayerState {
            x: self.pos.x,
            y: self.pos.y,
            vx: self.vel.x,
            vy: self.vel.y,
            mode: self.mode.kind(),
            lane: self.lane(),
            is_jumping: self.mode.kind() == ModeKind::Classic && !self.is_on_platform,
            is_on_platform: self.is_on_platform,
            jumps_remaining: self.jumps_remaining(),
            double_jump_available: self.double_jump_available(),
            facing: self.facing.sign() as i8,
            rotation: self.rotation(),
            is_free_moving: self.is_free_moving(),
            teleport_cooldown: self.teleport_cooldown,
        }
    }
}

/// Read-only view of the player handed to the host
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub mode: ModeKind,
    pub lane: Option<u8>,
    pub is_jumping: bool,
    pub is_on_platform: bool,
    pub jumps_remaining: u8,
    pub double_jump_available: bool,
    pub facing: i8,
    pub rotation: f32,
    pub is_free_moving: bool,
    pub teleport_cooldown: u32,
}

/// Per-session counters; survive deaths and resets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionStats {
    pub attempts: u32,
    pub jumps: u32,
    /// Whole blocks travelled
    pub score: u64,
}
