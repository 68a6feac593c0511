//! Typed level cells
//!
//! A [`Cell`] is produced once by the grammar and is immutable afterwards,
//! except for its [`Lock`], which group unlocks flip in place.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Modifier cell kinds (camera and time side effects)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ModifierKind {
    Zoom,
    Shake,
    Tilt,
    Pan,
    TimeWarp,
}

impl ModifierKind {
    pub const ALL: [ModifierKind; 5] = [
        ModifierKind::Zoom,
        ModifierKind::Shake,
        ModifierKind::Tilt,
        ModifierKind::Pan,
        ModifierKind::TimeWarp,
    ];

    pub fn code(self) -> u32 {
        match self {
            ModifierKind::Zoom => 20,
            ModifierKind::Shake => 21,
            ModifierKind::Tilt => 22,
            ModifierKind::Pan => 23,
            ModifierKind::TimeWarp => 24,
        }
    }

    pub fn from_code(code: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.code() == code)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ModifierKind::Zoom => "zoom",
            ModifierKind::Shake => "shake",
            ModifierKind::Tilt => "tilt",
            ModifierKind::Pan => "pan",
            ModifierKind::TimeWarp => "time_warp",
        }
    }
}

/// Block kinds, keyed by the numeric `T` code of the level format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u32", try_from = "u32")]
pub enum CellKind {
    Block,
    Hazard,
    /// Generic trigger: unlocks its group
    Trigger,
    /// Directional launch along the cell's rotation
    Teleporter,
    TeleportIn,
    TeleportOut,
    ClassicSwitch,
    ClipperSwitch,
    UnlockOrb,
    FacingLeftOrb,
    FacingRightOrb,
    Finish,
    Modifier(ModifierKind),
    /// Any other non-zero code; behaves as a plain solid block
    Other(u32),
}

impl CellKind {
    /// Map a type code to a kind. Code 0 is "empty" and has no kind.
    pub fn from_code(code: u32) -> Option<Self> {
        let kind = match code {
            0 => return None,
            1 => CellKind::Block,
            2 => CellKind::Hazard,
            3 => CellKind::Trigger,
            4 => CellKind::Teleporter,
            5 => CellKind::TeleportIn,
            6 => CellKind::TeleportOut,
            7 => CellKind::ClassicSwitch,
            8 => CellKind::ClipperSwitch,
            9 => CellKind::UnlockOrb,
            10 => CellKind::FacingLeftOrb,
            11 => CellKind::FacingRightOrb,
            12 => CellKind::Finish,
            n => match ModifierKind::from_code(n) {
                Some(m) => CellKind::Modifier(m),
                None => CellKind::Other(n),
            },
        };
        Some(kind)
    }

    pub fn code(self) -> u32 {
        match self {
            CellKind::Block => 1,
            CellKind::Hazard => 2,
            CellKind::Trigger => 3,
            CellKind::Teleporter => 4,
            CellKind::TeleportIn => 5,
            CellKind::TeleportOut => 6,
            CellKind::ClassicSwitch => 7,
            CellKind::ClipperSwitch => 8,
            CellKind::UnlockOrb => 9,
            CellKind::FacingLeftOrb => 10,
            CellKind::FacingRightOrb => 11,
            CellKind::Finish => 12,
            CellKind::Modifier(m) => m.code(),
            CellKind::Other(n) => n,
        }
    }

    /// Kinds whose gameplay role is "touch to activate"
    pub fn is_trigger_role(self) -> bool {
        matches!(
            self,
            CellKind::Trigger
                | CellKind::Teleporter
                | CellKind::TeleportIn
                | CellKind::TeleportOut
                | CellKind::ClassicSwitch
                | CellKind::ClipperSwitch
                | CellKind::UnlockOrb
                | CellKind::FacingLeftOrb
                | CellKind::FacingRightOrb
                | CellKind::Finish
        )
    }

    pub fn modifier_kind(self) -> Option<ModifierKind> {
        match self {
            CellKind::Modifier(m) => Some(m),
            _ => None,
        }
    }

    /// Collision class used when a cell has no explicit `CT`
    pub fn default_collision(self) -> Collision {
        match self {
            CellKind::Modifier(_) => Collision::Passthrough,
            k if k.is_trigger_role() => Collision::Trigger,
            CellKind::Hazard => Collision::Hazard,
            _ => Collision::Solid,
        }
    }
}

impl From<CellKind> for u32 {
    fn from(kind: CellKind) -> u32 {
        kind.code()
    }
}

impl TryFrom<u32> for CellKind {
    type Error = String;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        CellKind::from_code(code).ok_or_else(|| "type code 0 denotes an empty cell".to_string())
    }
}

/// Collision class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Collision {
    Solid,
    Passthrough,
    Sticky,
    Hazard,
    Trigger,
}

impl Collision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collision::Solid => "solid",
            Collision::Passthrough => "passthrough",
            Collision::Sticky => "sticky",
            Collision::Hazard => "hazard",
            Collision::Trigger => "trigger",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "solid" => Some(Collision::Solid),
            "passthrough" => Some(Collision::Passthrough),
            "sticky" => Some(Collision::Sticky),
            "hazard" => Some(Collision::Hazard),
            "trigger" => Some(Collision::Trigger),
            _ => None,
        }
    }

    /// Surfaces the player can stand on or bump into
    pub fn is_blocking(&self) -> bool {
        matches!(self, Collision::Solid | Collision::Sticky)
    }
}

/// Group lock state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Lock {
    #[default]
    None,
    /// Dormant until the cell's group is unlocked
    LockedOff,
    /// Touching the cell unlocks its group
    Unlock,
}

impl Lock {
    pub fn as_str(&self) -> &'static str {
        match self {
            Lock::None => "0",
            Lock::LockedOff => "off",
            Lock::Unlock => "unlock",
        }
    }
}

/// Flip axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Flip {
    #[default]
    None,
    Horizontal,
    Vertical,
    Both,
}

impl Flip {
    pub fn as_str(&self) -> &'static str {
        match self {
            Flip::None => "0",
            Flip::Horizontal => "h",
            Flip::Vertical => "v",
            Flip::Both => "hv",
        }
    }
}

/// Rotation, scale and flip of a cell
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// Rotation in degrees (0 = pointing up)
    pub rotation: i32,
    pub scale: f32,
    pub flip: Flip,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            rotation: 0,
            scale: 1.0,
            flip: Flip::None,
        }
    }
}

/// 24-bit RGB colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color(pub u32);

impl Color {
    /// Parse `#RRGGBB`
    pub fn from_hex(s: &str) -> Option<Self> {
        let digits = s.strip_prefix('#')?;
        if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        u32::from_str_radix(digits, 16).ok().map(Color)
    }

    pub fn to_hex(&self) -> String {
        format!("#{:06x}", self.0 & 0x00ff_ffff)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Colour sub-block of the appearance
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ColorBlock {
    pub base: Option<Color>,
    pub tint: Option<Color>,
    pub tint_intensity: f32,
    pub shift_rate: f32,
    pub pulse_color: Option<Color>,
    pub pulse_rate: f32,
}

/// Cosmetic data, passed through untouched to the renderer
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Appearance {
    pub color: ColorBlock,
    pub glow_color: Option<Color>,
    pub glow_intensity: f32,
    pub shadow_color: Option<Color>,
    pub depth_offset: f32,
    pub opacity: f32,
    pub distortion_type: Option<String>,
    pub distortion_intensity: f32,
    pub blend_mode: Option<String>,
    pub particle_type: Option<String>,
    pub particle_intensity: f32,
}

/// What a pulsing animation is synchronised to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SyncType {
    #[default]
    None,
    Beat,
    Timer,
}

impl SyncType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncType::None => "0",
            SyncType::Beat => "beat",
            SyncType::Timer => "timer",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Animation {
    pub pulse_rate: f32,
    pub pulse_amplitude: f32,
    pub sync: SyncType,
}

/// A modifier parameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Number(f64),
    Text(String),
}

impl ParamValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Number(n) => Some(*n),
            ParamValue::Text(_) => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Number(n) => write!(f, "{}", n),
            ParamValue::Text(s) => f.write_str(s),
        }
    }
}

/// Modifier parameters in key order
pub type ModifierParams = BTreeMap<String, ParamValue>;

/// Typed view over a modifier's parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum ModifierEffect {
    Zoom { zoom: f32, duration_ms: f32 },
    Shake { intensity: f32, duration_ms: f32 },
    Tilt { angle: f32, direction: f32, duration_ms: f32 },
    Pan { x: f32, y: f32, duration_ms: f32 },
    TimeWarp { scale: f32, duration_ms: f32 },
}

/// Default modifier duration (ms) for camera effects
pub const DEFAULT_MODIFIER_DURATION_MS: f32 = 500.0;
/// Default time-warp duration (ms)
pub const DEFAULT_TIME_WARP_DURATION_MS: f32 = 1000.0;
/// Time-warp factors are clamped into this range
pub const TIME_WARP_RANGE: (f32, f32) = (0.05, 4.0);

impl ModifierEffect {
    pub fn from_params(kind: ModifierKind, params: &ModifierParams) -> Self {
        let num = |key: &str, default: f32| {
            params
                .get(key)
                .and_then(ParamValue::as_f64)
                .map(|v| v as f32)
                .unwrap_or(default)
        };
        let duration_ms = num("duration", DEFAULT_MODIFIER_DURATION_MS).max(0.0);
        match kind {
            ModifierKind::Zoom => ModifierEffect::Zoom {
                zoom: num("zoom", 1.0),
                duration_ms,
            },
            ModifierKind::Shake => ModifierEffect::Shake {
                intensity: num("intensity", 1.0),
                duration_ms,
            },
            ModifierKind::Tilt => ModifierEffect::Tilt {
                angle: num("angle", 0.0),
                direction: if num("direction", 1.0) < 0.0 { -1.0 } else { 1.0 },
                duration_ms,
            },
            ModifierKind::Pan => ModifierEffect::Pan {
                x: num("x", 0.0),
                y: num("y", 0.0),
                duration_ms,
            },
            ModifierKind::TimeWarp => ModifierEffect::TimeWarp {
                scale: num("scale", 1.0).clamp(TIME_WARP_RANGE.0, TIME_WARP_RANGE.1),
                duration_ms: num("duration", DEFAULT_TIME_WARP_DURATION_MS).max(0.0),
            },
        }
    }
}

/// One grid entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    /// Block kind (serialized as the numeric type code)
    pub kind: CellKind,
    /// Optional 5-char id (pairs teleport pads)
    pub id: Option<String>,
    pub transform: Transform,
    pub appearance: Appearance,
    pub layer: u32,
    pub collision: Collision,
    /// Trigger group, 0 = none
    pub group: u32,
    pub lock: Lock,
    pub animation: Animation,
    /// Modifier parameters (empty for non-modifier cells)
    pub params: ModifierParams,
}

impl Cell {
    /// A cell of the given kind with every optional property at its default
    pub fn new(kind: CellKind) -> Self {
        Self {
            kind,
            id: None,
            transform: Transform::default(),
            appearance: Appearance::default(),
            layer: 0,
            collision: kind.default_collision(),
            group: 0,
            lock: Lock::None,
            animation: Animation::default(),
            params: ModifierParams::new(),
        }
    }

    pub fn with_group(mut self, group: u32, lock: Lock) -> Self {
        self.group = group;
        self.lock = lock;
        self
    }

    pub fn with_collision(mut self, collision: Collision) -> Self {
        self.collision = collision;
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_rotation(mut self, degrees: i32) -> Self {
        self.transform.rotation = degrees;
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: ParamValue) -> Self {
        self.params.insert(key.into(), value);
        self
    }

    pub fn type_code(&self) -> u32 {
        self.kind.code()
    }

    pub fn is_modifier(&self) -> bool {
        self.kind.modifier_kind().is_some()
    }

    pub fn is_trigger(&self) -> bool {
        !self.is_modifier() && self.collision == Collision::Trigger
    }

    /// Locked-off cells are dormant until their group unlocks
    pub fn is_active(&self) -> bool {
        self.lock != Lock::LockedOff
    }

    pub fn modifier_effect(&self) -> Option<ModifierEffect> {
        self.kind
            .modifier_kind()
            .map(|kind| ModifierEffect::from_params(kind, &self.params))
    }

    /// Display colour used for death effects
    pub fn display_color(&self) -> Option<Color> {
        self.appearance.color.base
    }
}
