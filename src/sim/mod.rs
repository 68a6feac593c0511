//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Input arrives as a per-tick snapshot, never from listeners
//! - Stable iteration order (row-major cells, ordered sets)
//! - No rendering, audio or platform dependencies

pub mod collision;
pub mod events;
pub mod groups;
pub mod state;
pub mod teleport;
pub mod tick;
pub mod time;

pub use collision::CollisionSample;
pub use events::{Collaborator, SimEvent};
pub use groups::GroupRegistry;
pub use state::{
    ClassicState, ClipperState, Facing, JumpKind, Lanes, Mode, ModeKind, Player, PlayerState,
    SessionStats,
};
pub use teleport::{find_pair, launch_target, pad_target};
pub use tick::{PhysicsSimulation, TickInput};
pub use time::{FrameSteps, TimeController, TimeWarp};
