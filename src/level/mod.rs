//! Level data: the cell grammar and the typed grid it produces
//!
//! Parsing is a pure function from raw rows to a [`Matrix`]. The only
//! post-parse mutation is a cell's [`Lock`], flipped by group unlocks.

pub mod cell;
pub mod error;
pub mod grammar;
pub mod matrix;

pub use cell::{
    Animation, Appearance, Cell, CellKind, Collision, Color, Flip, Lock, ModifierEffect,
    ModifierKind, ModifierParams, ParamValue, SyncType, Transform,
};
pub use error::{CellError, LevelError};
pub use grammar::{encode_level, load_level, parse_cell, parse_level, parse_level_json, parse_value};
pub use matrix::{CellRef, Matrix};
