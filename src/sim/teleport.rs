//! Teleport resolution
//!
//! Two flavours: paired pads (an `In` pad and an `Out` pad sharing an id) and
//! directional launchers that displace the player along the cell's rotation.

use glam::Vec2;

use crate::consts::PLAYER_SIZE;
use crate::level::{CellKind, CellRef, Matrix};

/// The pad role a pad of `kind` pairs with
fn complementary(kind: CellKind) -> Option<CellKind> {
    match kind {
        CellKind::TeleportIn => Some(CellKind::TeleportOut),
        CellKind::TeleportOut => Some(CellKind::TeleportIn),
        _ => None,
    }
}

/// Find the pad paired with the pad at `from`
///
/// Pairs share an explicit id and have complementary roles; the first active
/// match in row-major order wins. Pads without an id never pair.
pub fn find_pair(matrix: &Matrix, from: CellRef) -> Option<CellRef> {
    let pad = matrix.cell(from)?;
    let target_kind = complementary(pad.kind)?;
    let id = pad.id.as_deref()?;
    matrix
        .iter()
        .find(|(at, cell)| {
            *at != from && cell.kind == target_kind && cell.is_active() && cell.id.as_deref() == Some(id)
        })
        .map(|(at, _)| at)
}

/// Player position (top-left) that centres the player on the paired pad
pub fn pad_target(matrix: &Matrix, from: CellRef) -> Option<Vec2> {
    find_pair(matrix, from).map(|at| at.center() - Vec2::splat(PLAYER_SIZE / 2.0))
}

/// Displace `pos` by `distance` blocks along `rotation_deg` (0° = straight up)
///
/// The horizontal component follows `facing`; the result never sinks below
/// the floor.
pub fn launch_target(pos: Vec2, rotation_deg: i32, facing: f32, distance: f32, floor_level: f32) -> Vec2 {
    let angle = (rotation_deg as f32).to_radians();
    let offset = Vec2::new(angle.sin() * distance * facing, -angle.cos() * distance);
    let mut target = pos + offset;
    target.y = target.y.min(floor_level - PLAYER_SIZE);
    target
}
