//! Grid collision sampling
//!
//! The player is probed at three points: its centre, just under its feet and
//! just over its head. Each probe resolves to the occupied cell it lands in,
//! wrapping horizontally. Rows above the grid and at or below the floor
//! resolve to nothing, so the player can jump above the visible level.

use glam::Vec2;

use crate::consts::{HEAD_PROBE_EPSILON, PLAYER_SIZE};
use crate::level::{Cell, CellRef, Collision, Matrix};

/// Occupied cells under the three probes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CollisionSample {
    pub center: Option<CellRef>,
    pub below: Option<CellRef>,
    pub above: Option<CellRef>,
}

impl CollisionSample {
    /// Probe `matrix` around a player whose top-left corner is `pos`
    pub fn probe(matrix: &Matrix, pos: Vec2) -> Self {
        let mid_x = pos.x + PLAYER_SIZE / 2.0;
        let occupied = |x: f32, y: f32| matrix.ref_at(x, y).filter(|at| matrix.cell(*at).is_some());
        Self {
            center: occupied(mid_x, pos.y + PLAYER_SIZE / 2.0),
            below: occupied(mid_x, pos.y + PLAYER_SIZE),
            above: occupied(mid_x, pos.y - HEAD_PROBE_EPSILON),
        }
    }

    /// Active cell under the centre probe
    pub fn center_cell<'m>(&self, matrix: &'m Matrix) -> Option<(CellRef, &'m Cell)> {
        active(matrix, self.center)
    }

    /// Active hazard touching the centre or the feet, centre first
    pub fn hazard<'m>(&self, matrix: &'m Matrix) -> Option<&'m Cell> {
        [self.center, self.below]
            .into_iter()
            .filter_map(|at| active(matrix, at))
            .map(|(_, cell)| cell)
            .find(|cell| cell.collision == Collision::Hazard)
    }

    /// Blocking surface under the feet
    pub fn support(&self, matrix: &Matrix) -> Option<(CellRef, Collision)> {
        blocking(matrix, self.below)
    }

    /// Blocking surface over the head
    pub fn ceiling(&self, matrix: &Matrix) -> Option<(CellRef, Collision)> {
        blocking(matrix, self.above)
    }
}

/// Locked-off cells are invisible to every probe query
fn active(matrix: &Matrix, at: Option<CellRef>) -> Option<(CellRef, &Cell)> {
    let at = at?;
    matrix.cell(at).filter(|cell| cell.is_active()).map(|cell| (at, cell))
}

fn blocking(matrix: &Matrix, at: Option<CellRef>) -> Option<(CellRef, Collision)> {
    active(matrix, at)
        .filter(|(_, cell)| cell.collision.is_blocking())
        .map(|(at, cell)| (at, cell.collision))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::parse_level_json;
    use proptest::prelude::*;

    fn level() -> Matrix {
        parse_level_json(
            r#"[[0, 0, 0, 0],
                [0, "T:1", 0, "T:1/G:2/LK:off"],
                [0, 0, 0, 0],
                ["T:2", "T:1/CT:sticky", "T:3", 0]]"#,
        )
        .unwrap()
    }

    #[test]
    fn test_three_probes() {
        let m = level();
        // Standing on row 3, column 1
        let sample = CollisionSample::probe(&m, Vec2::new(1.0, 2.0));
        assert_eq!(sample.center, None);
        assert_eq!(sample.below, Some(CellRef::new(3, 1)));
        assert_eq!(sample.above, Some(CellRef::new(1, 1)));
        assert_eq!(sample.support(&m), Some((CellRef::new(3, 1), Collision::Sticky)));
        assert_eq!(sample.ceiling(&m), Some((CellRef::new(1, 1), Collision::Solid)));
    }

    #[test]
    fn test_hazard_below_feet() {
        let m = level();
        let sample = CollisionSample::probe(&m, Vec2::new(0.2, 2.0));
        assert_eq!(sample.hazard(&m).map(|c| c.collision), Some(Collision::Hazard));
        assert_eq!(sample.support(&m), None);
    }

    #[test]
    fn test_locked_cells_do_not_collide() {
        let m = level();
        let sample = CollisionSample::probe(&m, Vec2::new(3.0, 2.0));
        assert_eq!(sample.above, Some(CellRef::new(1, 3)));
        assert_eq!(sample.ceiling(&m), None);
    }

    #[test]
    fn test_probes_outside_grid() {
        let m = level();
        let sample = CollisionSample::probe(&m, Vec2::new(1.0, -5.0));
        assert_eq!(sample, CollisionSample::default());
        // Feet exactly at the floor line
        let sample = CollisionSample::probe(&m, Vec2::new(2.0, 3.0));
        assert_eq!(sample.below, None);
        assert_eq!(sample.center, Some(CellRef::new(3, 2)));
    }

    proptest! {
        #[test]
        fn test_probe_wraps_horizontally(col in 0i32..4, frac in 0.05f32..0.45, laps in -3i32..3, y in 0.0f32..3.0) {
            let m = level();
            let x = col as f32 + frac;
            let shifted = x + (laps * 4) as f32;
            prop_assert_eq!(CollisionSample::probe(&m, Vec2::new(x, y)), CollisionSample::probe(&m, Vec2::new(shifted, y)));
        }
    }
}
