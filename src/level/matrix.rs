//! Rectangular level grid with horizontal wraparound
//!
//! Columns wrap modulo the width; rows do not. Anything above row 0 or at or
//! beyond the height is open air, which lets the player jump above the
//! visible level.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::cell::Cell;
use super::error::LevelError;
use crate::wrap_column;

/// Position of a cell in the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellRef {
    pub row: usize,
    pub col: usize,
}

impl CellRef {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Centre of the cell in block units
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.col as f32 + 0.5, self.row as f32 + 0.5)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawMatrix")]
pub struct Matrix {
    width: usize,
    height: usize,
    /// Row-major cells
    cells: Vec<Option<Cell>>,
}

/// Serialized form, checked before it becomes a [`Matrix`]
#[derive(Deserialize)]
struct RawMatrix {
    width: usize,
    height: usize,
    cells: Vec<Option<Cell>>,
}

impl TryFrom<RawMatrix> for Matrix {
    type Error = LevelError;

    fn try_from(raw: RawMatrix) -> Result<Self, Self::Error> {
        if raw.width == 0 || raw.height == 0 {
            return Err(LevelError::Empty);
        }
        let expected = raw.width.checked_mul(raw.height).unwrap_or(usize::MAX);
        if raw.cells.len() != expected {
            return Err(LevelError::CellCount {
                width: raw.width,
                height: raw.height,
                expected,
                found: raw.cells.len(),
            });
        }
        Ok(Self {
            width: raw.width,
            height: raw.height,
            cells: raw.cells,
        })
    }
}

impl Matrix {
    /// Build a matrix from rows. Rows must be non-empty and equally long.
    pub fn from_rows(rows: Vec<Vec<Option<Cell>>>) -> Result<Self, LevelError> {
        let height = rows.len();
        let width = rows.first().map(Vec::len).unwrap_or(0);
        if height == 0 || width == 0 {
            return Err(LevelError::Empty);
        }
        let mut cells = Vec::with_capacity(width * height);
        for (row, cols) in rows.into_iter().enumerate() {
            if cols.len() != width {
                return Err(LevelError::RaggedRow {
                    row,
                    expected: width,
                    found: cols.len(),
                });
            }
            cells.extend(cols);
        }
        Ok(Self {
            width,
            height,
            cells,
        })
    }

    /// An all-empty matrix
    pub fn empty(width: usize, height: usize) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            cells: vec![None; width.max(1) * height.max(1)],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// The y coordinate of the floor (bottom edge of the grid)
    pub fn floor_level(&self) -> f32 {
        self.height as f32
    }

    /// Resolve a possibly out-of-range index to a cell position
    pub fn resolve(&self, col: i64, row: i64) -> Option<CellRef> {
        if row < 0 || row >= self.height as i64 {
            return None;
        }
        Some(CellRef::new(row as usize, wrap_column(col, self.width)))
    }

    /// Cell at integer grid coordinates, wrapping horizontally
    pub fn get(&self, col: i64, row: i64) -> Option<&Cell> {
        self.resolve(col, row).and_then(|r| self.cell(r))
    }

    /// Cell covering the point `(x, y)` in block units
    pub fn block_at(&self, x: f32, y: f32) -> Option<&Cell> {
        self.ref_at(x, y).and_then(|r| self.cell(r))
    }

    /// Position of the cell covering `(x, y)`, occupied or not
    pub fn ref_at(&self, x: f32, y: f32) -> Option<CellRef> {
        if !x.is_finite() || !y.is_finite() {
            return None;
        }
        self.resolve(x.floor() as i64, y.floor() as i64)
    }

    pub fn cell(&self, at: CellRef) -> Option<&Cell> {
        self.cells
            .get(at.row * self.width + at.col)
            .and_then(Option::as_ref)
    }

    pub fn cell_mut(&mut self, at: CellRef) -> Option<&mut Cell> {
        self.cells
            .get_mut(at.row * self.width + at.col)
            .and_then(Option::as_mut)
    }

    /// Place or clear a cell (editor use)
    pub fn set(&mut self, at: CellRef, cell: Option<Cell>) {
        if at.row < self.height && at.col < self.width {
            self.cells[at.row * self.width + at.col] = cell;
        }
    }

    /// Occupied cells in row-major order
    pub fn iter(&self) -> impl Iterator<Item = (CellRef, &Cell)> {
        let width = self.width;
        self.cells.iter().enumerate().filter_map(move |(i, c)| {
            c.as_ref().map(|cell| (CellRef::new(i / width, i % width), cell))
        })
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (CellRef, &mut Cell)> {
        let width = self.width;
        self.cells.iter_mut().enumerate().filter_map(move |(i, c)| {
            c.as_mut().map(|cell| (CellRef::new(i / width, i % width), cell))
        })
    }

    /// Rows of cells, top to bottom
    pub fn rows(&self) -> impl Iterator<Item = &[Option<Cell>]> {
        self.cells.chunks(self.width)
    }

    /// Distance between two points, taking the short way around horizontally
    pub fn wrapped_distance(&self, a: Vec2, b: Vec2) -> f32 {
        let w = self.width as f32;
        let dx = (a.x - b.x).rem_euclid(w);
        let dx = dx.min(w - dx);
        let dy = a.y - b.y;
        (dx * dx + dy * dy).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::cell::CellKind;
    use proptest::prelude::*;

    #[test]
    fn test_deserialize_checks_shape() {
        let m = sample();
        let json = serde_json::to_string(&m).unwrap();
        assert_eq!(serde_json::from_str::<Matrix>(&json).unwrap(), m);

        assert!(serde_json::from_str::<Matrix>(r#"{"width":0,"height":2,"cells":[]}"#).is_err());
        assert!(serde_json::from_str::<Matrix>(r#"{"width":3,"height":2,"cells":[null]}"#).is_err());

        let err = Matrix::try_from(RawMatrix {
            width: 3,
            height: 2,
            cells: vec![None],
        })
        .unwrap_err();
        assert!(matches!(err, LevelError::CellCount { expected: 6, found: 1, .. }));
    }

    fn sample() -> Matrix {
        let block = || Some(Cell::new(CellKind::Block));
        let hazard = || Some(Cell::new(CellKind::Hazard));
        Matrix::from_rows(vec![
            vec![None, block(), None],
            vec![hazard(), None, block()],
        ])
        .unwrap()
    }

    #[test]
    fn test_dimensions_and_floor() {
        let m = sample();
        assert_eq!(m.width(), 3);
        assert_eq!(m.height(), 2);
        assert_eq!(m.floor_level(), 2.0);
    }

    #[test]
    fn test_vertical_does_not_wrap() {
        let m = sample();
        assert!(m.get(1, -1).is_none());
        assert!(m.get(1, 2).is_none());
        assert!(m.block_at(1.5, -0.5).is_none());
        assert!(m.block_at(1.5, -10.5).is_none());
    }

    #[test]
    fn test_horizontal_wraps() {
        let m = sample();
        assert_eq!(m.get(-3, 1).map(|c| c.kind), Some(CellKind::Hazard));
        assert_eq!(m.get(4, 0).map(|c| c.kind), Some(CellKind::Block));
        assert_eq!(m.block_at(-0.5, 1.2).map(|c| c.kind), Some(CellKind::Block));
    }

    #[test]
    fn test_ragged_and_empty_rejected() {
        let err = Matrix::from_rows(vec![vec![None, None], vec![None]]).unwrap_err();
        assert!(matches!(err, LevelError::RaggedRow { row: 1, expected: 2, found: 1 }));
        assert!(matches!(Matrix::from_rows(vec![]), Err(LevelError::Empty)));
        assert!(matches!(Matrix::from_rows(vec![vec![]]), Err(LevelError::Empty)));
    }

    #[test]
    fn test_iter_row_major() {
        let m = sample();
        let refs: Vec<_> = m.iter().map(|(r, _)| (r.row, r.col)).collect();
        assert_eq!(refs, vec![(0, 1), (1, 0), (1, 2)]);
    }

    #[test]
    fn test_wrapped_distance() {
        let m = Matrix::empty(10, 3);
        let d = m.wrapped_distance(Vec2::new(0.5, 1.0), Vec2::new(9.5, 1.0));
        assert!((d - 1.0).abs() < 1e-5);
    }

    proptest! {
        #[test]
        fn prop_block_at_wraps_by_width(
            col in -20i32..20,
            frac in 0.05f32..0.95,
            y in 0.0f32..2.0,
            laps in -3i32..3,
        ) {
            let m = sample();
            let w = m.width() as i32;
            let x = col as f32 + frac;
            let shifted = (col + laps * w) as f32 + frac;
            prop_assert_eq!(m.block_at(shifted, y), m.block_at(x, y));
            prop_assert_eq!(m.block_at(x + w as f32, y), m.block_at(x, y));
        }
    }
}
