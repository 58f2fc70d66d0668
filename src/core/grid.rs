//! Grid Geometry
//!
//! Integer positions on the cell grid and the bounds they must stay in.
//! Every coordinate is a multiple of the cell size.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{GAME_HEIGHT, GAME_WIDTH, SNAKE_SIZE};

/// A grid-aligned position in pixels.
///
/// Serializes as `{"x": .., "y": ..}`, which is the wire shape clients read.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    /// Horizontal coordinate (pixels, left edge = 0)
    pub x: i32,
    /// Vertical coordinate (pixels, top edge = 0)
    pub y: i32,
}

impl Position {
    /// Create a new position.
    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Offset by whole cells.
    #[inline]
    pub fn offset(self, dx: i32, dy: i32, cell_size: i32) -> Self {
        Self {
            x: self.x.wrapping_add(dx.wrapping_mul(cell_size)),
            y: self.y.wrapping_add(dy.wrapping_mul(cell_size)),
        }
    }
}

impl fmt::Debug for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Playfield dimensions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridBounds {
    /// Width in pixels (exclusive upper bound on x)
    pub width: i32,
    /// Height in pixels (exclusive upper bound on y)
    pub height: i32,
    /// Side length of a cell in pixels
    pub cell_size: i32,
}

impl Default for GridBounds {
    fn default() -> Self {
        Self {
            width: GAME_WIDTH,
            height: GAME_HEIGHT,
            cell_size: SNAKE_SIZE,
        }
    }
}

impl GridBounds {
    /// Create bounds. `cell_size` must be positive.
    pub const fn new(width: i32, height: i32, cell_size: i32) -> Self {
        Self { width, height, cell_size }
    }

    /// Number of cell columns.
    #[inline]
    pub fn columns(&self) -> i32 {
        self.width / self.cell_size
    }

    /// Number of cell rows.
    #[inline]
    pub fn rows(&self) -> i32 {
        self.height / self.cell_size
    }

    /// Total number of cells.
    #[inline]
    pub fn cell_count(&self) -> u32 {
        (self.columns().max(0) as u32) * (self.rows().max(0) as u32)
    }

    /// Check `[0, width) x [0, height)`.
    #[inline]
    pub fn contains(&self, pos: Position) -> bool {
        pos.x >= 0 && pos.x < self.width && pos.y >= 0 && pos.y < self.height
    }

    /// Position of the cell at a row-major index.
    #[inline]
    pub fn cell_at(&self, index: u32) -> Position {
        let columns = self.columns().max(1) as u32;
        Position {
            x: (index % columns) as i32 * self.cell_size,
            y: (index / columns) as i32 * self.cell_size,
        }
    }

    /// Iterate every cell in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = Position> + '_ {
        (0..self.cell_count()).map(move |i| self.cell_at(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_grid_is_80_by_60() {
        let bounds = GridBounds::default();
        assert_eq!(bounds.columns(), 80);
        assert_eq!(bounds.rows(), 60);
        assert_eq!(bounds.cell_count(), 4800);
    }

    #[test]
    fn test_contains_edges() {
        let bounds = GridBounds::default();
        assert!(bounds.contains(Position::new(0, 0)));
        assert!(bounds.contains(Position::new(790, 590)));
        assert!(!bounds.contains(Position::new(800, 0)));
        assert!(!bounds.contains(Position::new(0, 600)));
        assert!(!bounds.contains(Position::new(-10, 0)));
        assert!(!bounds.contains(Position::new(0, -10)));
    }

    #[test]
    fn test_cell_at_row_major() {
        let bounds = GridBounds::default();
        assert_eq!(bounds.cell_at(0), Position::new(0, 0));
        assert_eq!(bounds.cell_at(79), Position::new(790, 0));
        assert_eq!(bounds.cell_at(80), Position::new(0, 10));
        assert_eq!(bounds.cell_at(4799), Position::new(790, 590));
    }

    #[test]
    fn test_cells_iterates_all() {
        let bounds = GridBounds::new(30, 20, 10);
        let cells: Vec<_> = bounds.cells().collect();
        assert_eq!(cells.len(), 6);
        assert!(cells.iter().all(|c| bounds.contains(*c)));
    }

    #[test]
    fn test_offset() {
        let p = Position::new(200, 200);
        assert_eq!(p.offset(1, 0, 10), Position::new(210, 200));
        assert_eq!(p.offset(0, -1, 10), Position::new(200, 190));
    }

    #[test]
    fn test_position_json_shape() {
        let json = serde_json::to_string(&Position::new(10, 20)).unwrap();
        assert_eq!(json, r#"{"x":10,"y":20}"#);
    }
}
