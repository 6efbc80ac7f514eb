//! Georeferenced raster grids.
//!
//! Every grid participating in a run must be *coincident*: same dimensions,
//! cell size, and lower-left corner. This is checked before grids are
//! combined; it is a configuration error, never silently resampled away.

mod mask;
mod raster;

pub use mask::ShadeMask;
pub use raster::{InterpOrder, Raster};

use serde::{Deserialize, Serialize};

/// Dimensions and georeferencing shared by all grid types.
///
/// Cells are square; `cell_size` is the edge length in map units. Row 0 is
/// the southernmost row (y grows with the row index).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridGeometry {
    /// Number of rows
    pub rows: usize,
    /// Number of columns
    pub cols: usize,
    /// Cell edge length in map units
    pub cell_size: f64,
    /// X coordinate of the lower-left grid corner
    pub xll_corner: f64,
    /// Y coordinate of the lower-left grid corner
    pub yll_corner: f64,
}

impl GridGeometry {
    /// Create a geometry with the given shape and georeferencing.
    #[must_use]
    pub fn new(rows: usize, cols: usize, cell_size: f64, xll_corner: f64, yll_corner: f64) -> Self {
        Self {
            rows,
            cols,
            cell_size,
            xll_corner,
            yll_corner,
        }
    }

    /// Number of cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows * self.cols
    }

    /// True when the grid holds no cells.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows == 0 || self.cols == 0
    }

    pub(crate) fn index(&self, row: usize, col: usize) -> usize {
        debug_assert!(row < self.rows && col < self.cols);
        row * self.cols + col
    }

    /// True when the signed cell index lies inside the grid.
    #[must_use]
    pub fn in_bounds(&self, row: isize, col: isize) -> bool {
        row >= 0 && col >= 0 && (row as usize) < self.rows && (col as usize) < self.cols
    }

    /// True when the map coordinate lies inside the grid extent.
    #[must_use]
    pub fn in_bounds_xy(&self, x: f64, y: f64) -> bool {
        x >= self.xll_corner
            && y >= self.yll_corner
            && x <= self.xll_corner + self.cols as f64 * self.cell_size
            && y <= self.yll_corner + self.rows as f64 * self.cell_size
    }

    /// Map coordinate of a cell center.
    #[must_use]
    pub fn cell_position(&self, row: usize, col: usize) -> (f64, f64) {
        (
            self.xll_corner + (col as f64 + 0.5) * self.cell_size,
            self.yll_corner + (row as f64 + 0.5) * self.cell_size,
        )
    }

    /// Signed cell index containing a map coordinate.
    #[must_use]
    pub fn cell_index(&self, x: f64, y: f64) -> (isize, isize) {
        (
            ((y - self.yll_corner) / self.cell_size).floor() as isize,
            ((x - self.xll_corner) / self.cell_size).floor() as isize,
        )
    }

    /// True when two geometries match exactly in shape, cell size, and corner.
    #[must_use]
    pub fn is_coincident(&self, other: &GridGeometry) -> bool {
        self.rows == other.rows
            && self.cols == other.cols
            && self.cell_size == other.cell_size
            && self.xll_corner == other.xll_corner
            && self.yll_corner == other.yll_corner
    }
}
