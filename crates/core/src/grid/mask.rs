//! Boolean shadow mask, coincident with the elevation grid it was built from.

use serde::{Deserialize, Serialize};

use super::GridGeometry;
use crate::error::WindError;

/// Per-cell shaded/unshaded mask for one sun position.
///
/// Recomputed every timestep; `true` means the cell is shaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShadeMask {
    geometry: GridGeometry,
    data: Vec<bool>,
}

impl ShadeMask {
    /// Create a mask with every cell set to `shaded`.
    #[must_use]
    pub fn filled(geometry: GridGeometry, shaded: bool) -> Self {
        Self {
            geometry,
            data: vec![shaded; geometry.len()],
        }
    }

    /// Grid geometry.
    #[must_use]
    pub fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    /// True when the cell is shaded.
    ///
    /// # Panics
    ///
    /// Panics if the index is out of bounds.
    #[must_use]
    pub fn is_shaded(&self, row: usize, col: usize) -> bool {
        self.data[self.geometry.index(row, col)]
    }

    /// Set the shaded state of a cell.
    ///
    /// # Panics
    ///
    /// Panics if the index is out of bounds.
    pub fn set(&mut self, row: usize, col: usize, shaded: bool) {
        let idx = self.geometry.index(row, col);
        self.data[idx] = shaded;
    }

    /// Nearest-neighbor sample at a map coordinate.
    ///
    /// # Errors
    ///
    /// Returns [`WindError::OutOfBounds`] when the point lies outside the
    /// grid extent.
    pub fn sample_nearest(&self, x: f64, y: f64) -> Result<bool, WindError> {
        if !self.geometry.in_bounds_xy(x, y) {
            return Err(WindError::OutOfBounds { x, y });
        }
        let (row, col) = self.geometry.cell_index(x, y);
        let row = row.clamp(0, self.geometry.rows as isize - 1) as usize;
        let col = col.clamp(0, self.geometry.cols as isize - 1) as usize;
        Ok(self.is_shaded(row, col))
    }

    /// Fraction of cells that are shaded.
    #[must_use]
    pub fn shaded_fraction(&self) -> f64 {
        if self.data.is_empty() {
            return 0.0;
        }
        let shaded = self.data.iter().filter(|&&s| s).count();
        shaded as f64 / self.data.len() as f64
    }
}
