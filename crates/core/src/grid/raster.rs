//! Row-major `f64` raster with a no-data sentinel and point interpolation.

use serde::{Deserialize, Serialize};

use super::GridGeometry;
use crate::error::WindError;

/// Interpolation order for point queries on a [`Raster`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterpOrder {
    /// Value of the cell containing the point
    Nearest,
    /// Bilinear blend of the four surrounding cell centers
    Bilinear,
}

/// Georeferenced 2-D array of `f64` values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Raster {
    geometry: GridGeometry,
    no_data: f64,
    data: Vec<f64>,
}

impl Raster {
    /// Create a raster initialized to zero.
    #[must_use]
    pub fn new(geometry: GridGeometry, no_data: f64) -> Self {
        Self::with_value(geometry, no_data, 0.0)
    }

    /// Create a raster with every cell set to `value`.
    #[must_use]
    pub fn with_value(geometry: GridGeometry, no_data: f64, value: f64) -> Self {
        Self {
            geometry,
            no_data,
            data: vec![value; geometry.len()],
        }
    }

    /// Create a raster from row-major data.
    ///
    /// # Panics
    ///
    /// Panics if `data` does not match the geometry's cell count.
    #[must_use]
    pub fn from_data(geometry: GridGeometry, no_data: f64, data: Vec<f64>) -> Self {
        assert_eq!(data.len(), geometry.len(), "data length mismatch");
        Self {
            geometry,
            no_data,
            data,
        }
    }

    /// Grid geometry.
    #[must_use]
    pub fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    /// Number of rows.
    #[must_use]
    pub fn rows(&self) -> usize {
        self.geometry.rows
    }

    /// Number of columns.
    #[must_use]
    pub fn cols(&self) -> usize {
        self.geometry.cols
    }

    /// Cell edge length.
    #[must_use]
    pub fn cell_size(&self) -> f64 {
        self.geometry.cell_size
    }

    /// No-data sentinel value.
    #[must_use]
    pub fn no_data(&self) -> f64 {
        self.no_data
    }

    /// Value at a cell.
    ///
    /// # Panics
    ///
    /// Panics if the index is out of bounds.
    #[must_use]
    pub fn value(&self, row: usize, col: usize) -> f64 {
        self.data[self.geometry.index(row, col)]
    }

    /// Set the value at a cell.
    ///
    /// # Panics
    ///
    /// Panics if the index is out of bounds.
    pub fn set_value(&mut self, row: usize, col: usize, value: f64) {
        let idx = self.geometry.index(row, col);
        self.data[idx] = value;
    }

    /// Value at a signed index, clamped to the grid edge.
    ///
    /// Out-of-range indices read the nearest edge cell, so a 3x3 stencil
    /// centered on a border cell sees the border value repeated.
    #[must_use]
    pub fn value_clamped(&self, row: isize, col: isize) -> f64 {
        let row = row.clamp(0, self.geometry.rows as isize - 1) as usize;
        let col = col.clamp(0, self.geometry.cols as isize - 1) as usize;
        self.value(row, col)
    }

    /// Set every cell to `value`.
    pub fn fill(&mut self, value: f64) {
        self.data.fill(value);
    }

    /// Row-major view of the data.
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Mutable row-major view of the data.
    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// True when this raster is coincident with another grid geometry.
    #[must_use]
    pub fn is_coincident(&self, other: &GridGeometry) -> bool {
        self.geometry.is_coincident(other)
    }

    /// Interpolate the raster at a map coordinate.
    ///
    /// # Errors
    ///
    /// Returns [`WindError::OutOfBounds`] when the point lies outside the
    /// grid extent.
    pub fn interpolate(&self, x: f64, y: f64, order: InterpOrder) -> Result<f64, WindError> {
        if !self.geometry.in_bounds_xy(x, y) {
            return Err(WindError::OutOfBounds { x, y });
        }
        match order {
            InterpOrder::Nearest => {
                let (row, col) = self.geometry.cell_index(x, y);
                Ok(self.value_clamped(row, col))
            }
            InterpOrder::Bilinear => Ok(self.bilinear(x, y)),
        }
    }

    /// Bilinear blend of the four surrounding cell centers; the sample
    /// lattice is clamped inside the grid near the border.
    fn bilinear(&self, x: f64, y: f64) -> f64 {
        let geom = &self.geometry;
        let gx = (x - geom.xll_corner) / geom.cell_size - 0.5;
        let gy = (y - geom.yll_corner) / geom.cell_size - 0.5;

        let col0 = (gx.floor() as isize).clamp(0, geom.cols.saturating_sub(2) as isize) as usize;
        let row0 = (gy.floor() as isize).clamp(0, geom.rows.saturating_sub(2) as isize) as usize;
        let col1 = (col0 + 1).min(geom.cols - 1);
        let row1 = (row0 + 1).min(geom.rows - 1);
        let fx = (gx - col0 as f64).clamp(0.0, 1.0);
        let fy = (gy - row0 as f64).clamp(0.0, 1.0);

        let v00 = self.value(row0, col0);
        let v01 = self.value(row0, col1);
        let v10 = self.value(row1, col0);
        let v11 = self.value(row1, col1);

        let south = v00 * (1.0 - fx) + v01 * fx;
        let north = v10 * (1.0 - fx) + v11 * fx;
        south * (1.0 - fy) + north * fy
    }
}
