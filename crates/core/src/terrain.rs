//! Aspect and slope grids derived from the elevation model.
//!
//! Both derivatives come from the classic Horn 3x3 stencil. Terrain does not
//! change across timesteps, so these grids are computed once per run and
//! shared read-only afterward.

use rayon::prelude::*;

use crate::grid::Raster;

/// Partial derivatives of the surface at one cell, from the 3x3
/// inverse-distance-weighted central difference.
///
/// Neighbors outside the grid read the edge cell (clamped access); neighbors
/// equal to the no-data sentinel are substituted with the center elevation.
fn cell_gradient(dem: &Raster, row: usize, col: usize) -> (f64, f64) {
    let center = dem.value(row, col);
    let no_data = dem.no_data();
    let sample = |dr: isize, dc: isize| -> f64 {
        let v = dem.value_clamped(row as isize + dr, col as isize + dc);
        if v == no_data { center } else { v }
    };

    // Row index grows northward, so the "upper" stencil row is row + 1.
    let a = sample(1, -1);
    let b = sample(1, 0);
    let c = sample(1, 1);
    let d = sample(0, -1);
    let f = sample(0, 1);
    let g = sample(-1, -1);
    let h = sample(-1, 0);
    let i = sample(-1, 1);

    let denom = 8.0 * dem.cell_size();
    let dzdx = ((a + 2.0 * d + g) - (c + 2.0 * f + i)) / denom;
    let dzdy = ((a + 2.0 * b + c) - (g + 2.0 * h + i)) / denom;
    (dzdx, dzdy)
}

/// Compass bearing of the downhill direction for one cell's derivatives.
///
/// Flat ground (both derivatives zero) reports 180 by convention. The wrap
/// boundary folds values above 359.99 back to 0 so output stays in [0, 360).
fn aspect_of(dzdx: f64, dzdy: f64) -> f64 {
    if dzdx == 0.0 && dzdy == 0.0 {
        return 180.0;
    }
    let mut aspect = dzdy.atan2(dzdx).to_degrees() + 90.0;
    if aspect < 0.0 {
        aspect += 360.0;
    }
    if aspect > 359.99 {
        aspect = 0.0;
    }
    aspect
}

/// Downhill compass bearing per cell, degrees in [0, 360), flat cells 180.
///
/// Cells whose own elevation equals the no-data sentinel are set to no-data.
#[must_use]
pub fn aspect_grid(dem: &Raster) -> Raster {
    let mut out = Raster::new(*dem.geometry(), dem.no_data());
    let cols = dem.cols();
    let no_data = dem.no_data();

    out.as_mut_slice()
        .par_chunks_mut(cols)
        .enumerate()
        .for_each(|(row, out_row)| {
            for (col, cell) in out_row.iter_mut().enumerate() {
                if dem.value(row, col) == no_data {
                    *cell = no_data;
                    continue;
                }
                let (dzdx, dzdy) = cell_gradient(dem, row, col);
                *cell = aspect_of(dzdx, dzdy);
            }
        });
    out
}

/// Surface slope per cell, degrees from horizontal, non-negative.
///
/// Cells whose own elevation equals the no-data sentinel are left at 0.
#[must_use]
pub fn slope_grid(dem: &Raster) -> Raster {
    let mut out = Raster::new(*dem.geometry(), dem.no_data());
    let cols = dem.cols();
    let no_data = dem.no_data();

    out.as_mut_slice()
        .par_chunks_mut(cols)
        .enumerate()
        .for_each(|(row, out_row)| {
            for (col, cell) in out_row.iter_mut().enumerate() {
                if dem.value(row, col) == no_data {
                    continue;
                }
                let (dzdx, dzdy) = cell_gradient(dem, row, col);
                *cell = dzdx.hypot(dzdy).atan().to_degrees();
            }
        });
    out
}
