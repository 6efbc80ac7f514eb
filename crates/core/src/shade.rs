//! Terrain shadow mask via a wavefront sweep.
//!
//! Instead of ray-marching every cell to the grid edge, the grid is swept
//! from the sun-facing edge inward. Each cell advances one normalized step
//! toward the sun and reads a flag map holding the accumulated shadow depth
//! its predecessors along the light direction wrote during the previous
//! wavefront step. Total work is one bounded step per cell, O(rows x cols),
//! independent of how long individual shadows are.
//!
//! The wavefront structure is what makes this correct: all flag writes for
//! one outer step are committed before any cell of the next step reads them.
//! The parallel inner pass only reads the flag map; writes happen in a
//! serial commit between steps.

use rayon::prelude::*;
use tracing::debug;

use crate::error::WindError;
use crate::grid::{GridGeometry, InterpOrder, Raster, ShadeMask};
use crate::solar::SolarPosition;

/// Tolerance for the out-of-bounds test at the normalized grid edge.
const EDGE_EPS: f64 = 1.0e-13;

/// Flag-map sentinel for cells not yet reached by the sweep.
const FLAG_UNTOUCHED: f64 = 1.0;

/// Flag-map sentinel for cells known to be unshaded.
const FLAG_UNSHADED: f64 = -1.0;

/// Outcome of one cell's single wavefront step.
enum CellOutcome {
    Unshaded,
    /// Shaded, carrying the height deficit (terrain + inherited shadow depth
    /// minus ray height) that downstream cells inherit.
    Shaded(f64),
}

/// Compute the shadow mask for one sun position.
///
/// At night (sun elevation <= 0) every cell is shaded. The output mask is
/// always coincident with the elevation grid.
///
/// # Errors
///
/// Returns [`WindError::OutOfBounds`] if an interpolation leaves the grid,
/// which would indicate a sweep bookkeeping bug rather than bad input.
pub fn shade_grid(dem: &Raster, solar: &SolarPosition) -> Result<ShadeMask, WindError> {
    let geometry = *dem.geometry();
    if solar.is_night() {
        return Ok(ShadeMask::filled(geometry, true));
    }

    let rows = geometry.rows;
    let cols = geometry.cols;

    // Normalize elevations to cell-size units so one grid step is one unit
    // of horizontal distance. Both scratch grids live only for this pass.
    let norm_geometry = GridGeometry::new(rows, cols, 1.0, 0.0, 0.0);
    let normalized: Vec<f64> = dem
        .as_slice()
        .iter()
        .map(|z| z / geometry.cell_size)
        .collect();
    let elev_norm = Raster::from_data(norm_geometry, dem.no_data(), normalized);
    let mut flag_map = Raster::with_value(norm_geometry, dem.no_data(), FLAG_UNTOUCHED);
    let mut mask = ShadeMask::filled(geometry, false);

    let light = solar.direction_cosines();
    let tan_elevation = solar.elevation().to_radians().tan();

    // The axis with the smaller light component is walked densely (inner);
    // the sweep advances along the other axis, starting at the edge nearest
    // the sun so predecessors are always already committed.
    let rows_outer = light.x.abs() < light.y.abs();
    let (outer_len, inner_len) = if rows_outer { (rows, cols) } else { (cols, rows) };
    let outer_component = if rows_outer { light.y } else { light.x };
    let outer_indices: Vec<usize> = if outer_component < 0.0 {
        (0..outer_len).rev().collect()
    } else {
        (0..outer_len).collect()
    };

    debug!(
        rows,
        cols,
        azimuth = solar.azimuth(),
        elevation = solar.elevation(),
        rows_outer,
        "shadow sweep"
    );

    for outer in outer_indices {
        let outcomes = (0..inner_len)
            .into_par_iter()
            .map(|inner| {
                let (row, col) = if rows_outer { (outer, inner) } else { (inner, outer) };
                step_cell(&elev_norm, &flag_map, &light, tan_elevation, row, col, rows_outer)
                    .map(|outcome| (row, col, outcome))
            })
            .collect::<Result<Vec<_>, _>>()?;

        // Serial commit; the next outer step sees all of these writes.
        for (row, col, outcome) in outcomes {
            match outcome {
                CellOutcome::Unshaded => {
                    flag_map.set_value(row, col, FLAG_UNSHADED);
                    mask.set(row, col, false);
                }
                CellOutcome::Shaded(deficit) => {
                    flag_map.set_value(row, col, deficit);
                    mask.set(row, col, true);
                }
            }
        }
    }

    Ok(mask)
}

/// Advance one cell a single unit step toward the sun and classify it.
fn step_cell(
    elev_norm: &Raster,
    flag_map: &Raster,
    light: &nalgebra::Vector3<f64>,
    tan_elevation: f64,
    row: usize,
    col: usize,
    rows_outer: bool,
) -> Result<CellOutcome, WindError> {
    let cols = elev_norm.cols() as f64;
    let rows = elev_norm.rows() as f64;

    // Track toward the sun, against the light vector.
    let px = col as f64 - light.x;
    let py = row as f64 - light.y;

    // Off the grid: nothing sunward of here can cast a shadow on this cell.
    if px < -EDGE_EPS || px >= cols - 1.0 + EDGE_EPS || py < -EDGE_EPS || py >= rows - 1.0 + EDGE_EPS
    {
        return Ok(CellOutcome::Unshaded);
    }

    // px/py index the node lattice; interpolation works on cell centers.
    let terrain = elev_norm.interpolate(px + 0.5, py + 0.5, InterpOrder::Bilinear)?;
    let shadow_depth = interpolate_flag(flag_map, px, py, light, rows_outer)?.max(0.0);

    let distance = (px - col as f64).hypot(py - row as f64);
    let ray_height = elev_norm.value(row, col) + tan_elevation * distance;

    let blocking = terrain + shadow_depth;
    if ray_height < blocking {
        Ok(CellOutcome::Shaded(blocking - ray_height))
    } else {
        Ok(CellOutcome::Unshaded)
    }
}

/// Interpolate the flag map at the advanced point.
///
/// Nearest-neighbor within 1.5 normalized cells of any boundary; elsewhere a
/// four-point stencil leaning toward the sun. The outer-axis base index is
/// the sunward committed wavefront position on both sides of the point, so
/// the stencil never reads the current step's untouched sentinels. When any
/// sample is unshaded the blend would drag the depth through the shadow
/// boundary, so it degrades to the nearest committed cell; nearest results
/// may come back negative and are clamped by the caller.
fn interpolate_flag(
    flag_map: &Raster,
    px: f64,
    py: f64,
    light: &nalgebra::Vector3<f64>,
    rows_outer: bool,
) -> Result<f64, WindError> {
    let x = px + 0.5;
    let y = py + 0.5;
    let cols = flag_map.cols() as f64;
    let rows = flag_map.rows() as f64;

    if x <= 1.5 || x >= cols - 1.5 || y <= 1.5 || y >= rows - 1.5 {
        return flag_map.interpolate(x, y, InterpOrder::Nearest);
    }

    let (i, di, t) = stencil_axis(py, light.y, rows_outer);
    let (j, dj, u) = stencil_axis(px, light.x, !rows_outer);

    let v1 = flag_map.value_clamped(i, j);
    let v2 = flag_map.value_clamped(i + di, j);
    let v3 = flag_map.value_clamped(i + di, j + dj);
    let v4 = flag_map.value_clamped(i, j + dj);

    if v1 <= 0.0 || v2 <= 0.0 || v3 <= 0.0 || v4 <= 0.0 {
        return flag_map.interpolate(x, y, InterpOrder::Nearest);
    }

    Ok((1.0 - t) * (1.0 - u) * v1 + t * (1.0 - u) * v2 + t * u * v3 + (1.0 - t) * u * v4)
}

/// Stencil base index, offset direction, and blend weight along one axis.
///
/// The offset direction follows the direction of travel (against the light).
/// On the sweep's outer axis the base must be the sunward neighbor, which is
/// the last committed wavefront position; for a negative light component
/// that neighbor sits above the point, so the base rounds up instead of
/// down. The inner axis keeps the plain floor base; commit granularity is
/// whole outer steps, so any inner index is safe to read.
fn stencil_axis(p: f64, component: f64, outer: bool) -> (isize, isize, f64) {
    if component < 0.0 {
        if outer {
            let base = p.ceil();
            (base as isize, 1, base - p)
        } else {
            let base = p.floor();
            (base as isize, 1, p - base)
        }
    } else {
        let base = p.floor();
        (base as isize, -1, p - base)
    }
}
