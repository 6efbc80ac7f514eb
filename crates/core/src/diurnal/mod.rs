//! Diurnal slope-wind fields over the whole grid.
//!
//! The driver gathers per-cell inputs, runs the [`cell`] solver over every
//! DEM cell in parallel, and scatters the results into one set of output
//! grids per timestep. Cells are fully independent; rows are the unit of
//! parallel work.

pub mod air;
pub mod cell;
pub mod surface;

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::error::WindError;
use crate::grid::{Raster, ShadeMask};
use crate::solar::SolarPosition;
use cell::{CellDiurnal, CellInputs, CellOutput, DiurnalParams};
use surface::{InputField, SurfaceProperties};

/// One timestep's diurnal output grids, all coincident with the DEM.
#[derive(Debug, Clone, PartialEq)]
pub struct DiurnalFields {
    pub u: Raster,
    pub v: Raster,
    pub w: Raster,
    /// Depth of the diurnal flow layer above ground, m
    pub flow_height: Raster,
    /// Obukhov length, m
    pub obukhov: Raster,
    /// Friction velocity u*, m/s
    pub friction_velocity: Raster,
    /// Boundary-layer height, m
    pub bl_height: Raster,
}

impl DiurnalFields {
    fn zeroed(template: &Raster) -> Self {
        let grid = || Raster::new(*template.geometry(), template.no_data());
        Self {
            u: grid(),
            v: grid(),
            w: grid(),
            flow_height: grid(),
            obukhov: grid(),
            friction_velocity: grid(),
            bl_height: grid(),
        }
    }
}

/// Compute the diurnal wind and boundary-layer grids for one timestep.
///
/// Cloud cover and air temperature come in as uniform scalars or per-cell
/// grids. Output is committed only on success; a failed pass publishes
/// nothing. Cells whose elevation equals the no-data sentinel produce
/// all-zero output. Non-convergent fixed points are counted and reported
/// once per pass as a warning.
///
/// # Errors
///
/// Fails fast with [`WindError::GridMismatch`] when any participating grid
/// is not coincident with the DEM, and propagates per-cell domain errors
/// (air temperature outside the property table).
#[allow(clippy::too_many_arguments)]
pub fn add_diurnal(
    dem: &Raster,
    aspect: &Raster,
    slope: &Raster,
    shade: &ShadeMask,
    solar: &SolarPosition,
    surface: &SurfaceProperties,
    cloud_cover: &InputField,
    air_temp: &InputField,
    params: DiurnalParams,
) -> Result<DiurnalFields, WindError> {
    let geometry = dem.geometry();
    if !aspect.is_coincident(geometry) {
        return Err(WindError::GridMismatch("aspect".to_string()));
    }
    if !slope.is_coincident(geometry) {
        return Err(WindError::GridMismatch("slope".to_string()));
    }
    surface.validate_against(geometry)?;
    cloud_cover.validate_against(geometry, "cloud_cover")?;
    air_temp.validate_against(geometry, "air_temp")?;

    let solver = CellDiurnal::new(dem, shade, solar, params)?;
    let cols = geometry.cols;
    let no_data = dem.no_data();

    debug!(
        rows = geometry.rows,
        cols,
        night = solar.is_night(),
        "diurnal grid pass"
    );

    let rows: Vec<Vec<Option<CellOutput>>> = (0..geometry.rows)
        .into_par_iter()
        .map(|row| {
            (0..cols)
                .map(|col| {
                    if dem.value(row, col) == no_data {
                        return Ok(None);
                    }
                    let inputs = CellInputs::gather(
                        surface,
                        aspect,
                        slope,
                        cloud_cover.value_at(row, col),
                        air_temp.value_at(row, col),
                        row,
                        col,
                    );
                    solver.solve(row, col, &inputs).map(Some)
                })
                .collect::<Result<Vec<_>, WindError>>()
        })
        .collect::<Result<Vec<_>, WindError>>()?;

    let mut fields = DiurnalFields::zeroed(dem);
    let mut not_converged = 0usize;
    for (row, outputs) in rows.into_iter().enumerate() {
        for (col, output) in outputs.into_iter().enumerate() {
            let Some(out) = output else { continue };
            if !out.converged {
                not_converged += 1;
            }
            fields.u.set_value(row, col, out.wind.x);
            fields.v.set_value(row, col, out.wind.y);
            fields.w.set_value(row, col, out.wind.z);
            fields.flow_height.set_value(row, col, out.flow_height);
            fields.obukhov.set_value(row, col, out.obukhov);
            fields
                .friction_velocity
                .set_value(row, col, out.friction_velocity);
            fields.bl_height.set_value(row, col, out.bl_height);
        }
    }

    if not_converged > 0 {
        warn!(
            cells = not_converged,
            "friction-velocity iteration hit its cap; using last estimates"
        );
    }

    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridGeometry;
    use crate::terrain::{aspect_grid, slope_grid};

    fn flat_dem() -> Raster {
        Raster::with_value(GridGeometry::new(5, 5, 30.0, 0.0, 0.0), -9999.0, 400.0)
    }

    fn surface_for(dem: &Raster) -> SurfaceProperties {
        SurfaceProperties::uniform(*dem.geometry(), 0.25, 1.0, 0.1, 0.0, 0.01, 0.0, 0.0, 3.0, 10.0)
    }

    #[test]
    fn mismatched_aspect_fails_fast() {
        let dem = flat_dem();
        let other = Raster::new(GridGeometry::new(4, 5, 30.0, 0.0, 0.0), -9999.0);
        let slope = slope_grid(&dem);
        let shade = ShadeMask::filled(*dem.geometry(), false);
        let solar = SolarPosition::from_angles(180.0, 45.0, 46.0, 172);
        let err = add_diurnal(
            &dem,
            &other,
            &slope,
            &shade,
            &solar,
            &surface_for(&dem),
            &InputField::Uniform(0.0),
            &InputField::Uniform(300.0),
            DiurnalParams::default(),
        )
        .unwrap_err();
        assert_eq!(err, WindError::GridMismatch("aspect".to_string()));
    }

    #[test]
    fn no_data_cells_stay_zero() {
        let mut dem = flat_dem();
        dem.set_value(2, 2, -9999.0);
        let aspect = aspect_grid(&dem);
        let slope = slope_grid(&dem);
        let shade = ShadeMask::filled(*dem.geometry(), false);
        let solar = SolarPosition::from_angles(180.0, 45.0, 46.0, 172);
        let fields = add_diurnal(
            &dem,
            &aspect,
            &slope,
            &shade,
            &solar,
            &surface_for(&dem),
            &InputField::Uniform(0.0),
            &InputField::Uniform(300.0),
            DiurnalParams::default(),
        )
        .unwrap();
        assert_eq!(fields.obukhov.value(2, 2), 0.0);
        assert_eq!(fields.friction_velocity.value(2, 2), 0.0);
    }

    #[test]
    fn gridded_cloud_cover_varies_per_cell() {
        let dem = flat_dem();
        let aspect = aspect_grid(&dem);
        let slope = slope_grid(&dem);
        let shade = ShadeMask::filled(*dem.geometry(), false);
        let solar = SolarPosition::from_angles(180.0, 60.0, 46.0, 172);

        // Clear sky in row 0, full overcast in the last row
        let mut cloud = Raster::new(*dem.geometry(), -9999.0);
        for col in 0..dem.cols() {
            cloud.set_value(dem.rows() - 1, col, 1.0);
        }
        let fields = add_diurnal(
            &dem,
            &aspect,
            &slope,
            &shade,
            &solar,
            &surface_for(&dem),
            &InputField::Gridded(cloud),
            &InputField::Uniform(300.0),
            DiurnalParams::default(),
        )
        .unwrap();
        // Less shortwave under cloud, weaker convection, |L| closer to neutral
        assert!(
            fields.obukhov.value(0, 0).abs() < fields.obukhov.value(dem.rows() - 1, 0).abs()
        );
        assert!(fields.obukhov.value(0, 0) < 0.0);
        assert!(fields.obukhov.value(dem.rows() - 1, 0) < 0.0);
    }

    #[test]
    fn mismatched_gridded_forcing_fails_fast() {
        let dem = flat_dem();
        let aspect = aspect_grid(&dem);
        let slope = slope_grid(&dem);
        let shade = ShadeMask::filled(*dem.geometry(), false);
        let solar = SolarPosition::from_angles(180.0, 45.0, 46.0, 172);
        let temp = Raster::with_value(GridGeometry::new(3, 3, 30.0, 0.0, 0.0), -9999.0, 300.0);
        let err = add_diurnal(
            &dem,
            &aspect,
            &slope,
            &shade,
            &solar,
            &surface_for(&dem),
            &InputField::Uniform(0.0),
            &InputField::Gridded(temp),
            DiurnalParams::default(),
        )
        .unwrap_err();
        assert_eq!(err, WindError::GridMismatch("air_temp".to_string()));
    }

    #[test]
    fn bad_temperature_aborts_the_pass() {
        let dem = flat_dem();
        let aspect = aspect_grid(&dem);
        let slope = slope_grid(&dem);
        let shade = ShadeMask::filled(*dem.geometry(), false);
        let solar = SolarPosition::from_angles(180.0, 45.0, 46.0, 172);
        let err = add_diurnal(
            &dem,
            &aspect,
            &slope,
            &shade,
            &solar,
            &surface_for(&dem),
            &InputField::Uniform(0.0),
            &InputField::Uniform(20.0),
            DiurnalParams::default(),
        );
        assert!(matches!(err, Err(WindError::TemperatureOutOfRange(_))));
    }
}
