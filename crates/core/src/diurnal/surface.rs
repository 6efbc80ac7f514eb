//! Per-cell surface properties feeding the diurnal solver.

use crate::error::WindError;
use crate::grid::{GridGeometry, Raster};

/// A forcing quantity supplied either as one domain-wide scalar or as a
/// per-cell grid coincident with the DEM. Covers the background wind speed,
/// cloud cover, and air temperature.
#[derive(Debug, Clone, PartialEq)]
pub enum InputField {
    Uniform(f64),
    Gridded(Raster),
}

impl InputField {
    /// Value at one cell.
    ///
    /// # Panics
    ///
    /// Panics if a gridded field is indexed out of bounds.
    #[must_use]
    pub fn value_at(&self, row: usize, col: usize) -> f64 {
        match self {
            Self::Uniform(value) => *value,
            Self::Gridded(grid) => grid.value(row, col),
        }
    }

    /// Check that a gridded field is coincident with `geometry`.
    ///
    /// # Errors
    ///
    /// Returns [`WindError::GridMismatch`] naming the field.
    pub fn validate_against(&self, geometry: &GridGeometry, name: &str) -> Result<(), WindError> {
        if let Self::Gridded(grid) = self {
            if !grid.is_coincident(geometry) {
                return Err(WindError::GridMismatch(name.to_string()));
            }
        }
        Ok(())
    }
}

/// Surface energy-balance and roughness properties, one grid per quantity,
/// all coincident with the elevation grid.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceProperties {
    /// Shortwave albedo, dimensionless
    pub albedo: Raster,
    /// Bowen ratio, sensible over latent heat flux
    pub bowen: Raster,
    /// Fraction of net radiation conducted into the ground
    pub ground_flux: Raster,
    /// Anthropogenic heat flux, W/m^2
    pub anthropogenic: Raster,
    /// Roughness length z0, m
    pub roughness: Raster,
    /// Canopy height, m
    pub rough_h: Raster,
    /// Zero-plane displacement height, m
    pub rough_d: Raster,
    /// Background wind at `wind_height` above the canopy
    pub background_wind: InputField,
    /// Reference height of the background wind, m above the canopy
    pub wind_height: f64,
}

impl SurfaceProperties {
    /// Uniform surface: every property one scalar over the whole grid.
    /// Covers domain-average runs and tests.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn uniform(
        geometry: GridGeometry,
        albedo: f64,
        bowen: f64,
        ground_flux: f64,
        anthropogenic: f64,
        roughness: f64,
        rough_h: f64,
        rough_d: f64,
        wind_speed: f64,
        wind_height: f64,
    ) -> Self {
        let grid = |v: f64| Raster::with_value(geometry, -9999.0, v);
        Self {
            albedo: grid(albedo),
            bowen: grid(bowen),
            ground_flux: grid(ground_flux),
            anthropogenic: grid(anthropogenic),
            roughness: grid(roughness),
            rough_h: grid(rough_h),
            rough_d: grid(rough_d),
            background_wind: InputField::Uniform(wind_speed),
            wind_height,
        }
    }

    /// Background wind speed at one cell.
    #[must_use]
    pub fn wind_speed_at(&self, row: usize, col: usize) -> f64 {
        self.background_wind.value_at(row, col)
    }

    /// Check that every property grid is coincident with `geometry`.
    ///
    /// # Errors
    ///
    /// Returns [`WindError::GridMismatch`] naming the first offending grid.
    pub fn validate_against(&self, geometry: &GridGeometry) -> Result<(), WindError> {
        let grids: [(&str, &Raster); 7] = [
            ("albedo", &self.albedo),
            ("bowen", &self.bowen),
            ("ground_flux", &self.ground_flux),
            ("anthropogenic", &self.anthropogenic),
            ("roughness", &self.roughness),
            ("rough_h", &self.rough_h),
            ("rough_d", &self.rough_d),
        ];
        for (name, grid) in grids {
            if !grid.is_coincident(geometry) {
                return Err(WindError::GridMismatch(name.to_string()));
            }
        }
        self.background_wind
            .validate_against(geometry, "background_wind")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_properties_validate_and_sample() {
        let geom = GridGeometry::new(4, 4, 30.0, 0.0, 0.0);
        let surface =
            SurfaceProperties::uniform(geom, 0.25, 1.0, 0.1, 0.0, 0.01, 0.0, 0.0, 5.0, 10.0);
        surface.validate_against(&geom).unwrap();
        assert_eq!(surface.wind_speed_at(2, 3), 5.0);
        assert_eq!(surface.albedo.value(0, 0), 0.25);
    }

    #[test]
    fn mismatched_grid_is_named() {
        let geom = GridGeometry::new(4, 4, 30.0, 0.0, 0.0);
        let other = GridGeometry::new(5, 4, 30.0, 0.0, 0.0);
        let mut surface =
            SurfaceProperties::uniform(geom, 0.25, 1.0, 0.1, 0.0, 0.01, 0.0, 0.0, 5.0, 10.0);
        surface.bowen = Raster::with_value(other, -9999.0, 1.0);
        let err = surface.validate_against(&geom).unwrap_err();
        assert_eq!(err, WindError::GridMismatch("bowen".to_string()));
    }

    #[test]
    fn gridded_wind_samples_per_cell() {
        let geom = GridGeometry::new(2, 2, 30.0, 0.0, 0.0);
        let mut wind = Raster::new(geom, -9999.0);
        wind.set_value(1, 1, 7.5);
        let mut surface =
            SurfaceProperties::uniform(geom, 0.25, 1.0, 0.1, 0.0, 0.01, 0.0, 0.0, 0.0, 10.0);
        surface.background_wind = InputField::Gridded(wind);
        assert_eq!(surface.wind_speed_at(1, 1), 7.5);
        assert_eq!(surface.wind_speed_at(0, 0), 0.0);
    }
}
