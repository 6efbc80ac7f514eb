//! Sun position for one timestep.
//!
//! Thin adapter over the NREL SPA implementation in the `solar-positioning`
//! crate. The position is computed once per timestep; per-cell insolation on
//! tilted ground is a pure function of the stored angles, so the SPA itself
//! never runs inside the grid loops.

use chrono::{DateTime, Datelike, FixedOffset};
use nalgebra::Vector3;
use solar_positioning::{spa, time::DeltaT, RefractionCorrection};

use crate::error::WindError;
use crate::math::north_to_math;

/// Solar constant in W/m^2.
const SOLAR_CONSTANT: f64 = 1367.0;

/// Normalization divisor for the irradiance fraction, W/m^2.
const IRRADIANCE_NORM: f64 = 1353.0;

/// Sun angles for one instant at one location.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolarPosition {
    azimuth: f64,
    elevation: f64,
    latitude: f64,
    day_of_year: u32,
}

impl SolarPosition {
    /// Compute the sun position for an instant with an explicit UTC offset.
    ///
    /// Latitude and longitude are in degrees; terrain elevation above sea
    /// level adjusts the refraction geometry slightly and the domain-average
    /// DEM elevation is a fine choice.
    ///
    /// # Errors
    ///
    /// Returns [`WindError::SolarPosition`] when the underlying algorithm
    /// rejects its inputs.
    pub fn compute(
        datetime: DateTime<FixedOffset>,
        latitude: f64,
        longitude: f64,
        elevation_asl: f64,
    ) -> Result<Self, WindError> {
        let delta_t = DeltaT::estimate_from_date_like(datetime)
            .map_err(|e| WindError::SolarPosition(e.to_string()))?;
        let position = spa::solar_position(
            datetime,
            latitude,
            longitude,
            elevation_asl,
            delta_t,
            Some(RefractionCorrection::standard()),
        )
        .map_err(|e| WindError::SolarPosition(e.to_string()))?;

        Ok(Self {
            azimuth: position.azimuth(),
            elevation: position.elevation_angle(),
            latitude,
            day_of_year: datetime.ordinal(),
        })
    }

    /// Build a position directly from angles. Intended for tests and callers
    /// that already ran a solar ephemeris.
    #[must_use]
    pub fn from_angles(azimuth: f64, elevation: f64, latitude: f64, day_of_year: u32) -> Self {
        Self {
            azimuth,
            elevation,
            latitude,
            day_of_year,
        }
    }

    /// Sun azimuth, degrees clockwise from north.
    #[must_use]
    pub fn azimuth(&self) -> f64 {
        self.azimuth
    }

    /// Sun elevation above the horizon, degrees.
    #[must_use]
    pub fn elevation(&self) -> f64 {
        self.elevation
    }

    /// Site latitude, degrees.
    #[must_use]
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    /// True when the sun is at or below the horizon.
    #[must_use]
    pub fn is_night(&self) -> bool {
        self.elevation <= 0.0
    }

    /// Light-direction cosines, pointing from the sun toward the terrain.
    ///
    /// The horizontal pair (x, y) is unit length; the z component is the
    /// negated sine of the elevation. This is the triple the shadow sweep
    /// marches against.
    #[must_use]
    pub fn direction_cosines(&self) -> Vector3<f64> {
        let theta_xy = north_to_math(self.azimuth).to_radians();
        Vector3::new(
            -theta_xy.cos(),
            -theta_xy.sin(),
            -self.elevation.to_radians().sin(),
        )
    }

    /// Extraterrestrial irradiance on the tilted surface, W/m^2, scaled by
    /// the Spencer eccentricity correction for the day of year.
    fn etr_tilted(&self, aspect: f64, slope: f64) -> f64 {
        let gamma = 2.0 * std::f64::consts::PI * f64::from(self.day_of_year - 1) / 365.0;
        let eccentricity = 1.000_110
            + 0.034_221 * gamma.cos()
            + 0.001_280 * gamma.sin()
            + 0.000_719 * (2.0 * gamma).cos()
            + 0.000_077 * (2.0 * gamma).sin();

        let el = self.elevation.to_radians();
        let sl = slope.to_radians();
        let rel_az = (self.azimuth - aspect).to_radians();
        let cos_incidence = el.sin() * sl.cos() + el.cos() * sl.sin() * rel_az.cos();

        SOLAR_CONSTANT * eccentricity * cos_incidence.max(0.0)
    }

    /// Normalized extraterrestrial irradiance fraction on a surface with the
    /// given downhill bearing and slope, both in degrees.
    ///
    /// Zero when the sun is below the horizon or behind the surface.
    #[must_use]
    pub fn irradiance_fraction(&self, aspect: f64, slope: f64) -> f64 {
        if self.is_night() {
            return 0.0;
        }
        self.etr_tilted(aspect, slope) / IRRADIANCE_NORM
    }
}
