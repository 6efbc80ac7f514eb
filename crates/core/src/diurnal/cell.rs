//! Per-cell slope-flow solver.
//!
//! One cell's surface energy balance selects a flow regime: daytime heating
//! drives upslope flow, nighttime cooling drives drainage flow, zero heat
//! flux leaves no thermal wind at all. The regime then sets which fixed
//! point couples friction velocity and the Obukhov length, how far along the
//! fall line the flow develops, and the speed law of the resulting wind.
//!
//! Daytime follows the CALMET iteration of Scire et al.; nighttime follows
//! Van Ulden and Holtslag (1985). The solver is stateless between cells.

use nalgebra::Vector3;

use super::air;
use super::surface::SurfaceProperties;
use crate::error::WindError;
use crate::grid::{InterpOrder, Raster, ShadeMask};
use crate::math::{north_to_math, speed_dir_tilt_to_uvw, stability_function};
use crate::solar::SolarPosition;

/// Von Karman constant.
const K: f64 = 0.4;

/// Gravitational acceleration, m/s^2.
const G: f64 = 9.81;

/// Obukhov-length sentinel for neutral conditions, m.
pub const NEUTRAL_OBUKHOV: f64 = 1.0e6;

/// Floor on the background wind used in the flux iterations, m/s. Very
/// light winds would otherwise drive the nighttime friction velocity toward
/// zero and poison the Obukhov-length estimate.
const MIN_WIND: f64 = 1.788;

/// Relative change in friction velocity at which iteration stops.
const STOP_CRIT: f64 = 0.01;

/// Shortwave cloud-correction coefficients, Holtslag and Van Ulden (1983).
const A1: f64 = 990.0;
const A2: f64 = -30.0;
const B1: f64 = -0.75;
const B2: f64 = 3.4;

/// Net-radiation balance coefficients.
const C1: f64 = 5.31e-13;
const C2: f64 = 60.0;
const C3: f64 = 0.12;

/// Cell distances per step of the ridge/valley tracking path. Must exceed
/// sqrt(2) so a corner-to-corner step always crosses the cell.
const STEP_MULTIPLIER: f64 = 1.5;

/// Flow regime picked by the sign of the sensible heat flux.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowRegime {
    /// No thermal forcing; no diurnal wind
    None,
    /// Daytime heating, flow up the fall line
    Upslope,
    /// Nighttime cooling, drainage down the fall line
    Downslope,
}

/// Result of a capped fixed-point iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixedPoint<T> {
    Converged(T),
    /// Iteration cap hit; carries the last estimate.
    NotConverged(T),
}

impl<T> FixedPoint<T> {
    pub fn into_inner(self) -> T {
        match self {
            Self::Converged(v) | Self::NotConverged(v) => v,
        }
    }

    pub fn is_converged(&self) -> bool {
        matches!(self, Self::Converged(_))
    }
}

/// Drag and entrainment coefficients of the two flow regimes, plus solver
/// knobs shared across the grid.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DiurnalParams {
    pub cd_downslope: f64,
    pub entrainment_downslope: f64,
    pub cd_upslope: f64,
    pub entrainment_upslope: f64,
    /// Flow-layer depth as a fraction of the elevation change to the
    /// ridge or valley
    pub flow_thickness_ratio: f64,
    /// Stop the tracking path when the shadow state changes
    pub track_shade: bool,
    /// Cap on the friction-velocity fixed-point iterations
    pub max_iterations: usize,
}

impl Default for DiurnalParams {
    fn default() -> Self {
        Self {
            cd_downslope: 0.0001,
            entrainment_downslope: 0.01,
            cd_upslope: 0.2,
            entrainment_upslope: 0.2,
            flow_thickness_ratio: 0.05,
            track_shade: true,
            max_iterations: 100,
        }
    }
}

impl DiurnalParams {
    /// Both speed laws divide by `Cd + entrainment`; a non-positive sum for
    /// either regime is a configuration error.
    ///
    /// # Errors
    ///
    /// Returns [`WindError::InvalidParameter`] naming the offending regime.
    pub fn validate(&self) -> Result<(), WindError> {
        if self.cd_upslope + self.entrainment_upslope <= 0.0 {
            return Err(WindError::InvalidParameter(
                "upslope Cd + entrainment must be positive".to_string(),
            ));
        }
        if self.cd_downslope + self.entrainment_downslope <= 0.0 {
            return Err(WindError::InvalidParameter(
                "downslope Cd + entrainment must be positive".to_string(),
            ));
        }
        if self.max_iterations == 0 {
            return Err(WindError::InvalidParameter(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// One cell's inputs, gathered by the grid driver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellInputs {
    /// Downhill compass bearing, degrees
    pub aspect: f64,
    /// Slope from horizontal, degrees
    pub slope: f64,
    /// Cloud fraction in [0, 1]
    pub cloud_cover: f64,
    /// Air temperature, K
    pub air_temp: f64,
    /// Background wind speed, m/s
    pub wind_speed: f64,
    /// Height of the background wind above the canopy, m
    pub wind_height: f64,
    pub albedo: f64,
    pub bowen: f64,
    pub ground_flux: f64,
    pub anthropogenic: f64,
    /// Roughness length z0, m
    pub roughness: f64,
    /// Canopy height, m
    pub rough_h: f64,
    /// Zero-plane displacement, m
    pub rough_d: f64,
}

impl CellInputs {
    /// Gather the inputs for one cell from the surface-property grids.
    #[must_use]
    pub fn gather(
        surface: &SurfaceProperties,
        aspect: &Raster,
        slope: &Raster,
        cloud_cover: f64,
        air_temp: f64,
        row: usize,
        col: usize,
    ) -> Self {
        Self {
            aspect: aspect.value(row, col),
            slope: slope.value(row, col),
            cloud_cover,
            air_temp,
            wind_speed: surface.wind_speed_at(row, col),
            wind_height: surface.wind_height,
            albedo: surface.albedo.value(row, col),
            bowen: surface.bowen.value(row, col),
            ground_flux: surface.ground_flux.value(row, col),
            anthropogenic: surface.anthropogenic.value(row, col),
            roughness: surface.roughness.value(row, col),
            rough_h: surface.rough_h.value(row, col),
            rough_d: surface.rough_d.value(row, col),
        }
    }
}

/// One cell's solved wind and boundary-layer parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellOutput {
    pub wind: Vector3<f64>,
    /// Depth of the diurnal flow layer above ground, m
    pub flow_height: f64,
    /// Obukhov length, m ([`NEUTRAL_OBUKHOV`] when neutral)
    pub obukhov: f64,
    /// Friction velocity u*, m/s
    pub friction_velocity: f64,
    /// Boundary-layer height, m
    pub bl_height: f64,
    pub regime: FlowRegime,
    /// False when a fixed-point iteration hit its cap
    pub converged: bool,
}

/// Per-cell solver bound to one timestep's grids.
pub struct CellDiurnal<'a> {
    dem: &'a Raster,
    shade: &'a ShadeMask,
    solar: &'a SolarPosition,
    params: DiurnalParams,
    /// Distance below which a tracked path counts as zero
    epsilon: f64,
}

impl<'a> CellDiurnal<'a> {
    /// Bind the solver to this timestep's elevation grid, shadow mask, and
    /// sun position.
    ///
    /// # Errors
    ///
    /// Returns [`WindError::GridMismatch`] when the shadow mask is not
    /// coincident with the DEM, or [`WindError::InvalidParameter`] for bad
    /// coefficients.
    pub fn new(
        dem: &'a Raster,
        shade: &'a ShadeMask,
        solar: &'a SolarPosition,
        params: DiurnalParams,
    ) -> Result<Self, WindError> {
        params.validate()?;
        if !shade.geometry().is_coincident(dem.geometry()) {
            return Err(WindError::GridMismatch("shade".to_string()));
        }
        Ok(Self {
            dem,
            shade,
            solar,
            params,
            epsilon: dem.cell_size() / 1000.0,
        })
    }

    /// Solve one cell.
    ///
    /// # Errors
    ///
    /// Fails when the air temperature leaves the property table or an
    /// interpolation leaves the grid.
    pub fn solve(&self, row: usize, col: usize, inputs: &CellInputs) -> Result<CellOutput, WindError> {
        let rho = air::density(inputs.air_temp)?;
        let cp = air::specific_heat(inputs.air_temp)?;

        let sin_psi = if self.shade.is_shaded(row, col) {
            0.0
        } else {
            self.solar.irradiance_fraction(inputs.aspect, inputs.slope)
        };
        let qsw = (A1 * sin_psi + A2) * (1.0 + B1 * inputs.cloud_cover.powf(B2));

        let flux = self.solve_heat_flux(inputs, qsw, rho, cp);
        let bl_height = self.bl_height(flux.qh, flux.u_star, flux.obukhov);

        if flux.regime == FlowRegime::None || inputs.slope == 0.0 {
            return Ok(CellOutput {
                wind: Vector3::zeros(),
                flow_height: 0.0,
                obukhov: flux.obukhov,
                friction_velocity: flux.u_star,
                bl_height,
                regime: flux.regime,
                converged: flux.converged,
            });
        }

        let track = self.track_fall_line(row, col, inputs.aspect, flux.regime)?;
        let speed = self.flow_speed(&flux, &track, inputs, rho, cp);
        let wind = assemble_wind(speed, inputs.aspect, inputs.slope, flux.regime);

        Ok(CellOutput {
            wind,
            flow_height: self.params.flow_thickness_ratio * track.elev_change,
            obukhov: flux.obukhov,
            friction_velocity: flux.u_star,
            bl_height,
            regime: flux.regime,
            converged: flux.converged,
        })
    }

    /// Sensible heat flux and the friction-velocity/Obukhov-length pair for
    /// this cell's regime.
    fn solve_heat_flux(&self, inputs: &CellInputs, qsw: f64, rho: f64, cp: f64) -> HeatFlux {
        let t = inputs.air_temp;
        let q_star = ((1.0 - inputs.albedo) * qsw + C1 * t.powi(6) - 5.67e-8 * t.powi(4)
            + C2 * inputs.cloud_cover)
            / (1.0 + C3);
        let qh = (inputs.bowen / (1.0 + inputs.bowen))
            * (q_star * (1.0 - inputs.ground_flux) + inputs.anthropogenic);

        // Height above the zero-displacement plane of the log profile.
        let zm = inputs.wind_height + inputs.rough_h - inputs.rough_d;
        let z0 = inputs.roughness;
        let wind = inputs.wind_speed.max(MIN_WIND);
        let neutral_u_star = K * wind / (zm / z0).ln();

        if qh == 0.0 {
            HeatFlux {
                regime: FlowRegime::None,
                qh,
                u_star: neutral_u_star,
                obukhov: NEUTRAL_OBUKHOV,
                converged: true,
            }
        } else if qh > 0.0 {
            let l_coeff = -(rho * cp * t) / (K * G * qh);
            let result = self.daytime_fixed_point(l_coeff, wind, zm, z0, neutral_u_star);
            let converged = result.is_converged();
            let (u_star, l) = result.into_inner();
            HeatFlux {
                regime: FlowRegime::Upslope,
                qh,
                u_star,
                obukhov: l,
                converged,
            }
        } else {
            // Nighttime closure of Van Ulden and Holtslag (1985). With no
            // background wind at all the recursion divides by zero, so that
            // case short-circuits to no turbulent flux.
            if inputs.wind_speed == 0.0 {
                return HeatFlux {
                    regime: FlowRegime::Downslope,
                    qh: 0.0,
                    u_star: 0.0,
                    obukhov: NEUTRAL_OBUKHOV,
                    converged: true,
                };
            }
            let d3 = (-qsw * (1.0 - inputs.albedo) + 96.0 - 60.0 * inputs.cloud_cover) / 2870.0;
            let result = self.nighttime_fixed_point(d3, t, wind, zm, z0, neutral_u_star);
            let converged = result.is_converged();
            let (u_star, l, theta_star) = result.into_inner();
            HeatFlux {
                regime: FlowRegime::Downslope,
                qh: -rho * cp * u_star * theta_star,
                u_star,
                obukhov: l,
                converged,
            }
        }
    }

    /// CALMET daytime iteration: L from the previous u*, then a
    /// stability-corrected log law for the next u*. Yields (u*, L).
    fn daytime_fixed_point(
        &self,
        l_coeff: f64,
        wind: f64,
        zm: f64,
        z0: f64,
        u_star_start: f64,
    ) -> FixedPoint<(f64, f64)> {
        let mut u_star = u_star_start;
        let mut l = NEUTRAL_OBUKHOV;
        for _ in 0..self.params.max_iterations {
            let u_star_old = u_star;
            l = l_coeff * u_star_old.powi(3);
            u_star = K * wind
                / ((zm / z0).ln() - stability_function(zm / l, l) + stability_function(z0 / l, l));
            if (1.0 - u_star / u_star_old).abs() <= STOP_CRIT {
                return FixedPoint::Converged((u_star, l));
            }
        }
        FixedPoint::NotConverged((u_star, l))
    }

    /// Van Ulden-Holtslag nighttime recursion. Yields (u*, L, theta*).
    fn nighttime_fixed_point(
        &self,
        d3: f64,
        t: f64,
        wind: f64,
        zm: f64,
        z0: f64,
        u_star_start: f64,
    ) -> FixedPoint<(f64, f64, f64)> {
        let mut u_star = u_star_start;
        let mut theta_star = 0.0;
        let mut l = NEUTRAL_OBUKHOV;
        for _ in 0..self.params.max_iterations {
            let u_star_old = u_star;
            let v = u_star_old / 50.0;
            let v2 = v * v;
            let v3 = v2 * v;
            theta_star = t
                * (((15.0 * v2 + 6600.0 * v3).powi(2) + d3 * v2 + 1.55 * v3).sqrt()
                    - 15.0 * v2
                    - 6600.0 * v3);
            l = (u_star_old * u_star_old) / (K * G * theta_star / t);
            u_star = K * wind
                / ((zm / z0).ln() - stability_function(zm / l, l) + stability_function(z0 / l, l));
            if (1.0 - u_star / u_star_old).abs() <= STOP_CRIT {
                return FixedPoint::Converged((u_star, l, theta_star));
            }
        }
        FixedPoint::NotConverged((u_star, l, theta_star))
    }

    /// Boundary-layer height from u*, L, and latitude.
    fn bl_height(&self, qh: f64, u_star: f64, obukhov: f64) -> f64 {
        let latitude = self.solar.latitude();
        let f = if (-90.0..=90.0).contains(&latitude) {
            // 1.4544e-4 is 2 * omega (Stull 1988)
            (1.4544e-4 * latitude.to_radians().sin()).abs()
        } else {
            1.0e-4
        };

        // Blackadar and Tennekes (1968) neutral estimate.
        let neutral = 0.2 * u_star / f;
        if qh >= 0.0 {
            neutral
        } else {
            // Zilitinkevich (1972) stable estimate, capped at neutral.
            let stable = 0.4 * (u_star * obukhov.abs() / f).sqrt();
            stable.min(neutral)
        }
    }

    /// March along (upslope regime) or against (downslope regime) the fall
    /// line to the valley bottom or ridge top.
    fn track_fall_line(
        &self,
        row: usize,
        col: usize,
        aspect: f64,
        regime: FlowRegime,
    ) -> Result<FallLine, WindError> {
        let geom = self.dem.geometry();
        let (x_start, y_start) = geom.cell_position(row, col);
        let elev0 = self.dem.value(row, col);
        let downslope = regime == FlowRegime::Downslope;

        // Unit vector pointing downhill; drainage tracks the other way.
        let theta = north_to_math(aspect).to_radians();
        let mut dx = theta.cos();
        let mut dy = theta.sin();
        if downslope {
            dx = -dx;
            dy = -dy;
        }
        let step = STEP_MULTIPLIER * self.dem.cell_size();

        let mut x = x_start;
        let mut y = y_start;
        let mut elev_new = elev0;
        let mut elev_old;
        loop {
            x += step * dx;
            y += step * dy;
            elev_old = elev_new;
            if !geom.in_bounds_xy(x, y) {
                break;
            }
            elev_new = self.dem.interpolate(x, y, InterpOrder::Bilinear)?;
            if self.params.track_shade {
                let shaded = self.shade.sample_nearest(x, y)?;
                // Upslope flow ends where shadow begins; drainage ends
                // where sun begins.
                if shaded != downslope {
                    break;
                }
            }
            let monotone = if downslope {
                elev_old < elev_new
            } else {
                elev_old > elev_new
            };
            if !monotone {
                break;
            }
        }
        // Step back to the last position inside the monotone run.
        x -= step * dx;
        y -= step * dy;

        let dz = elev_old - elev0;
        let distance = ((x - x_start).powi(2) + (y - y_start).powi(2) + dz * dz).sqrt();

        // Local slope sine one step out of the start cell, used to keep the
        // drainage speed law from seeing the average grade of a long path.
        let mut sin_alpha_local = 0.0;
        if downslope {
            let x1 = x_start + step * dx;
            let y1 = y_start + step * dy;
            if geom.in_bounds_xy(x1, y1) {
                let d = (x1 - x_start).hypot(y1 - y_start);
                let z1 = self.dem.interpolate(x1, y1, InterpOrder::Bilinear)?;
                sin_alpha_local = ((z1 - elev0).abs() / d).atan().sin();
            }
        }

        Ok(FallLine {
            distance,
            elev_change: dz.abs(),
            sin_alpha_local,
        })
    }

    /// Flow-speed magnitude from the regime's cube-root law.
    fn flow_speed(
        &self,
        flux: &HeatFlux,
        track: &FallLine,
        inputs: &CellInputs,
        rho: f64,
        cp: f64,
    ) -> f64 {
        if flux.regime == FlowRegime::None || track.distance - self.epsilon < 0.0 {
            return 0.0;
        }
        let t = inputs.air_temp;
        match flux.regime {
            FlowRegime::None => 0.0,
            FlowRegime::Upslope => {
                let cd = self.params.cd_upslope + self.params.entrainment_upslope;
                ((flux.qh * G * track.elev_change) / (cd * rho * cp * t)).cbrt()
            }
            FlowRegime::Downslope => {
                let cd = self.params.cd_downslope + self.params.entrainment_downslope;
                let sin_alpha = (track.elev_change / track.distance).min(track.sin_alpha_local);
                let le = 0.05 * track.elev_change / cd;
                ((-flux.qh * G * track.distance * sin_alpha) / (rho * cp * t * cd)).cbrt()
                    * (1.0 - (-track.distance / le).exp()).cbrt()
            }
        }
    }
}

/// Intermediate heat-flux solution for one cell.
struct HeatFlux {
    regime: FlowRegime,
    qh: f64,
    u_star: f64,
    obukhov: f64,
    converged: bool,
}

/// Tracked fall-line geometry for one cell.
struct FallLine {
    distance: f64,
    elev_change: f64,
    sin_alpha_local: f64,
}

/// (speed, regime, terrain orientation) to a Cartesian wind vector.
fn assemble_wind(speed: f64, aspect: f64, slope: f64, regime: FlowRegime) -> Vector3<f64> {
    if speed == 0.0 {
        return Vector3::zeros();
    }
    let (bearing, tilt) = match regime {
        FlowRegime::Upslope => {
            let mut theta = aspect - 180.0;
            if theta < 0.0 {
                theta += 360.0;
            }
            (theta, slope)
        }
        _ => (aspect, -slope),
    };
    speed_dir_tilt_to_uvw(speed, bearing, tilt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridGeometry;
    use crate::math::uvw_to_speed_dir_tilt;
    use approx::assert_relative_eq;

    fn ridge_dem() -> Raster {
        // East-west ridge: rises toward the center row, falls past it
        let geom = GridGeometry::new(9, 9, 30.0, 0.0, 0.0);
        let data = (0..9)
            .flat_map(|r: usize| {
                (0..9).map(move |_| (4.0 - (r as f64 - 4.0).abs()) * 20.0)
            })
            .collect();
        Raster::from_data(geom, -9999.0, data)
    }

    fn inputs(aspect: f64, slope: f64, cloud: f64) -> CellInputs {
        CellInputs {
            aspect,
            slope,
            cloud_cover: cloud,
            air_temp: 300.0,
            wind_speed: 3.0,
            wind_height: 10.0,
            albedo: 0.25,
            bowen: 1.0,
            ground_flux: 0.1,
            anthropogenic: 0.0,
            roughness: 0.01,
            rough_h: 0.0,
            rough_d: 0.0,
        }
    }

    fn day_solar() -> SolarPosition {
        SolarPosition::from_angles(180.0, 60.0, 46.0, 172)
    }

    fn night_solar() -> SolarPosition {
        SolarPosition::from_angles(0.0, -30.0, 46.0, 172)
    }

    #[test]
    fn invalid_coefficients_are_rejected() {
        let params = DiurnalParams {
            cd_upslope: 0.0,
            entrainment_upslope: 0.0,
            ..DiurnalParams::default()
        };
        assert!(matches!(
            params.validate(),
            Err(WindError::InvalidParameter(_))
        ));
        assert!(DiurnalParams::default().validate().is_ok());
    }

    #[test]
    fn flat_cell_has_zero_wind() {
        let dem = ridge_dem();
        let solar = day_solar();
        let shade = ShadeMask::filled(*dem.geometry(), false);
        let cell = CellDiurnal::new(&dem, &shade, &solar, DiurnalParams::default()).unwrap();
        let out = cell.solve(4, 4, &inputs(180.0, 0.0, 0.0)).unwrap();
        assert_eq!(out.wind, Vector3::zeros());
        assert_eq!(out.flow_height, 0.0);
    }

    #[test]
    fn daytime_slope_flows_uphill() {
        let dem = ridge_dem();
        let solar = day_solar();
        let shade = ShadeMask::filled(*dem.geometry(), false);
        let cell = CellDiurnal::new(&dem, &shade, &solar, DiurnalParams::default()).unwrap();
        // South-facing slope below the ridge crest: aspect 180, slope 33.69
        let slope = (40.0f64 / 45.0).atan().to_degrees();
        let out = cell.solve(2, 4, &inputs(180.0, slope, 0.0)).unwrap();
        assert_eq!(out.regime, FlowRegime::Upslope);
        assert!(out.converged);
        let (speed, bearing, tilt) = uvw_to_speed_dir_tilt(&out.wind);
        assert!(speed > 0.0);
        assert_relative_eq!(bearing, 0.0, epsilon = 1e-6);
        assert!(tilt > 0.0);
        assert!(out.obukhov < 0.0, "daytime L should be unstable");
        assert!(out.friction_velocity > 0.0);
        assert!(out.flow_height > 0.0);
    }

    #[test]
    fn nighttime_slope_drains_downhill() {
        let dem = ridge_dem();
        let solar = night_solar();
        let shade = ShadeMask::filled(*dem.geometry(), true);
        let cell = CellDiurnal::new(&dem, &shade, &solar, DiurnalParams::default()).unwrap();
        let slope = (40.0f64 / 45.0).atan().to_degrees();
        let out = cell.solve(2, 4, &inputs(180.0, slope, 0.0)).unwrap();
        assert_eq!(out.regime, FlowRegime::Downslope);
        let (speed, bearing, tilt) = uvw_to_speed_dir_tilt(&out.wind);
        assert!(speed > 0.0);
        assert_relative_eq!(bearing, 180.0, epsilon = 1e-6);
        assert!(tilt < 0.0);
        assert!(out.obukhov > 0.0, "nighttime L should be stable");
    }

    #[test]
    fn fixed_point_carries_its_last_estimate() {
        let fp = FixedPoint::NotConverged(3.5);
        assert!(!fp.is_converged());
        assert_eq!(fp.into_inner(), 3.5);
        assert!(FixedPoint::Converged(1.0).is_converged());
    }

    #[test]
    fn iteration_cap_reports_not_converged() {
        let dem = ridge_dem();
        let solar = day_solar();
        let shade = ShadeMask::filled(*dem.geometry(), false);
        let params = DiurnalParams {
            max_iterations: 1,
            ..DiurnalParams::default()
        };
        let cell = CellDiurnal::new(&dem, &shade, &solar, params).unwrap();
        let slope = (40.0f64 / 45.0).atan().to_degrees();
        // The strongly unstable first step moves u* by far more than 1%
        let out = cell.solve(2, 4, &inputs(180.0, slope, 0.0)).unwrap();
        assert!(!out.converged);
        assert!(out.friction_velocity > 0.0, "last estimate is kept");
    }

    #[test]
    fn night_with_calm_wind_short_circuits() {
        let dem = ridge_dem();
        let solar = night_solar();
        let shade = ShadeMask::filled(*dem.geometry(), true);
        let cell = CellDiurnal::new(&dem, &shade, &solar, DiurnalParams::default()).unwrap();
        let mut calm = inputs(180.0, 20.0, 0.0);
        calm.wind_speed = 0.0;
        let out = cell.solve(2, 4, &calm).unwrap();
        assert_eq!(out.friction_velocity, 0.0);
        assert_eq!(out.obukhov, NEUTRAL_OBUKHOV);
        assert_eq!(out.wind, Vector3::zeros());
    }

    #[test]
    fn shaded_cell_sees_no_sun() {
        let dem = ridge_dem();
        let solar = day_solar();
        let all_shaded = ShadeMask::filled(*dem.geometry(), true);
        let unshaded = ShadeMask::filled(*dem.geometry(), false);
        let slope = (40.0f64 / 45.0).atan().to_degrees();
        let params = DiurnalParams {
            track_shade: false,
            ..DiurnalParams::default()
        };
        let sunny = CellDiurnal::new(&dem, &unshaded, &solar, params)
            .unwrap()
            .solve(2, 4, &inputs(180.0, slope, 0.0))
            .unwrap();
        let shaded = CellDiurnal::new(&dem, &all_shaded, &solar, params)
            .unwrap()
            .solve(2, 4, &inputs(180.0, slope, 0.0))
            .unwrap();
        assert_eq!(sunny.regime, FlowRegime::Upslope);
        // Shaded at midday still loses the shortwave term; the balance
        // flips negative
        assert_eq!(shaded.regime, FlowRegime::Downslope);
    }

    #[test]
    fn mismatched_shade_is_rejected() {
        let dem = ridge_dem();
        let solar = day_solar();
        let other = GridGeometry::new(3, 3, 30.0, 0.0, 0.0);
        let shade = ShadeMask::filled(other, false);
        assert!(matches!(
            CellDiurnal::new(&dem, &shade, &solar, DiurnalParams::default()),
            Err(WindError::GridMismatch(_))
        ));
    }
}
