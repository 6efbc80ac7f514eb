//! Vertical wind profiles and the 2-D to 3-D lift.
//!
//! A profile is a pure function of the background wind and the similarity
//! parameters solved per cell; lifting a whole grid to a stack of mesh
//! heights is a parallel loop over layers with the diurnal vector blended in
//! below the local flow-layer depth.

use nalgebra::Vector3;
use rayon::prelude::*;
use tracing::debug;

use crate::diurnal::surface::SurfaceProperties;
use crate::diurnal::DiurnalFields;
use crate::error::WindError;
use crate::grid::{GridGeometry, Raster};
use crate::math::stability_function;

/// Power-law exponent, tuned against the Askervein hill study.
const POWER_LAW_EXPONENT: f64 = 0.143;

/// Vertical profile family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ProfileKind {
    /// Background speed at every height above ground
    Uniform,
    /// Neutral log law
    Logarithmic,
    /// Fixed-exponent power law
    PowerLaw,
    /// Stability-corrected log law
    MoninObukhov,
}

/// One cell's vertical profile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindProfile {
    pub kind: ProfileKind,
    /// Background speed at `input_height`, m/s
    pub input_speed: f64,
    /// Height of the background wind above the canopy, m
    pub input_height: f64,
    /// Roughness length z0, m
    pub roughness: f64,
    /// Canopy height, m
    pub rough_h: f64,
    /// Zero-plane displacement, m
    pub rough_d: f64,
    /// Obukhov length, m
    pub obukhov: f64,
    /// Boundary-layer height, m
    pub abl_height: f64,
}

impl WindProfile {
    /// Wind speed at a height above ground level.
    #[must_use]
    pub fn speed_at(&self, agl: f64) -> f64 {
        if agl == 0.0 {
            return 0.0;
        }
        match self.kind {
            ProfileKind::Uniform => self.input_speed,
            ProfileKind::Logarithmic => {
                if agl < self.rough_d + self.roughness {
                    return 0.0;
                }
                let inwind = (self.input_height + self.rough_h) - self.rough_d;
                self.input_speed * ((agl - self.rough_d) / self.roughness).ln()
                    / (inwind / self.roughness).ln()
            }
            ProfileKind::PowerLaw => {
                self.input_speed * (agl / self.input_height).powf(POWER_LAW_EXPONENT)
            }
            ProfileKind::MoninObukhov => {
                let inwind = (self.input_height + self.rough_h) - self.rough_d;
                if inwind < self.roughness {
                    // The log profile is undefined at the input height;
                    // degrade to linear interpolation.
                    return self.input_speed * agl / (inwind + self.rough_d);
                }
                if agl < self.rough_d + 7.0 * self.roughness {
                    // AERMOD convention: linear below 7 z0.
                    let vel_7z0 = self.monin_obukov(7.0 * self.roughness, inwind);
                    vel_7z0 * agl / (7.0 * self.roughness + self.rough_d)
                } else if agl < self.rough_d + self.abl_height {
                    self.monin_obukov(agl - self.rough_d, inwind)
                } else {
                    // Above the boundary layer the profile freezes.
                    self.monin_obukov(self.abl_height, inwind)
                }
            }
        }
    }

    /// Stability-corrected log law from `input_speed` at `z1` to `z`.
    fn monin_obukov(&self, z: f64, z1: f64) -> f64 {
        let z0 = self.roughness;
        let l = self.obukhov;
        if l == 0.0 {
            self.input_speed * (z / z0).ln() / (z1 / z0).ln()
        } else {
            self.input_speed * ((z / z0).ln() - stability_function(z / l, l))
                / ((z1 / z0).ln() - stability_function(z1 / l, l))
        }
    }
}

/// A stack of horizontal wind layers at fixed heights above ground.
#[derive(Debug, Clone, PartialEq)]
pub struct WindVolume {
    geometry: GridGeometry,
    heights: Vec<f64>,
    u: Vec<f64>,
    v: Vec<f64>,
    w: Vec<f64>,
}

impl WindVolume {
    /// Grid geometry shared by every layer.
    #[must_use]
    pub fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    /// Layer heights above ground level, m.
    #[must_use]
    pub fn heights(&self) -> &[f64] {
        &self.heights
    }

    /// Wind vector at one node.
    ///
    /// # Panics
    ///
    /// Panics if the layer or cell index is out of bounds.
    #[must_use]
    pub fn wind_at(&self, layer: usize, row: usize, col: usize) -> Vector3<f64> {
        assert!(layer < self.heights.len());
        let idx = layer * self.geometry.len() + self.geometry.index(row, col);
        Vector3::new(self.u[idx], self.v[idx], self.w[idx])
    }
}

/// True at mesh heights that sit inside the local diurnal flow layer.
fn in_flow_layer(agl: f64, rough_d: f64, flow_height: f64) -> bool {
    agl > 0.0 && (agl - rough_d) < flow_height
}

/// Lift the background wind and diurnal fields to a stack of mesh heights.
///
/// Each component of the background wind is extrapolated through the chosen
/// profile family with that cell's similarity parameters; the diurnal
/// (u,v,w) vector is added at nodes inside the flow layer. Layers are the
/// unit of parallel work.
///
/// # Errors
///
/// Returns [`WindError::GridMismatch`] when the background grids, surface
/// grids, or diurnal fields disagree on geometry.
pub fn wind_volume(
    kind: ProfileKind,
    background_u: &Raster,
    background_v: &Raster,
    surface: &SurfaceProperties,
    diurnal: &DiurnalFields,
    heights: &[f64],
) -> Result<WindVolume, WindError> {
    let geometry = *background_u.geometry();
    if !background_v.is_coincident(&geometry) {
        return Err(WindError::GridMismatch("background_v".to_string()));
    }
    if !diurnal.u.is_coincident(&geometry) {
        return Err(WindError::GridMismatch("diurnal".to_string()));
    }
    surface.validate_against(&geometry)?;

    debug!(layers = heights.len(), rows = geometry.rows, cols = geometry.cols, "wind volume");

    let layer_size = geometry.len();
    let mut u = vec![0.0; layer_size * heights.len()];
    let mut v = vec![0.0; layer_size * heights.len()];
    let mut w = vec![0.0; layer_size * heights.len()];

    u.par_chunks_mut(layer_size)
        .zip(v.par_chunks_mut(layer_size))
        .zip(w.par_chunks_mut(layer_size))
        .enumerate()
        .for_each(|(layer, ((u_layer, v_layer), w_layer))| {
            let agl = heights[layer];
            for row in 0..geometry.rows {
                for col in 0..geometry.cols {
                    let idx = geometry.index(row, col);
                    let rough_d = surface.rough_d.value(row, col);
                    let template = WindProfile {
                        kind,
                        input_speed: 0.0,
                        input_height: surface.wind_height,
                        roughness: surface.roughness.value(row, col),
                        rough_h: surface.rough_h.value(row, col),
                        rough_d,
                        obukhov: diurnal.obukhov.value(row, col),
                        abl_height: diurnal.bl_height.value(row, col),
                    };

                    // Each horizontal component rides its own profile; the
                    // background has no vertical component.
                    let u_profile = WindProfile {
                        input_speed: background_u.value(row, col),
                        ..template
                    };
                    let v_profile = WindProfile {
                        input_speed: background_v.value(row, col),
                        ..template
                    };
                    let mut node = Vector3::new(u_profile.speed_at(agl), v_profile.speed_at(agl), 0.0);

                    if in_flow_layer(agl, rough_d, diurnal.flow_height.value(row, col)) {
                        node.x += diurnal.u.value(row, col);
                        node.y += diurnal.v.value(row, col);
                        node.z += diurnal.w.value(row, col);
                    }

                    u_layer[idx] = node.x;
                    v_layer[idx] = node.y;
                    w_layer[idx] = node.z;
                }
            }
        });

    Ok(WindVolume {
        geometry,
        heights: heights.to_vec(),
        u,
        v,
        w,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn profile(kind: ProfileKind, obukhov: f64) -> WindProfile {
        WindProfile {
            kind,
            input_speed: 5.0,
            input_height: 10.0,
            roughness: 0.1,
            rough_h: 0.0,
            rough_d: 0.0,
            obukhov,
            abl_height: 1000.0,
        }
    }

    #[test]
    fn every_family_is_zero_at_ground() {
        for kind in [
            ProfileKind::Uniform,
            ProfileKind::Logarithmic,
            ProfileKind::PowerLaw,
            ProfileKind::MoninObukhov,
        ] {
            assert_eq!(profile(kind, 0.0).speed_at(0.0), 0.0);
        }
    }

    #[test]
    fn log_profile_recovers_the_input_at_its_height() {
        let p = profile(ProfileKind::Logarithmic, 0.0);
        assert_relative_eq!(p.speed_at(10.0), 5.0, epsilon = 1e-12);
        assert!(p.speed_at(5.0) < 5.0);
        assert_eq!(p.speed_at(0.05), 0.0);
    }

    #[test]
    fn power_law_recovers_the_input_at_its_height() {
        let p = profile(ProfileKind::PowerLaw, 0.0);
        assert_relative_eq!(p.speed_at(10.0), 5.0, epsilon = 1e-12);
        assert!(p.speed_at(40.0) > 5.0);
    }

    #[test]
    fn uniform_is_flat_above_ground() {
        let p = profile(ProfileKind::Uniform, 0.0);
        assert_eq!(p.speed_at(1.0), 5.0);
        assert_eq!(p.speed_at(500.0), 5.0);
    }

    #[test]
    fn similarity_profile_blends_linearly_below_7_z0() {
        let p = profile(ProfileKind::MoninObukhov, 100.0);
        let v7 = p.speed_at(0.7);
        // Halfway down the linear blend
        assert_relative_eq!(p.speed_at(0.35), v7 / 2.0, epsilon = 1e-12);
    }

    #[test]
    fn similarity_profile_freezes_above_the_boundary_layer() {
        let p = profile(ProfileKind::MoninObukhov, -50.0);
        assert_relative_eq!(p.speed_at(1000.0), p.speed_at(5000.0), epsilon = 1e-12);
    }

    #[test]
    fn stable_air_shears_harder_than_neutral() {
        let neutral = profile(ProfileKind::MoninObukhov, 0.0);
        let stable = profile(ProfileKind::MoninObukhov, 20.0);
        // Same anchor speed, stronger decay toward the ground when stable
        assert!(stable.speed_at(2.0) < neutral.speed_at(2.0));
    }

    #[test]
    fn flow_layer_gate() {
        assert!(in_flow_layer(5.0, 0.0, 10.0));
        assert!(!in_flow_layer(0.0, 0.0, 10.0));
        assert!(!in_flow_layer(15.0, 0.0, 10.0));
        assert!(in_flow_layer(12.0, 5.0, 10.0));
    }
}
