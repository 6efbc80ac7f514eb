//! Diurnal Slope-Wind Core Library
//!
//! Thermally-driven near-surface winds over complex terrain: daytime heating
//! pushes air up the slopes, nighttime cooling drains it back down. Given an
//! elevation model, a date/time and location, cloud cover, and air
//! temperature, this crate produces per-cell 3-D wind vectors plus the
//! boundary-layer parameters (friction velocity, Obukhov length,
//! boundary-layer height, flow-layer depth) a volumetric wind solver blends
//! into its result.
//!
//! ## Pipeline
//!
//! - Aspect and slope grids derived once per run from the DEM
//! - A wavefront terrain-shadow sweep per timestep
//! - A per-cell similarity-theory solver selecting upslope, drainage, or no
//!   flow from the surface energy balance
//! - A parallel grid driver scattering into the output grids
//! - Vertical profile families lifting the 2-D result to mesh heights

pub mod diurnal;
pub mod error;
pub mod grid;
pub mod math;
pub mod profile;
pub mod shade;
pub mod solar;
pub mod terrain;

// Re-export the grid container types
pub use grid::{GridGeometry, InterpOrder, Raster, ShadeMask};

// Re-export the pipeline entry points
pub use diurnal::cell::{
    CellDiurnal, CellInputs, CellOutput, DiurnalParams, FlowRegime, NEUTRAL_OBUKHOV,
};
pub use diurnal::surface::{InputField, SurfaceProperties};
pub use diurnal::{add_diurnal, DiurnalFields};
pub use error::WindError;
pub use profile::{wind_volume, ProfileKind, WindProfile, WindVolume};
pub use shade::shade_grid;
pub use solar::SolarPosition;
pub use terrain::{aspect_grid, slope_grid};
