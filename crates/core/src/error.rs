//! Error type shared across the crate.

use std::error::Error;
use std::fmt;

/// Errors raised while building or combining wind fields.
#[derive(Debug, Clone, PartialEq)]
pub enum WindError {
    /// Two grids that must be coincident differ in shape, cell size, or
    /// corner. The message names the offending grid.
    GridMismatch(String),
    /// A point query fell outside the grid extent.
    OutOfBounds { x: f64, y: f64 },
    /// Air temperature outside the tabulated property range.
    TemperatureOutOfRange(f64),
    /// A physical parameter failed validation.
    InvalidParameter(String),
    /// The solar position algorithm rejected its inputs.
    SolarPosition(String),
}

impl fmt::Display for WindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GridMismatch(what) => {
                write!(f, "grid is not coincident with the elevation grid: {what}")
            }
            Self::OutOfBounds { x, y } => {
                write!(f, "point ({x}, {y}) lies outside the grid extent")
            }
            Self::TemperatureOutOfRange(t) => {
                write!(f, "air temperature {t} K is outside the tabulated range")
            }
            Self::InvalidParameter(what) => write!(f, "invalid parameter: {what}"),
            Self::SolarPosition(what) => write!(f, "solar position failed: {what}"),
        }
    }
}

impl Error for WindError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_point() {
        let err = WindError::OutOfBounds { x: 1.5, y: -2.0 };
        assert_eq!(err.to_string(), "point (1.5, -2) lies outside the grid extent");
    }
}
