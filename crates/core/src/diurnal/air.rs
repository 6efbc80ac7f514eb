//! Tabulated dry-air properties.

use crate::error::WindError;

/// Table temperatures in kelvin.
const TEMPERATURE: [f64; 19] = [
    100.0, 150.0, 200.0, 250.0, 300.0, 350.0, 400.0, 450.0, 500.0, 550.0, 600.0, 650.0, 700.0,
    750.0, 800.0, 850.0, 900.0, 950.0, 1000.0,
];

/// Density in kg/m^3 at the table temperatures.
const DENSITY: [f64; 19] = [
    3.5562, 2.3364, 1.7458, 1.3947, 1.1614, 0.995, 0.8711, 0.774, 0.6964, 0.6329, 0.5804, 0.5356,
    0.4975, 0.4643, 0.4354, 0.4097, 0.3868, 0.3666, 0.3482,
];

/// Specific heat at constant pressure in J/(kg K) at the table temperatures.
const SPECIFIC_HEAT: [f64; 19] = [
    1032.0, 1012.0, 1007.0, 1006.0, 1007.0, 1009.0, 1014.0, 1021.0, 1030.0, 1040.0, 1051.0,
    1063.0, 1075.0, 1087.0, 1099.0, 1110.0, 1121.0, 1131.0, 1141.0,
];

fn interpolate(table: &[f64; 19], temperature: f64) -> Result<f64, WindError> {
    let lo = TEMPERATURE[0];
    let hi = TEMPERATURE[TEMPERATURE.len() - 1];
    if !(lo..=hi).contains(&temperature) {
        return Err(WindError::TemperatureOutOfRange(temperature));
    }
    let idx = TEMPERATURE
        .iter()
        .rposition(|&t| t <= temperature)
        .unwrap_or(0)
        .min(TEMPERATURE.len() - 2);
    let t0 = TEMPERATURE[idx];
    let t1 = TEMPERATURE[idx + 1];
    let frac = (temperature - t0) / (t1 - t0);
    Ok(table[idx] + frac * (table[idx + 1] - table[idx]))
}

/// Air density in kg/m^3 at the given temperature in kelvin.
///
/// # Errors
///
/// Returns [`WindError::TemperatureOutOfRange`] outside 100-1000 K.
pub fn density(temperature: f64) -> Result<f64, WindError> {
    interpolate(&DENSITY, temperature)
}

/// Specific heat of air at constant pressure in J/(kg K).
///
/// # Errors
///
/// Returns [`WindError::TemperatureOutOfRange`] outside 100-1000 K.
pub fn specific_heat(temperature: f64) -> Result<f64, WindError> {
    interpolate(&SPECIFIC_HEAT, temperature)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn table_rows_are_exact() {
        assert_relative_eq!(density(300.0).unwrap(), 1.1614);
        assert_relative_eq!(specific_heat(300.0).unwrap(), 1007.0);
    }

    #[test]
    fn midpoints_interpolate_linearly() {
        assert_relative_eq!(density(325.0).unwrap(), (1.1614 + 0.995) / 2.0, epsilon = 1e-12);
        assert_relative_eq!(
            specific_heat(275.0).unwrap(),
            (1006.0 + 1007.0) / 2.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn table_endpoints_are_in_domain() {
        assert!(density(100.0).is_ok());
        assert!(density(1000.0).is_ok());
    }

    #[test]
    fn out_of_range_is_an_error() {
        assert!(matches!(
            density(50.0),
            Err(WindError::TemperatureOutOfRange(_))
        ));
        assert!(specific_heat(1800.0).is_err());
    }
}
