/**
Pedotransfer functions deriving soil hydraulic parameters from texture.

Texture inputs are fractions (0-1) and organic matter is in percent. Regressions
follow Saxton and Rawls (2006), "Soil water characteristic estimates by texture
and organic matter for hydrologic solutions", Soil Sci. Soc. Am. J. 70.
The functions do not range-check their inputs.
*/
use crate::error::ModelError;

pub const PARTICLE_DENSITY: f64 = 2.65; // Mg/m3
pub const FIELD_CAPACITY_POTENTIAL: f64 = -33.0; // J/kg
pub const WILTING_POINT_POTENTIAL: f64 = -1500.0; // J/kg

/// Bulk density [Mg/m3] from clay and sand fractions and organic matter [%] (Saxton-Rawls eq. 5, 6).
pub fn bulk_density(clay: f64, sand: f64, organic_matter: f64) -> f64 {
    let x1 = 0.078 + 0.278 * sand + 0.034 * clay + 0.022 * organic_matter
        - 0.018 * sand * organic_matter
        - 0.027 * clay * organic_matter
        - 0.584 * sand * clay;
    let x2 = -0.107 + 1.636 * x1;
    let field_capacity = field_capacity_33kpa(clay, sand, organic_matter);
    let saturation = 0.043 + field_capacity + x2 - 0.097 * sand;
    (1.0 - saturation) * PARTICLE_DENSITY
}

/// Saturated water content [m3/m3] from bulk density (Campbell 1985).
pub fn saturated_water_content(bulk_density: f64) -> f64 {
    1.0 - bulk_density / PARTICLE_DENSITY
}

/// Volumetric water content at -33 J/kg [m3/m3] (Saxton-Rawls eq. 2).
pub fn field_capacity_33kpa(clay: f64, sand: f64, organic_matter: f64) -> f64 {
    let x1 = 0.299 - 0.251 * sand + 0.195 * clay + 0.011 * organic_matter
        + 0.006 * sand * organic_matter
        - 0.027 * clay * organic_matter
        + 0.452 * sand * clay;
    -0.015 + 0.636 * x1 + 1.283 * x1.powi(2)
}

/// Volumetric water content at -1500 J/kg [m3/m3] (Saxton-Rawls eq. 1).
pub fn wilting_point_1500kpa(clay: f64, sand: f64, organic_matter: f64) -> f64 {
    let x1 = 0.031 - 0.024 * sand + 0.487 * clay + 0.006 * organic_matter
        + 0.005 * sand * organic_matter
        - 0.013 * clay * organic_matter
        + 0.068 * sand * clay;
    -0.02 + 1.14 * x1
}

/// Campbell `b` exponent of the retention curve from the water contents at
/// -33 and -1500 J/kg.
///
/// Both contents must be positive and distinct, otherwise the log-ratio is undefined.
pub fn b_exponent(field_capacity: f64, wilting_point: f64) -> Result<f64, ModelError> {
    if field_capacity <= 0.0 {
        return Err(ModelError::Domain {
            operation: "b exponent (field capacity)",
            value: field_capacity,
        });
    }
    if wilting_point <= 0.0 {
        return Err(ModelError::Domain {
            operation: "b exponent (wilting point)",
            value: wilting_point,
        });
    }
    let log_ratio = field_capacity.ln() - wilting_point.ln();
    if log_ratio.abs() < f64::EPSILON {
        return Err(ModelError::Domain {
            operation: "b exponent (equal water contents)",
            value: field_capacity,
        });
    }
    Ok((1500.0_f64.ln() - 33.0_f64.ln()) / log_ratio)
}

/// Air entry potential [J/kg] (Kemanian and Stockle 2010).
pub fn air_entry_potential(field_capacity: f64, saturated_water_content: f64, b: f64) -> f64 {
    FIELD_CAPACITY_POTENTIAL * (field_capacity / saturated_water_content).powf(b)
}

/// Organic matter [%] at half the carbon saturation of Hassink and Whitmore (1997).
///
/// `clay` is a fraction; carbon is converted with 0.58 kg C per kg organic matter.
pub fn organic_matter_from_clay(clay: f64) -> f64 {
    1.81 + 0.032 * clay * 100.0
}

// Field capacity water potential [J/kg] regressed on clay content, used when
// field capacity is estimated instead of measured
pub fn field_capacity_potential_from_clay(clay: f64) -> f64 {
    -0.35088 * clay * 100.0 - 28.947
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    #[test]
    fn loamy_sand_fixed_points() {
        assert_abs_diff_eq!(bulk_density(0.03, 0.92, 1.906), 1.43, epsilon = 0.005);
        assert_abs_diff_eq!(field_capacity_33kpa(0.03, 0.92, 1.906), 0.08, epsilon = 0.005);
        assert_abs_diff_eq!(wilting_point_1500kpa(0.03, 0.92, 1.906), 0.03, epsilon = 0.005);
    }

    #[test]
    fn clay_loam_fixed_points() {
        assert_abs_diff_eq!(bulk_density(0.15, 0.2, 2.29), 1.39, epsilon = 0.005);
        assert_abs_diff_eq!(field_capacity_33kpa(0.33, 0.09, 2.866), 0.38, epsilon = 0.005);
        assert_abs_diff_eq!(wilting_point_1500kpa(0.33, 0.09, 2.866), 0.21, epsilon = 0.005);
    }

    #[test]
    fn b_exponent_from_contents() {
        assert_abs_diff_eq!(b_exponent(0.08, 0.03).unwrap(), 3.89, epsilon = 0.005);
    }

    #[test]
    fn b_exponent_rejects_degenerate_contents() {
        assert!(b_exponent(0.0, 0.03).is_err());
        assert!(b_exponent(0.08, -0.01).is_err());
        assert!(b_exponent(0.08, 0.08).is_err());
    }

    #[test]
    fn porosity_and_air_entry() {
        assert_relative_eq!(saturated_water_content(1.3), 0.509_433_962_264_150_8, epsilon = 1e-12);
        assert_abs_diff_eq!(air_entry_potential(0.08, 0.5, 4.33), -0.0118, epsilon = 1e-4);
    }

    #[test]
    fn organic_matter_and_clay_regressions() {
        assert_abs_diff_eq!(organic_matter_from_clay(0.5), 3.41, epsilon = 1e-9);
        assert_abs_diff_eq!(organic_matter_from_clay(0.03), 1.906, epsilon = 1e-9);
        assert_abs_diff_eq!(field_capacity_potential_from_clay(0.0), -28.947, epsilon = 1e-9);
        assert!(field_capacity_potential_from_clay(0.4) < field_capacity_potential_from_clay(0.1));
    }
}
