use nalgebra::DVector;

use super::{Uptake, UptakeStrategy, potential_transpiration, require_demand};
use crate::crop::CropState;
use crate::error::ModelError;
use crate::soil_hydra::SoilProfile;

const M3_TO_CM3_ROOT: f64 = 1e-4; // m root/m3 soil to cm root/cm3 soil
const M_TO_CM: f64 = 100.0;
const CM_TO_MM: f64 = 10.0;
const MIN_ROOT_DENSITY: f64 = 1e-5; // [cm/cm3]
const UPTAKE_COEFF: f64 = 1.3e-3;
const ROOT_COEFF: f64 = 7.01;
const MAX_EXPONENT: f64 = 40.0;
const MIN_DENOMINATOR: f64 = 1e-9;

/// DSSAT/CROPGRO water uptake (Jones et al. 2003; Boote et al. 2008), after ROOTWU.
///
/// Uptake per unit root length grows exponentially with water above the
/// wilting point, is capped at the crop maximum, and the profile total is
/// rationed down to the transpiration demand.
pub struct Dssat;

// Uptake per unit root length [cm3 water/cm root/day]
fn uptake_per_root_length(
    water_content: f64,
    wilting_point: f64,
    root_density: f64,
    max_uptake: f64,
) -> Result<f64, ModelError> {
    if root_density <= MIN_ROOT_DENSITY || water_content <= wilting_point {
        return Ok(0.0);
    }

    let shape = if wilting_point > 0.3 {
        45.0
    } else {
        120.0 - 250.0 * wilting_point
    };
    let denominator = ROOT_COEFF - root_density.ln();
    if denominator <= MIN_DENOMINATOR {
        return Err(ModelError::Domain {
            operation: "dssat uptake (root density)",
            value: root_density,
        });
    }

    let rate = UPTAKE_COEFF * (shape * (water_content - wilting_point)).min(MAX_EXPONENT).exp()
        / denominator;
    Ok(rate.min(max_uptake))
}

impl UptakeStrategy for Dssat {
    fn name(&self) -> &'static str {
        "dssat"
    }

    fn compute_uptake(&self, profile: &SoilProfile, crop: &CropState) -> Result<Uptake, ModelError> {
        let tp = potential_transpiration(profile, crop);
        require_demand(self.name(), tp)?;

        let mut supply = DVector::zeros(profile.len());
        for (i, layer) in profile.layers().iter().enumerate() {
            let root_density = crop.root_density[i] * M3_TO_CM3_ROOT;
            let rate = uptake_per_root_length(
                layer.water_content(),
                layer.wilting_point,
                root_density,
                crop.params.dssat.max_uptake,
            )?;
            supply[i] = rate * layer.thickness * M_TO_CM * root_density * CM_TO_MM;
        }

        Ok(Uptake::from_layers(Uptake::capped(supply, tp), tp))
    }
}
