use nalgebra::DVector;

use super::{Uptake, UptakeStrategy, potential_transpiration, require_demand};
use crate::crop::CropState;
use crate::error::ModelError;
use crate::pedotransfer::FIELD_CAPACITY_POTENTIAL;
use crate::soil_hydra::SoilProfile;

const ROOT_SHARE: f64 = 0.65;
const SHOOT_SHARE: f64 = 0.35;

/// CropSyst/Campbell water uptake (Campbell 1985, 1991).
///
/// Soil to leaf flow through root and shoot conductances in series. The leaf
/// water potential is solved from the demand; below the stress onset
/// transpiration drops linearly to zero at the wilting leaf potential.
pub struct Campbell;

// Series combination of two conductances
fn series(a: f64, b: f64) -> f64 {
    a * b / (a + b)
}

impl UptakeStrategy for Campbell {
    fn name(&self) -> &'static str {
        "campbell"
    }

    fn compute_uptake(&self, profile: &SoilProfile, crop: &CropState) -> Result<Uptake, ModelError> {
        let params = &crop.params.campbell;
        let onset = params.leaf_potential_stress_onset;
        let wilting = params.leaf_potential_wilting;

        let max_transp = params.max_transpiration * crop.params.light_interception;
        let expected = potential_transpiration(profile, crop).min(max_transp);
        require_demand(self.name(), expected)?;

        // Plant hydraulic conductance [kg s m-4], split between roots and shoots
        let plant_cond = max_transp / (FIELD_CAPACITY_POTENTIAL - onset);
        let root_cond = plant_cond / ROOT_SHARE;
        let shoot_cond = plant_cond / SHOOT_SHARE;

        let root_share = &crop.root_fraction;
        let total_share = root_share.sum();
        if total_share <= 0.0 {
            return Ok(Uptake::zero(profile.len(), expected));
        }

        let layer_cond = root_share.map(|share| {
            if share > 0.0 {
                series(root_cond * share, shoot_cond * share / total_share)
            } else {
                0.0
            }
        });
        let total_cond = series(root_cond * total_share, shoot_cond);

        let potentials = profile.water_potentials();
        let soil_potential = potentials.dot(root_share) / total_share;

        let mut leaf_potential = soil_potential - expected / total_cond;
        if leaf_potential < onset {
            leaf_potential = (total_cond * soil_potential * (onset - wilting) + wilting * expected)
                / (total_cond * (onset - wilting) + expected);
        }

        let ratio = if leaf_potential < wilting {
            leaf_potential = wilting;
            0.0
        } else if leaf_potential < onset {
            (leaf_potential - wilting) / (onset - wilting)
        } else {
            1.0
        };

        let mut uptake = DVector::zeros(profile.len());
        for i in 0..profile.len() {
            uptake[i] = (layer_cond[i] * (potentials[i] - leaf_potential) * ratio).max(0.0);
        }

        let mut result = Uptake::from_layers(Uptake::capped(uptake, expected), expected);
        result.leaf_water_potential = Some(leaf_potential);
        Ok(result)
    }
}
