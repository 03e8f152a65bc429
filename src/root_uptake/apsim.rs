use nalgebra::DVector;

use super::{Uptake, UptakeStrategy, potential_transpiration};
use crate::crop::CropState;
use crate::error::ModelError;
use crate::soil_hydra::SoilProfile;

/// APSIM supply/demand water uptake (Passioura 1983; Monteith 1986).
///
/// Each layer can supply `kl` times its water above the wilting point. When
/// demand is below total supply it is shared out in proportion to layer
/// supply, otherwise every layer gives its full supply.
pub struct Apsim;

impl UptakeStrategy for Apsim {
    fn name(&self) -> &'static str {
        "apsim"
    }

    fn compute_uptake(&self, profile: &SoilProfile, crop: &CropState) -> Result<Uptake, ModelError> {
        let tp = potential_transpiration(profile, crop);

        // Water available [mm] and supply [mm/day] per layer
        let supply = DVector::from_iterator(
            profile.len(),
            profile
                .layers()
                .iter()
                .map(|l| l.available_water(profile.water_density) * l.kl),
        );
        let total_supply = supply.sum();

        if total_supply <= 0.0 || tp <= 0.0 {
            return Ok(Uptake::zero(profile.len(), tp));
        }

        let uptake = if tp < total_supply {
            supply * (tp / total_supply)
        } else {
            supply
        };
        Ok(Uptake::from_layers(uptake, tp))
    }
}
