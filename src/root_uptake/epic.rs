use nalgebra::DVector;

use super::{Uptake, UptakeStrategy, potential_transpiration, require_demand};
use crate::crop::CropState;
use crate::error::ModelError;
use crate::soil_hydra::SoilProfile;

const COMPENSATION: f64 = 0.5; // CPWU
const GROWTH_STRESS: f64 = 1.0; // RGS
const S_CURVE_A: f64 = 9.0; // Fitted from 9.6991521
const S_CURVE_B: f64 = 0.005; // Fitted from 0.004988621
const MIN_WETTING_DAYS: f64 = 5.0;
const MAX_WETTING_DAYS: f64 = 5000.0;

/// EPIC0810 water uptake.
///
/// Demand is spread over depth with an exponential root weighting. Each layer
/// takes the smaller of its share of demand, less a compensation term for what
/// shallower layers already took, and its water above the wilting point,
/// reduced by an S-curve on the layer's wetness.
pub struct Epic;

fn ln_positive(value: f64, operation: &'static str) -> Result<f64, ModelError> {
    if value <= 0.0 {
        return Err(ModelError::Domain { operation, value });
    }
    Ok(value.ln())
}

impl UptakeStrategy for Epic {
    fn name(&self) -> &'static str {
        "epic"
    }

    fn compute_uptake(&self, profile: &SoilProfile, crop: &CropState) -> Result<Uptake, ModelError> {
        let ep = potential_transpiration(profile, crop);
        require_demand(self.name(), ep)?;

        let ub1 = crop.params.epic.water_extraction_distribution;
        let uob = 1.0 - (-ub1).exp();
        let root_depth = crop.params.root_depth;

        let mut uptake = DVector::zeros(profile.len());
        let mut taken = 0.0;
        let mut previous_demand = 0.0;
        for (i, layer) in profile.layers().iter().enumerate() {
            let volume = layer.thickness * profile.water_density;
            let wilting = layer.wilting_point * volume; // [mm]
            let field_capacity = layer.field_capacity * volume;
            let stored = layer.water_content() * volume;

            // Cumulative demand down to this layer
            let depth = layer.depth.min(root_depth);
            let demand = ep * (1.0 - (-ub1 * depth / root_depth).exp()) / uob;

            let ln_wilting = ln_positive(wilting, "epic wetness (wilting point storage)")?;
            let ln_stored = ln_positive(stored, "epic wetness (soil water storage)")?;
            let ln_field = ln_positive(field_capacity, "epic wetness (field capacity storage)")?;
            let wetness = (ln_stored - ln_wilting) / (ln_field - ln_wilting);

            // Days since wetting proxy
            let wtn = 10f64.powf(3.1761 - 1.6576 * wetness).max(MIN_WETTING_DAYS);
            if wtn < MAX_WETTING_DAYS {
                let reduction = 1.0 - wtn / (wtn + (S_CURVE_A - S_CURVE_B * wtn).exp());
                let allocated =
                    demand - COMPENSATION * taken - (1.0 - COMPENSATION) * previous_demand;
                uptake[i] = (allocated.min(stored - wilting) * GROWTH_STRESS * reduction).max(0.0);
            }
            taken += uptake[i];
            previous_demand = demand;
        }

        Ok(Uptake::from_layers(uptake, ep))
    }
}
