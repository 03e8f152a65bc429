use nalgebra::DVector;

use super::{Uptake, UptakeStrategy, potential_transpiration};
use crate::crop::CropState;
use crate::error::ModelError;
use crate::soil_hydra::SoilProfile;

const MM_TO_CM: f64 = 10.0;

/// Soil water depletion fraction `p` (Doorenbos et al. 1978, WOFOST sweaf).
///
/// `et` is potential transpiration [mm/day]; `drought_category` runs from
/// 1 (sensitive) to 5 (resistant). The result is clamped to [0.10, 0.95].
pub fn depletion_factor(et: f64, drought_category: u8) -> f64 {
    let et = et / MM_TO_CM;
    let category = f64::from(drought_category);
    let mut p = 1.0 / (0.76 + 1.5 * et) - (5.0 - category) * 0.10;
    if category < 3.0 {
        p += (et - 0.6) / (category * (category + 3.0));
    }
    p.clamp(0.10, 0.95)
}

/// WOFOST water uptake (Supit et al. 1994, evtra).
///
/// WOFOST treats the rooted zone as one compartment: layer thickness stands in
/// for the root fraction. Profiles deeper than 1 m are normalized by their
/// total thickness so uptake stays within demand.
pub struct Wofost;

impl UptakeStrategy for Wofost {
    fn name(&self) -> &'static str {
        "wofost"
    }

    fn compute_uptake(&self, profile: &SoilProfile, crop: &CropState) -> Result<Uptake, ModelError> {
        let tp = potential_transpiration(profile, crop);
        let p = depletion_factor(tp, crop.params.wofost.drought_category);

        let thickness = profile.thicknesses();
        let total = thickness.sum();
        let weights = if total > 1.0 { thickness / total } else { thickness };

        let mut uptake = DVector::zeros(profile.len());
        for (i, layer) in profile.layers().iter().enumerate() {
            let critical = (1.0 - p) * layer.available_capacity() + layer.wilting_point;
            let stress = ((layer.water_content() - layer.wilting_point)
                / (critical - layer.wilting_point))
                .clamp(0.0, 1.0);
            uptake[i] = stress * weights[i] * tp;
        }
        Ok(Uptake::from_layers(uptake, tp))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crop::tests::crop_params;
    use crate::soil_hydra::Overrides;
    use crate::soil_hydra::tests::{manual_layer, two_layer_profile};
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    #[test]
    fn depletion_factor_fixed_points() {
        assert_abs_diff_eq!(depletion_factor(5.0, 4), 0.5623, epsilon = 1e-4);
        assert_abs_diff_eq!(depletion_factor(10.0, 4), 0.3425, epsilon = 1e-4);
        assert_abs_diff_eq!(depletion_factor(5.0, 1), 0.2373, epsilon = 1e-4);
    }

    #[test]
    fn depletion_factor_is_clamped() {
        assert_relative_eq!(depletion_factor(0.0, 5), 0.95);
        assert_relative_eq!(depletion_factor(100.0, 4), 0.10);
    }

    #[test]
    fn wet_layers_use_thickness_weights() {
        let layers = vec![manual_layer(0.1, 0.05, 0.6), manual_layer(0.2, 0.03, 0.4)];
        let crop = CropState::new(crop_params(), &layers).unwrap();
        let uptake = Wofost.compute_uptake(&two_layer_profile(), &crop).unwrap();
        assert_relative_eq!(uptake.per_layer[0], 0.5, epsilon = 1e-9);
        assert_relative_eq!(uptake.per_layer[1], 1.0, epsilon = 1e-9);
    }

    #[test]
    fn stress_scales_below_critical_content() {
        let mut layer = manual_layer(0.5, 0.05, 1.0);
        layer.initial_available_fraction = 0.2;
        let crop = CropState::new(crop_params(), std::slice::from_ref(&layer)).unwrap();
        let profile = SoilProfile::initialize(&[layer], Overrides::all(), 5.0).unwrap();

        let p = depletion_factor(5.0, 4);
        let stress = 0.2 / (1.0 - p);
        let uptake = Wofost.compute_uptake(&profile, &crop).unwrap();
        assert_relative_eq!(uptake.attained, stress * 0.5 * 5.0, epsilon = 1e-9);
    }

    #[test]
    fn deep_profiles_stay_within_demand() {
        let layers = vec![manual_layer(0.8, 0.05, 0.5), manual_layer(0.7, 0.03, 0.5)];
        let crop = CropState::new(crop_params(), &layers).unwrap();
        let profile = SoilProfile::initialize(&layers, Overrides::all(), 5.0).unwrap();
        let uptake = Wofost.compute_uptake(&profile, &crop).unwrap();
        assert_relative_eq!(uptake.attained, 5.0, epsilon = 1e-9);
    }
}
