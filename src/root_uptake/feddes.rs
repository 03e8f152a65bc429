use nalgebra::DVector;

use super::{Uptake, UptakeStrategy, potential_transpiration};
use crate::crop::CropState;
use crate::error::ModelError;
use crate::soil_hydra::SoilProfile;

// Feddes reduction curve breakpoints in water potential [J/kg]
#[derive(Debug, Clone, Copy)]
pub struct FeddesCurve {
    pub saturation: f64,         // No uptake above this potential (P0)
    pub field_capacity: f64,     // Optimal uptake starts (P1)
    pub stress_low_demand: f64,  // Stress onset when demand is low (P2L)
    pub stress_high_demand: f64, // Stress onset when demand is high (P2H)
    pub wilting: f64,            // No uptake below this potential (P3)
    pub demand_low: f64,         // [mm/day]
    pub demand_high: f64,        // [mm/day]
}

impl FeddesCurve {
    // Stress onset potential, interpolated on transpiration demand
    pub fn stress_onset(&self, demand: f64) -> f64 {
        if demand < self.demand_low {
            self.stress_low_demand
        } else if demand > self.demand_high {
            self.stress_high_demand
        } else {
            self.stress_high_demand
                + (self.demand_high - demand) / (self.demand_high - self.demand_low)
                    * (self.stress_low_demand - self.stress_high_demand)
        }
    }

    /// Dimensionless uptake reduction for soil water potential `h` under `demand`.
    ///
    /// Zero outside (wilting, saturation), one between the stress onset and
    /// field capacity, linear in between.
    pub fn reduction(&self, h: f64, demand: f64) -> Result<f64, ModelError> {
        if h >= 0.0 {
            return Err(ModelError::Domain {
                operation: "feddes reduction (water potential)",
                value: h,
            });
        }
        let stress = self.stress_onset(demand);
        let alpha = if h <= self.wilting || h >= self.saturation {
            0.0
        } else if h < stress {
            (h - self.wilting) / (stress - self.wilting)
        } else if h <= self.field_capacity {
            1.0
        } else {
            (h - self.saturation) / (self.field_capacity - self.saturation)
        };
        Ok(alpha)
    }
}

/// SWAP/Feddes water uptake (Feddes et al. 1978; Simunek et al. 1994).
///
/// Field capacity and wilting breakpoints are the profile means of the layer
/// potentials at those limits.
pub struct Feddes;

impl UptakeStrategy for Feddes {
    fn name(&self) -> &'static str {
        "feddes"
    }

    fn compute_uptake(&self, profile: &SoilProfile, crop: &CropState) -> Result<Uptake, ModelError> {
        let tp = potential_transpiration(profile, crop);
        if tp <= 0.0 {
            return Ok(Uptake::zero(profile.len(), tp));
        }

        let params = &crop.params.feddes;
        let curve = FeddesCurve {
            saturation: params.p0,
            field_capacity: profile.mean_field_capacity_potential(),
            stress_low_demand: params.p2_low,
            stress_high_demand: params.p2_high,
            wilting: profile.mean_wilting_point_potential(),
            demand_low: params.r2_low,
            demand_high: params.r2_high,
        };

        let mut uptake = DVector::zeros(profile.len());
        for (i, layer) in profile.layers().iter().enumerate() {
            let alpha = curve.reduction(layer.water_potential(), tp)?;
            uptake[i] = alpha * crop.root_fraction[i] * tp;
        }
        Ok(Uptake::from_layers(uptake, tp))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crop::tests::crop_params;
    use crate::soil_hydra::tests::{manual_layer, two_layer_profile};
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    fn curve() -> FeddesCurve {
        FeddesCurve {
            saturation: -1.0,
            field_capacity: -33.0,
            stress_low_demand: -400.0,
            stress_high_demand: -100.0,
            wilting: -1500.0,
            demand_low: 1.0,
            demand_high: 5.0,
        }
    }

    #[test]
    fn stress_onset_follows_demand() {
        let c = curve();
        assert_relative_eq!(c.stress_onset(0.5), -400.0);
        assert_relative_eq!(c.stress_onset(8.0), -100.0);
        assert_relative_eq!(c.stress_onset(3.0), -250.0);
        assert_relative_eq!(c.stress_onset(5.0), -100.0);
    }

    #[test]
    fn reduction_segments() {
        let c = curve();
        assert_relative_eq!(c.reduction(-875.0, 3.0).unwrap(), 0.5);
        assert_relative_eq!(c.reduction(-100.0, 3.0).unwrap(), 1.0);
        assert_relative_eq!(c.reduction(-33.0, 3.0).unwrap(), 1.0);
        assert_relative_eq!(c.reduction(-10.0, 3.0).unwrap(), 9.0 / 32.0);
        assert_eq!(c.reduction(-2000.0, 3.0).unwrap(), 0.0);
        assert_eq!(c.reduction(-1500.0, 3.0).unwrap(), 0.0);
        assert_eq!(c.reduction(-0.5, 3.0).unwrap(), 0.0);
    }

    #[test]
    fn reduction_rejects_non_negative_potential() {
        assert!(curve().reduction(0.0, 3.0).is_err());
    }

    #[test]
    fn unstressed_profile_meets_demand() {
        let layers = vec![manual_layer(0.1, 0.05, 0.6), manual_layer(0.2, 0.03, 0.4)];
        let crop = CropState::new(crop_params(), &layers).unwrap();
        let uptake = Feddes.compute_uptake(&two_layer_profile(), &crop).unwrap();

        assert_abs_diff_eq!(uptake.per_layer[0], 3.0, epsilon = 1e-9);
        assert_abs_diff_eq!(uptake.per_layer[1], 2.0, epsilon = 1e-9);
        assert_abs_diff_eq!(uptake.attained, 5.0, epsilon = 1e-9);
    }

    #[test]
    fn no_demand_means_no_uptake() {
        let layers = vec![manual_layer(0.1, 0.05, 0.6), manual_layer(0.2, 0.03, 0.4)];
        let crop = CropState::new(crop_params(), &layers).unwrap();
        let mut profile = two_layer_profile();
        profile.reference_et = 0.0;

        let uptake = Feddes.compute_uptake(&profile, &crop).unwrap();
        assert_eq!(uptake.attained, 0.0);
    }
}
