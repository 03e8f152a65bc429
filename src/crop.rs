use nalgebra::DVector;
use serde::Deserialize;

use crate::error::ModelError;
use crate::pedotransfer::FIELD_CAPACITY_POTENTIAL;
use crate::root_uptake::Uptake;
use crate::soil_hydra::LayerParams;

// Feddes/SWAP stress breakpoints
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct FeddesParams {
    pub p0: f64,      // Potential above which roots stop extracting (saturation) [J/kg]
    pub p2_low: f64,  // Stress onset under low transpiration demand [J/kg]
    pub p2_high: f64, // Stress onset under high transpiration demand [J/kg]
    pub r2_low: f64,  // Low transpiration demand [mm/day]
    pub r2_high: f64, // High transpiration demand [mm/day]
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct DssatParams {
    pub max_uptake: f64, // Maximum uptake per unit root length [cm3 water/cm root/day]
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CampbellCropParams {
    pub max_transpiration: f64,           // [mm/day]
    pub leaf_potential_stress_onset: f64, // Onset of stomatal closure [J/kg]
    pub leaf_potential_wilting: f64,      // [J/kg]
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct EpicParams {
    pub water_extraction_distribution: f64, // Root weighting decay parameter [-]
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct WofostParams {
    #[serde(default = "default_drought_category")]
    pub drought_category: u8, // 1 (sensitive) to 5 (resistant)
}

impl Default for WofostParams {
    fn default() -> Self {
        WofostParams {
            drought_category: default_drought_category(),
        }
    }
}

fn default_drought_category() -> u8 {
    4
}

fn default_light_interception() -> f64 {
    1.0
}

fn default_root_depth() -> f64 {
    1.0
}

// Crop constants for every uptake formulation
#[derive(Debug, Clone, Deserialize)]
pub struct CropParams {
    pub feddes: FeddesParams,
    pub dssat: DssatParams,
    pub campbell: CampbellCropParams,
    pub epic: EpicParams,
    #[serde(default)]
    pub wofost: WofostParams,
    #[serde(default = "default_light_interception")]
    pub light_interception: f64, // Fraction of radiation intercepted by the canopy [-]
    #[serde(default = "default_root_depth")]
    pub root_depth: f64, // [m]
}

impl CropParams {
    pub fn validate(&self) -> Result<(), ModelError> {
        if !(self.light_interception > 0.0 && self.light_interception <= 1.0) {
            return Err(ModelError::invalid(
                "light_interception",
                format!("must be within (0, 1], got {}", self.light_interception),
            ));
        }
        if self.root_depth <= 0.0 {
            return Err(ModelError::invalid("root_depth", "must be positive"));
        }

        let f = &self.feddes;
        if f.r2_low >= f.r2_high {
            return Err(ModelError::invalid(
                "feddes.r2_low",
                format!("low demand {} must be below high demand {}", f.r2_low, f.r2_high),
            ));
        }
        if f.p0 >= 0.0 || f.p2_low >= 0.0 || f.p2_high >= 0.0 {
            return Err(ModelError::invalid("feddes", "breakpoint potentials must be negative"));
        }

        if self.dssat.max_uptake <= 0.0 {
            return Err(ModelError::invalid("dssat.max_uptake", "must be positive"));
        }

        let c = &self.campbell;
        if c.max_transpiration <= 0.0 {
            return Err(ModelError::invalid("campbell.max_transpiration", "must be positive"));
        }
        if c.leaf_potential_stress_onset >= FIELD_CAPACITY_POTENTIAL {
            return Err(ModelError::invalid(
                "campbell.leaf_potential_stress_onset",
                format!("must be below {FIELD_CAPACITY_POTENTIAL} J/kg"),
            ));
        }
        if c.leaf_potential_wilting >= c.leaf_potential_stress_onset {
            return Err(ModelError::invalid(
                "campbell.leaf_potential_wilting",
                "must be below the stress onset potential",
            ));
        }

        if self.epic.water_extraction_distribution <= 0.0 {
            return Err(ModelError::invalid("epic.water_extraction_distribution", "must be positive"));
        }
        if !(1..=5).contains(&self.wofost.drought_category) {
            return Err(ModelError::invalid(
                "wofost.drought_category",
                format!("must be within 1..=5, got {}", self.wofost.drought_category),
            ));
        }
        Ok(())
    }
}

/// Crop parameters, root distribution and transpiration bookkeeping for one scenario.
#[derive(Debug, Clone)]
pub struct CropState {
    pub params: CropParams,
    pub root_density: DVector<f64>,        // [m root/m3 soil]
    pub root_fraction: DVector<f64>,       // [-]
    pub water_uptake: DVector<f64>,        // Last day's uptake per layer [mm]
    pub attained_transpiration: f64,       // [mm/day]
    pub potential_transpiration: f64,      // [mm/day]
    pub cumulative_attained: f64,          // [mm]
    pub cumulative_potential: f64,         // [mm]
    pub transpiration_ratio: f64,          // [-]
    pub leaf_water_potential: Option<f64>, // [J/kg], Campbell only
}

impl CropState {
    pub fn new(params: CropParams, layers: &[LayerParams]) -> Result<Self, ModelError> {
        params.validate()?;

        let n = layers.len();
        let root_density = DVector::from_iterator(n, layers.iter().map(|l| l.root_density));
        let root_fraction = DVector::from_iterator(n, layers.iter().map(|l| l.root_fraction));
        if root_density.iter().any(|d| *d < 0.0) {
            return Err(ModelError::invalid("root_density", "must not be negative"));
        }
        if root_fraction.iter().any(|f| !(0.0..=1.0).contains(f)) {
            return Err(ModelError::invalid("root_fraction", "must be within [0, 1]"));
        }
        if root_fraction.sum() > 1.0 + 1e-9 {
            return Err(ModelError::invalid(
                "root_fraction",
                format!("layer fractions sum to {}, more than 1", root_fraction.sum()),
            ));
        }

        Ok(CropState {
            params,
            root_density,
            root_fraction,
            water_uptake: DVector::zeros(n),
            attained_transpiration: 0.0,
            potential_transpiration: 0.0,
            cumulative_attained: 0.0,
            cumulative_potential: 0.0,
            transpiration_ratio: 0.0,
            leaf_water_potential: None,
        })
    }

    pub fn layer_count(&self) -> usize {
        self.root_fraction.len()
    }

    /// Checks that a day's uptake can be recorded against this crop.
    pub fn check(&self, uptake: &Uptake) -> Result<(), ModelError> {
        if uptake.potential <= 0.0 {
            return Err(ModelError::NonPositiveDemand {
                model: "transpiration ratio",
                potential: uptake.potential,
            });
        }
        if uptake.per_layer.len() != self.layer_count() {
            return Err(ModelError::LayerCountMismatch {
                expected: self.layer_count(),
                found: uptake.per_layer.len(),
            });
        }
        Ok(())
    }

    /// Stores one day's uptake and advances the cumulative totals.
    pub fn record(&mut self, uptake: Uptake) -> Result<(), ModelError> {
        self.check(&uptake)?;
        self.attained_transpiration = uptake.attained;
        self.potential_transpiration = uptake.potential;
        self.cumulative_attained += uptake.attained;
        self.cumulative_potential += uptake.potential;
        self.transpiration_ratio = uptake.attained / uptake.potential;
        self.leaf_water_potential = uptake.leaf_water_potential;
        self.water_uptake = uptake.per_layer;
        Ok(())
    }
}
