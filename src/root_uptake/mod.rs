//! Crop water uptake formulations.
//!
//! Every formulation turns the day's potential transpiration into per-layer
//! root extraction [mm/day] for one soil profile. They share the
//! [`UptakeStrategy`] contract and are selected by name through [`UptakeModel`].

mod apsim;
mod campbell;
mod dssat;
mod epic;
mod feddes;
mod wofost;

use std::fmt;
use std::str::FromStr;

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::crop::CropState;
use crate::error::ModelError;
use crate::soil_hydra::SoilProfile;

pub use apsim::Apsim;
pub use campbell::Campbell;
pub use dssat::Dssat;
pub use epic::Epic;
pub use feddes::{Feddes, FeddesCurve};
pub use wofost::{Wofost, depletion_factor};

/// One day of root water uptake.
#[derive(Debug, Clone, PartialEq)]
pub struct Uptake {
    pub per_layer: DVector<f64>,           // [mm/day]
    pub attained: f64,                     // Sum of per-layer uptake [mm/day]
    pub potential: f64,                    // Demand the model compares against [mm/day]
    pub leaf_water_potential: Option<f64>, // [J/kg]
}

impl Uptake {
    pub fn from_layers(per_layer: DVector<f64>, potential: f64) -> Self {
        let attained = per_layer.sum();
        Uptake {
            per_layer,
            attained,
            potential,
            leaf_water_potential: None,
        }
    }

    pub fn zero(layers: usize, potential: f64) -> Self {
        Uptake::from_layers(DVector::zeros(layers), potential)
    }

    // Ration layer uptake so the total never exceeds `limit`
    pub(crate) fn capped(per_layer: DVector<f64>, limit: f64) -> DVector<f64> {
        let total = per_layer.sum();
        if total > limit && total > 0.0 {
            per_layer * (limit / total)
        } else {
            per_layer
        }
    }
}

pub trait UptakeStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Computes today's uptake without touching the profile or crop.
    fn compute_uptake(&self, profile: &SoilProfile, crop: &CropState) -> Result<Uptake, ModelError>;
}

// Potential transpiration [mm/day] from reference ET and canopy interception
pub fn potential_transpiration(profile: &SoilProfile, crop: &CropState) -> f64 {
    profile.reference_et * crop.params.light_interception
}

pub(crate) fn require_demand(model: &'static str, potential: f64) -> Result<(), ModelError> {
    if potential > 0.0 {
        Ok(())
    } else {
        Err(ModelError::NonPositiveDemand { model, potential })
    }
}

/// Registry of the uptake formulations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UptakeModel {
    #[serde(alias = "swap")]
    Feddes,
    Dssat,
    Apsim,
    Wofost,
    #[serde(alias = "cropsyst")]
    Campbell,
    Epic,
}

impl UptakeModel {
    pub const ALL: [UptakeModel; 6] = [
        UptakeModel::Campbell,
        UptakeModel::Dssat,
        UptakeModel::Apsim,
        UptakeModel::Feddes,
        UptakeModel::Epic,
        UptakeModel::Wofost,
    ];

    pub fn strategy(self) -> &'static dyn UptakeStrategy {
        match self {
            UptakeModel::Feddes => &Feddes,
            UptakeModel::Dssat => &Dssat,
            UptakeModel::Apsim => &Apsim,
            UptakeModel::Wofost => &Wofost,
            UptakeModel::Campbell => &Campbell,
            UptakeModel::Epic => &Epic,
        }
    }

    pub fn name(self) -> &'static str {
        self.strategy().name()
    }
}

impl fmt::Display for UptakeModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for UptakeModel {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "feddes" | "swap" => Ok(UptakeModel::Feddes),
            "dssat" => Ok(UptakeModel::Dssat),
            "apsim" => Ok(UptakeModel::Apsim),
            "wofost" => Ok(UptakeModel::Wofost),
            "campbell" | "cropsyst" => Ok(UptakeModel::Campbell),
            "epic" => Ok(UptakeModel::Epic),
            _ => Err(ModelError::invalid("model", format!("unknown uptake model '{s}'"))),
        }
    }
}
