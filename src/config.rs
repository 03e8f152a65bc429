use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::crop::CropParams;
use crate::error::{ConfigError, ModelError};
use crate::root_uptake::UptakeModel;
use crate::simulation::Horizon;
use crate::soil_hydra::{LayerParams, Overrides};

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Site {
    pub reference_et: f64, // Daily reference evapotranspiration [mm/day]
}

/// A comparison scenario as read from TOML.
///
/// ```toml
/// models = ["apsim", "feddes"]   # optional, all six by default
///
/// [horizon]
/// start_year = 2001
/// start_day = 100
/// end_year = 2001
/// end_day = 200
///
/// [site]
/// reference_et = 5.0
///
/// [overrides]
/// field_capacity = true
///
/// [[layers]]
/// thickness = 0.1
/// clay = 20.0
/// sand = 40.0
/// field_capacity = 0.30
/// initial_available_fraction = 1.0
///
/// [crop.feddes]
/// # ...
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioConfig {
    pub horizon: Horizon,
    pub site: Site,
    #[serde(default)]
    pub overrides: Overrides,
    pub layers: Vec<LayerParams>,
    pub crop: CropParams,
    pub models: Option<Vec<UptakeModel>>,
}

impl ScenarioConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: ScenarioConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    // Checks shared by every scenario built from this configuration
    pub fn validate(&self) -> Result<(), ModelError> {
        self.horizon.validate()?;
        if self.site.reference_et <= 0.0 {
            return Err(ModelError::invalid(
                "site.reference_et",
                format!("transpiration demand must be positive, got {}", self.site.reference_et),
            ));
        }
        if self.layers.is_empty() {
            return Err(ModelError::invalid("layers", "at least one layer is required"));
        }
        if matches!(&self.models, Some(models) if models.is_empty()) {
            return Err(ModelError::invalid("models", "list is empty"));
        }
        self.crop.validate()
    }

    pub fn models(&self) -> Vec<UptakeModel> {
        match &self.models {
            Some(models) => models.clone(),
            None => UptakeModel::ALL.to_vec(),
        }
    }
}
