//! Daily soil water balance under six crop water uptake formulations
//! (Feddes/SWAP, DSSAT, APSIM, WOFOST, Campbell/CropSyst, EPIC) run side by
//! side on identical soil and crop inputs.

pub mod config;
pub mod crop;
pub mod error;
pub mod output;
pub mod pedotransfer;
pub mod retention;
pub mod root_uptake;
pub mod simulation;
pub mod soil_hydra;

pub use config::ScenarioConfig;
pub use crop::{CropParams, CropState};
pub use error::{ConfigError, ModelError};
pub use output::{CropRecord, MemorySink, OutputSink, SoilRecord};
pub use root_uptake::{Uptake, UptakeModel, UptakeStrategy};
pub use simulation::{Calendar, Horizon, Scenario, ScenarioOutcome, run_scenarios};
pub use soil_hydra::{LayerParams, Overrides, SoilLayer, SoilProfile};
