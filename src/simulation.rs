use serde::{Deserialize, Serialize};
use tracing::{info, trace, warn};

use crate::config::ScenarioConfig;
use crate::crop::CropState;
use crate::error::ModelError;
use crate::output::{CropRecord, MemorySink, OutputSink, SoilRecord};
use crate::root_uptake::UptakeModel;
use crate::soil_hydra::SoilProfile;

#[cfg(feature = "threading")]
use rayon::prelude::*;

// Simulation horizon; the end day itself is not simulated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Horizon {
    pub start_year: i32,
    pub start_day: u32,
    pub end_year: i32,
    pub end_day: u32,
}

impl Horizon {
    pub fn validate(&self) -> Result<(), ModelError> {
        for (name, year, day) in [
            ("start", self.start_year, self.start_day),
            ("end", self.end_year, self.end_day),
        ] {
            if day == 0 || day > days_in_year(year) {
                return Err(ModelError::InvalidHorizon(format!(
                    "{name} day {day} is not a day of {year}"
                )));
            }
        }
        if (self.end_year, self.end_day) <= (self.start_year, self.start_day) {
            return Err(ModelError::InvalidHorizon(format!(
                "end {}/{} must come after start {}/{}",
                self.end_year, self.end_day, self.start_year, self.start_day
            )));
        }
        Ok(())
    }

    // Number of simulated days
    pub fn days(&self) -> usize {
        let mut calendar = Calendar::new(self.start_year, self.start_day);
        let mut days = 0;
        while !calendar.reached(self) {
            calendar.advance();
            days += 1;
        }
        days
    }
}

pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

pub fn days_in_year(year: i32) -> u32 {
    if is_leap_year(year) { 366 } else { 365 }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Calendar {
    pub year: i32,
    pub day_of_year: u32,
}

impl Calendar {
    pub fn new(year: i32, day_of_year: u32) -> Self {
        Calendar { year, day_of_year }
    }

    pub fn advance(&mut self) {
        self.day_of_year += 1;
        if self.day_of_year > days_in_year(self.year) {
            self.day_of_year = 1;
            self.year += 1;
        }
    }

    pub fn reached(&self, horizon: &Horizon) -> bool {
        (self.year, self.day_of_year) >= (horizon.end_year, horizon.end_day)
    }
}

/// One soil profile, one crop and one uptake formulation.
///
/// Scenarios share no state, so any number of them can run side by side.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub model: UptakeModel,
    pub profile: SoilProfile,
    pub crop: CropState,
}

impl Scenario {
    pub fn new(model: UptakeModel, config: &ScenarioConfig) -> Result<Self, ModelError> {
        let profile =
            SoilProfile::initialize(&config.layers, config.overrides, config.site.reference_et)?;
        let crop = CropState::new(config.crop.clone(), &config.layers)?;
        Ok(Scenario {
            model,
            profile,
            crop,
        })
    }

    /// Computes today's uptake, removes it from the profile and updates the crop totals.
    pub fn step(&mut self) -> Result<(), ModelError> {
        let uptake = self
            .model
            .strategy()
            .compute_uptake(&self.profile, &self.crop)?;
        self.crop.check(&uptake)?;
        self.profile.advance(&uptake.per_layer)?;
        self.crop.record(uptake)
    }

    // Step through the horizon, emitting a record per day
    pub fn run(&mut self, horizon: &Horizon, sink: &mut dyn OutputSink) -> Result<(), ModelError> {
        horizon.validate()?;
        let mut calendar = Calendar::new(horizon.start_year, horizon.start_day);
        let mut sim_day = 1;

        while !calendar.reached(horizon) {
            self.step()?;
            trace!(
                model = %self.model,
                sim_day,
                attained = self.crop.attained_transpiration,
                ratio = self.crop.transpiration_ratio,
                "day complete"
            );
            sink.record(
                CropRecord::new(sim_day, calendar.year, calendar.day_of_year, &self.crop),
                SoilRecord::new(sim_day, calendar.year, calendar.day_of_year, &self.profile),
            );
            sim_day += 1;
            calendar.advance();
        }
        Ok(())
    }
}

/// Result of one scenario: the records it produced and, if it stopped early, why.
#[derive(Debug, Clone)]
pub struct ScenarioOutcome {
    pub model: UptakeModel,
    pub output: MemorySink,
    pub error: Option<ModelError>,
}

impl ScenarioOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

fn run_one(model: UptakeModel, config: &ScenarioConfig) -> ScenarioOutcome {
    let mut output = MemorySink::default();
    let result =
        Scenario::new(model, config).and_then(|mut s| s.run(&config.horizon, &mut output));

    match &result {
        Ok(()) => {
            if let Some(last) = output.last() {
                info!(
                    model = %model,
                    days = output.len(),
                    cumulative = last.cumulative_transpiration,
                    potential = last.cumulative_potential,
                    "scenario finished"
                );
            }
        }
        Err(err) => warn!(model = %model, days = output.len(), "scenario aborted: {err}"),
    }

    ScenarioOutcome {
        model,
        output,
        error: result.err(),
    }
}

/// Runs every configured uptake model against its own copy of the soil and crop.
///
/// Configuration problems shared by all scenarios are returned up front; a
/// failure inside one scenario is recorded in its outcome and the others go on.
pub fn run_scenarios(config: &ScenarioConfig) -> Result<Vec<ScenarioOutcome>, ModelError> {
    config.validate()?;
    let models = config.models();
    info!(
        models = models.len(),
        days = config.horizon.days(),
        layers = config.layers.len(),
        "starting uptake comparison"
    );

    #[cfg(feature = "threading")]
    let outcomes = models.par_iter().map(|m| run_one(*m, config)).collect();
    #[cfg(not(feature = "threading"))]
    let outcomes = models.iter().map(|m| run_one(*m, config)).collect();

    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::sample_config;
    use approx::assert_relative_eq;

    fn horizon(start: (i32, u32), end: (i32, u32)) -> Horizon {
        Horizon {
            start_year: start.0,
            start_day: start.1,
            end_year: end.0,
            end_day: end.1,
        }
    }

    #[test]
    fn calendar_rolls_over_the_year() {
        let mut c = Calendar::new(2001, 365);
        c.advance();
        assert_eq!(c, Calendar::new(2002, 1));

        let mut c = Calendar::new(2000, 365);
        c.advance();
        assert_eq!(c, Calendar::new(2000, 366));
        c.advance();
        assert_eq!(c, Calendar::new(2001, 1));
    }

    #[test]
    fn horizon_length() {
        assert_eq!(horizon((2001, 100), (2001, 110)).days(), 10);
        assert_eq!(horizon((2001, 360), (2002, 5)).days(), 10);
        assert_eq!(horizon((2000, 360), (2001, 1)).days(), 7);
    }

    #[test]
    fn horizon_must_move_forward() {
        assert!(horizon((2001, 100), (2001, 100)).validate().is_err());
        assert!(horizon((2001, 100), (2000, 200)).validate().is_err());
        assert!(horizon((2001, 0), (2001, 10)).validate().is_err());
        assert!(horizon((2001, 1), (2001, 366)).validate().is_err());
        assert!(horizon((2001, 1), (2002, 1)).validate().is_ok());
    }

    #[test]
    fn apsim_first_day_matches_hand_calculation() {
        let mut config = sample_config();
        config.horizon = horizon((2001, 100), (2001, 101));
        let mut scenario = Scenario::new(UptakeModel::Apsim, &config).unwrap();
        let mut sink = MemorySink::default();
        scenario.run(&config.horizon, &mut sink).unwrap();

        assert_eq!(sink.len(), 1);
        let crop = &sink.crop[0];
        assert_eq!((crop.sim_day, crop.year, crop.day_of_year), (1, 2001, 100));
        // Supply-limited: 1.0 + 1.2 mm against 5 mm of demand
        assert_relative_eq!(scenario.crop.water_uptake[0], 1.0, epsilon = 1e-9);
        assert_relative_eq!(scenario.crop.water_uptake[1], 1.2, epsilon = 1e-9);
        assert_relative_eq!(crop.transpiration, 2.2, epsilon = 1e-9);
        assert_relative_eq!(crop.potential_transpiration, 5.0, epsilon = 1e-9);
        assert_relative_eq!(crop.transpiration_ratio, 0.44, epsilon = 1e-9);

        let soil = &sink.soil[0];
        assert_relative_eq!(soil.water_content[0], 0.29, epsilon = 1e-9);
        assert_relative_eq!(soil.water_content[1], 0.294, epsilon = 1e-9);
        assert_eq!(soil.runoff, 0.0);
    }

    #[test]
    fn rejected_step_leaves_soil_and_crop_untouched() {
        let config = sample_config();
        let mut scenario = Scenario::new(UptakeModel::Feddes, &config).unwrap();
        scenario.profile.reference_et = 0.0;
        let before = scenario.profile.water_contents();

        let err = scenario.step().unwrap_err();
        assert!(matches!(err, ModelError::NonPositiveDemand { .. }));
        assert_eq!(scenario.profile.water_contents(), before);
        assert_eq!(scenario.crop.cumulative_potential, 0.0);
    }

    #[test]
    fn records_follow_the_calendar() {
        let mut config = sample_config();
        config.horizon = horizon((2001, 364), (2002, 3));
        let outcomes = run_scenarios(&config).unwrap();
        assert_eq!(outcomes.len(), 6);

        for outcome in &outcomes {
            assert!(outcome.is_ok(), "{}: {:?}", outcome.model, outcome.error);
            let days: Vec<_> = outcome
                .output
                .crop
                .iter()
                .map(|r| (r.sim_day, r.year, r.day_of_year))
                .collect();
            assert_eq!(
                days,
                vec![(1, 2001, 364), (2, 2001, 365), (3, 2002, 1), (4, 2002, 2)]
            );
        }
    }

    #[test]
    fn failing_scenario_does_not_stop_the_others() {
        let mut config = sample_config();
        // Enough demand to drain Feddes and WOFOST layers below zero content
        config.site.reference_et = 60.0;
        config.crop.campbell.max_transpiration = 60.0;
        config.horizon = horizon((2001, 100), (2001, 130));

        let outcomes = run_scenarios(&config).unwrap();
        let failed: Vec<_> = outcomes.iter().filter(|o| !o.is_ok()).collect();
        let succeeded: Vec<_> = outcomes.iter().filter(|o| o.is_ok()).collect();
        assert!(!failed.is_empty());
        assert!(!succeeded.is_empty());
        for outcome in failed {
            assert!(outcome.output.len() < 30);
            assert!(!outcome.error.as_ref().unwrap().is_configuration());
        }
    }

    #[test]
    fn invalid_configuration_stops_before_any_scenario() {
        let mut config = sample_config();
        config.site.reference_et = 0.0;
        assert!(run_scenarios(&config).is_err());
    }
}
