use std::io::{self, Write};

use serde::Serialize;

use crate::crop::CropState;
use crate::soil_hydra::SoilProfile;

// Daily crop result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CropRecord {
    pub sim_day: u32,
    pub year: i32,
    pub day_of_year: u32,
    pub transpiration: f64,            // Attained [mm/day]
    pub potential_transpiration: f64,  // [mm/day]
    pub transpiration_ratio: f64,      // [-]
    pub cumulative_transpiration: f64, // [mm]
    pub cumulative_potential: f64,     // [mm]
}

impl CropRecord {
    pub fn new(sim_day: u32, year: i32, day_of_year: u32, crop: &CropState) -> Self {
        CropRecord {
            sim_day,
            year,
            day_of_year,
            transpiration: crop.attained_transpiration,
            potential_transpiration: crop.potential_transpiration,
            transpiration_ratio: crop.transpiration_ratio,
            cumulative_transpiration: crop.cumulative_attained,
            cumulative_potential: crop.cumulative_potential,
        }
    }
}

// Daily soil result; surface fluxes are not modelled and stay at zero
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SoilRecord {
    pub sim_day: u32,
    pub year: i32,
    pub day_of_year: u32,
    pub runoff: f64,
    pub infiltration: f64,
    pub drainage: f64,
    pub soil_evaporation: f64,
    pub water_content: Vec<f64>,   // [m3/m3] per layer
    pub water_potential: Vec<f64>, // [J/kg] per layer
}

impl SoilRecord {
    pub fn new(sim_day: u32, year: i32, day_of_year: u32, profile: &SoilProfile) -> Self {
        SoilRecord {
            sim_day,
            year,
            day_of_year,
            runoff: 0.0,
            infiltration: 0.0,
            drainage: 0.0,
            soil_evaporation: 0.0,
            water_content: profile.water_contents().iter().copied().collect(),
            water_potential: profile.water_potentials().iter().copied().collect(),
        }
    }
}

/// Receives one crop and one soil record per simulated day.
pub trait OutputSink {
    fn record(&mut self, crop: CropRecord, soil: SoilRecord);
}

// Buffers a scenario's records in day order
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    pub crop: Vec<CropRecord>,
    pub soil: Vec<SoilRecord>,
}

impl MemorySink {
    pub fn len(&self) -> usize {
        self.crop.len()
    }

    pub fn is_empty(&self) -> bool {
        self.crop.is_empty()
    }

    pub fn last(&self) -> Option<&CropRecord> {
        self.crop.last()
    }
}

impl OutputSink for MemorySink {
    fn record(&mut self, crop: CropRecord, soil: SoilRecord) {
        self.crop.push(crop);
        self.soil.push(soil);
    }
}

pub fn write_crop_csv<W: Write>(mut out: W, records: &[CropRecord]) -> io::Result<()> {
    writeln!(
        out,
        "sim_day,year,doy,transpiration,potential_transpiration,transpiration_ratio,cumulative_transpiration,cumulative_potential_transpiration"
    )?;
    for r in records {
        writeln!(
            out,
            "{},{},{},{:.6},{:.6},{:.6},{:.6},{:.6}",
            r.sim_day,
            r.year,
            r.day_of_year,
            r.transpiration,
            r.potential_transpiration,
            r.transpiration_ratio,
            r.cumulative_transpiration,
            r.cumulative_potential
        )?;
    }
    Ok(())
}

pub fn write_soil_csv<W: Write>(mut out: W, records: &[SoilRecord]) -> io::Result<()> {
    let layers = records.first().map_or(0, |r| r.water_content.len());
    let mut header = String::from("sim_day,year,doy,runoff,infiltration,drainage,soil_evaporation");
    for i in 1..=layers {
        header.push_str(&format!(",layer_{i}_wc"));
    }
    for i in 1..=layers {
        header.push_str(&format!(",layer_{i}_wp"));
    }
    writeln!(out, "{header}")?;

    for r in records {
        write!(
            out,
            "{},{},{},{:.3},{:.3},{:.3},{:.3}",
            r.sim_day, r.year, r.day_of_year, r.runoff, r.infiltration, r.drainage, r.soil_evaporation
        )?;
        for wc in &r.water_content {
            write!(out, ",{wc:.6}")?;
        }
        for wp in &r.water_potential {
            write!(out, ",{wp:.4}")?;
        }
        writeln!(out)?;
    }
    Ok(())
}
