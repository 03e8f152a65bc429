use crate::error::ModelError;

// Campbell (1985) retention curve parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CampbellParams {
    pub porosity: f64,            // Saturated water content [m3/m3]
    pub air_entry_potential: f64, // [J/kg]
    pub b: f64,                   // Retention curve exponent [-]
}

impl CampbellParams {
    pub fn new(porosity: f64, air_entry_potential: f64, b: f64) -> Self {
        CampbellParams {
            porosity,
            air_entry_potential,
            b,
        }
    }

    // Water potential [J/kg] as a function of water content [m3/m3]
    pub fn potential(&self, content: f64) -> Result<f64, ModelError> {
        potential_from_content(self.porosity, self.air_entry_potential, self.b, content)
    }

    // Water content [m3/m3] as a function of water potential [J/kg]
    pub fn content(&self, potential: f64) -> Result<f64, ModelError> {
        content_from_potential(self.porosity, self.air_entry_potential, self.b, potential)
    }
}

/// Soil water potential [J/kg], Campbell (1985) eq. 5.9.
///
/// `potential = air_entry_potential * (porosity / content)^b`
pub fn potential_from_content(
    porosity: f64,
    air_entry_potential: f64,
    b: f64,
    content: f64,
) -> Result<f64, ModelError> {
    if porosity <= 0.0 {
        return Err(ModelError::Domain {
            operation: "water potential (porosity)",
            value: porosity,
        });
    }
    if content <= 0.0 {
        return Err(ModelError::Domain {
            operation: "water potential (water content)",
            value: content,
        });
    }
    Ok(air_entry_potential * (porosity / content).powf(b))
}

/// Soil water content [m3/m3], the inverse of [`potential_from_content`].
///
/// The potential must share the sign of the air entry potential (both
/// negative for a physical soil), otherwise the power is undefined.
pub fn content_from_potential(
    porosity: f64,
    air_entry_potential: f64,
    b: f64,
    potential: f64,
) -> Result<f64, ModelError> {
    if porosity <= 0.0 {
        return Err(ModelError::Domain {
            operation: "water content (porosity)",
            value: porosity,
        });
    }
    let ratio = potential / air_entry_potential;
    if potential >= 0.0 || ratio.is_nan() || ratio <= 0.0 {
        return Err(ModelError::Domain {
            operation: "water content (water potential)",
            value: potential,
        });
    }
    Ok(porosity * ratio.powf(-1.0 / b))
}
