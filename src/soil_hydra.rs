use nalgebra::DVector;
use serde::Deserialize;
use tracing::debug;

use crate::error::ModelError;
use crate::pedotransfer::{
    WILTING_POINT_POTENTIAL, air_entry_potential, b_exponent, bulk_density,
    field_capacity_33kpa, field_capacity_potential_from_clay, organic_matter_from_clay,
    saturated_water_content, wilting_point_1500kpa,
};
use crate::retention::CampbellParams;

pub const WATER_DENSITY: f64 = 1000.0; // kg/m3

// Per-layer soil record as supplied by the input provider
#[derive(Debug, Clone, Deserialize)]
pub struct LayerParams {
    pub thickness: f64,                   // [m]
    pub cum_depth: Option<f64>,           // Cumulative profile depth at the layer [m]
    pub clay: f64,                        // [%]
    pub sand: f64,                        // [%]
    pub organic_matter: Option<f64>,      // [%]
    pub bulk_density: Option<f64>,        // [Mg/m3]
    pub field_capacity: Option<f64>,      // [m3/m3]
    pub wilting_point: Option<f64>,       // [m3/m3]
    #[serde(default)]
    pub root_density: f64,                // [m root/m3 soil]
    #[serde(default)]
    pub root_fraction: f64,               // [-]
    #[serde(default)]
    pub kl: f64,                          // APSIM water extraction rate [1/day]
    pub initial_available_fraction: f64,  // Fraction of plant available water at start [-]
}

// Which layer properties are taken as given instead of estimated from texture
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct Overrides {
    pub organic_matter: bool,
    pub bulk_density: bool,
    pub field_capacity: bool,
    pub wilting_point: bool,
}

impl Overrides {
    pub fn all() -> Self {
        Overrides {
            organic_matter: true,
            bulk_density: true,
            field_capacity: true,
            wilting_point: true,
        }
    }
}

// Soil layer with static hydraulic properties and daily moisture state
#[derive(Debug, Clone)]
pub struct SoilLayer {
    pub thickness: f64,                // [m]
    pub depth: f64,                    // Cumulative depth [m]
    pub clay: f64,                     // [-]
    pub sand: f64,                     // [-]
    pub organic_matter: f64,           // [%]
    pub bulk_density: f64,             // [Mg/m3]
    pub retention: CampbellParams,     // Porosity, air entry potential and b
    pub field_capacity: f64,           // [m3/m3]
    pub wilting_point: f64,            // [m3/m3]
    pub field_capacity_potential: f64, // [J/kg]
    pub wilting_point_potential: f64,  // [J/kg]
    pub saturation_potential: f64,     // [J/kg]
    pub kl: f64,                       // [1/day]
    pub initial_available_water: f64,  // [mm]
    water_content: f64,                // [m3/m3]
    water_potential: f64,              // [J/kg]
}

impl SoilLayer {
    // Derive hydraulic properties for one layer and set its initial moisture
    fn from_params(
        index: usize,
        params: &LayerParams,
        depth: f64,
        overrides: Overrides,
    ) -> Result<Self, ModelError> {
        if params.thickness <= 0.0 {
            return Err(ModelError::invalid(
                "thickness",
                format!("layer {index} must be thicker than zero, got {}", params.thickness),
            ));
        }
        if !(0.0..=1.0).contains(&params.initial_available_fraction) {
            return Err(ModelError::invalid(
                "initial_available_fraction",
                format!("layer {index} must be within [0, 1], got {}", params.initial_available_fraction),
            ));
        }

        if !(0.0..=1.0).contains(&params.kl) {
            return Err(ModelError::invalid(
                "kl",
                format!("layer {index} must be within [0, 1], got {}", params.kl),
            ));
        }

        let clay = params.clay / 100.0;
        let sand = params.sand / 100.0;

        let organic_matter = if overrides.organic_matter {
            required(params.organic_matter, "organic_matter", index)?
        } else {
            organic_matter_from_clay(clay)
        };
        let bulk_density = if overrides.bulk_density {
            required(params.bulk_density, "bulk_density", index)?
        } else {
            bulk_density(clay, sand, organic_matter)
        };
        let porosity = saturated_water_content(bulk_density);
        if porosity <= 0.0 {
            return Err(ModelError::NonPositivePorosity { layer: index, porosity });
        }

        let mut field_capacity = if overrides.field_capacity {
            required(params.field_capacity, "field_capacity", index)?
        } else {
            field_capacity_33kpa(clay, sand, organic_matter)
        };
        let mut wilting_point = if overrides.wilting_point {
            required(params.wilting_point, "wilting_point", index)?
        } else {
            wilting_point_1500kpa(clay, sand, organic_matter)
        };

        if wilting_point >= field_capacity {
            return Err(ModelError::WiltingPointNotBelowFieldCapacity {
                layer: index,
                wilting_point,
                field_capacity,
            });
        }
        let b = b_exponent(field_capacity, wilting_point)?;
        let retention = CampbellParams::new(
            porosity,
            air_entry_potential(field_capacity, porosity, b),
            b,
        );

        // Estimated limits are moved onto the fitted curve
        let field_capacity_potential = if overrides.field_capacity {
            retention.potential(field_capacity)?
        } else {
            let potential = field_capacity_potential_from_clay(clay);
            field_capacity = retention.content(potential)?;
            potential
        };
        if !overrides.wilting_point {
            wilting_point = retention.content(WILTING_POINT_POTENTIAL)?;
        }

        if wilting_point >= field_capacity {
            return Err(ModelError::WiltingPointNotBelowFieldCapacity {
                layer: index,
                wilting_point,
                field_capacity,
            });
        }
        if field_capacity >= porosity {
            return Err(ModelError::FieldCapacityNotBelowPorosity {
                layer: index,
                field_capacity,
                porosity,
            });
        }

        let water_content = wilting_point
            + params.initial_available_fraction * (field_capacity - wilting_point);
        let layer = SoilLayer {
            thickness: params.thickness,
            depth,
            clay,
            sand,
            organic_matter,
            bulk_density,
            retention,
            field_capacity,
            wilting_point,
            field_capacity_potential,
            wilting_point_potential: retention.potential(wilting_point)?,
            saturation_potential: retention.potential(porosity)?,
            kl: params.kl,
            initial_available_water: (water_content - wilting_point)
                * params.thickness
                * WATER_DENSITY,
            water_content,
            water_potential: retention.potential(water_content)?,
        };

        debug!(
            layer = index,
            porosity,
            field_capacity = layer.field_capacity,
            wilting_point = layer.wilting_point,
            b,
            air_entry = layer.retention.air_entry_potential,
            "derived layer hydraulics"
        );
        Ok(layer)
    }

    pub fn porosity(&self) -> f64 {
        self.retention.porosity
    }

    pub fn water_content(&self) -> f64 {
        self.water_content
    }

    pub fn water_potential(&self) -> f64 {
        self.water_potential
    }

    // Plant available water capacity [m3/m3]
    pub fn available_capacity(&self) -> f64 {
        self.field_capacity - self.wilting_point
    }

    // Water above the wilting point held in the layer [mm]
    pub fn available_water(&self, water_density: f64) -> f64 {
        (self.water_content - self.wilting_point) * self.thickness * water_density
    }
}

fn required(value: Option<f64>, name: &str, layer: usize) -> Result<f64, ModelError> {
    value.ok_or_else(|| {
        ModelError::invalid(name, format!("layer {layer} is marked as manual but has no value"))
    })
}

// Layered soil profile owned by a single scenario
#[derive(Debug, Clone)]
pub struct SoilProfile {
    layers: Vec<SoilLayer>,
    pub reference_et: f64,  // Reference evapotranspiration [mm/day]
    pub water_density: f64, // [kg/m3]
}

impl SoilProfile {
    /// Builds the profile from per-layer records.
    ///
    /// Field capacity, wilting point, `b` and air entry potential come from the
    /// records when overridden and from the pedotransfer functions otherwise.
    /// Each layer starts at `wilting_point + fraction * (field_capacity - wilting_point)`.
    pub fn initialize(
        params: &[LayerParams],
        overrides: Overrides,
        reference_et: f64,
    ) -> Result<Self, ModelError> {
        if params.is_empty() {
            return Err(ModelError::invalid("layers", "a soil profile needs at least one layer"));
        }

        let mut depth = 0.0;
        let mut layers = Vec::with_capacity(params.len());
        for (index, layer) in params.iter().enumerate() {
            depth += layer.thickness;
            let layer_depth = layer.cum_depth.unwrap_or(depth);
            layers.push(SoilLayer::from_params(index, layer, layer_depth, overrides)?);
        }

        Ok(SoilProfile {
            layers,
            reference_et,
            water_density: WATER_DENSITY,
        })
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn layers(&self) -> &[SoilLayer] {
        &self.layers
    }

    pub fn thicknesses(&self) -> DVector<f64> {
        DVector::from_iterator(self.len(), self.layers.iter().map(|l| l.thickness))
    }

    pub fn water_contents(&self) -> DVector<f64> {
        DVector::from_iterator(self.len(), self.layers.iter().map(|l| l.water_content))
    }

    pub fn water_potentials(&self) -> DVector<f64> {
        DVector::from_iterator(self.len(), self.layers.iter().map(|l| l.water_potential))
    }

    // Thickness weighted field capacity [m3/m3]
    pub fn mean_field_capacity(&self) -> f64 {
        let total: f64 = self.layers.iter().map(|l| l.thickness).sum();
        self.layers
            .iter()
            .map(|l| l.field_capacity * l.thickness)
            .sum::<f64>()
            / total
    }

    pub fn mean_field_capacity_potential(&self) -> f64 {
        self.layers.iter().map(|l| l.field_capacity_potential).sum::<f64>() / self.len() as f64
    }

    pub fn mean_wilting_point_potential(&self) -> f64 {
        self.layers.iter().map(|l| l.wilting_point_potential).sum::<f64>() / self.len() as f64
    }

    /// Removes the day's uptake [mm] from each layer and refreshes water potential.
    ///
    /// No clamping is applied; the uptake strategy bounds what it extracts.
    /// On error the profile is left untouched.
    pub fn advance(&mut self, uptake: &DVector<f64>) -> Result<(), ModelError> {
        if uptake.len() != self.len() {
            return Err(ModelError::LayerCountMismatch {
                expected: self.len(),
                found: uptake.len(),
            });
        }

        let mut updated = Vec::with_capacity(self.len());
        for (layer, extracted) in self.layers.iter().zip(uptake.iter()) {
            let content = layer.water_content - extracted / (layer.thickness * self.water_density);
            updated.push((content, layer.retention.potential(content)?));
        }

        for (layer, (content, potential)) in self.layers.iter_mut().zip(updated) {
            layer.water_content = content;
            layer.water_potential = potential;
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    // Manual layer with porosity 0.5 (bulk density 1.325), fc 0.30 and pwp 0.10
    pub(crate) fn manual_layer(thickness: f64, kl: f64, root_fraction: f64) -> LayerParams {
        LayerParams {
            thickness,
            cum_depth: None,
            clay: 20.0,
            sand: 40.0,
            organic_matter: Some(2.0),
            bulk_density: Some(1.325),
            field_capacity: Some(0.30),
            wilting_point: Some(0.10),
            root_density: 5000.0,
            root_fraction,
            kl,
            initial_available_fraction: 1.0,
        }
    }

    pub(crate) fn two_layer_profile() -> SoilProfile {
        let layers = vec![manual_layer(0.1, 0.05, 0.6), manual_layer(0.2, 0.03, 0.4)];
        SoilProfile::initialize(&layers, Overrides::all(), 5.0).unwrap()
    }

    #[test]
    fn manual_layers_keep_their_limits() {
        let profile = two_layer_profile();
        let top = &profile.layers()[0];
        assert_relative_eq!(top.porosity(), 0.5, epsilon = 1e-12);
        assert_relative_eq!(top.field_capacity, 0.30);
        assert_relative_eq!(top.wilting_point, 0.10);
        assert_relative_eq!(top.water_content(), 0.30);
        assert_abs_diff_eq!(top.field_capacity_potential, -33.0, epsilon = 1e-9);
        assert_relative_eq!(top.initial_available_water, 20.0, epsilon = 1e-9);
        assert_relative_eq!(top.saturation_potential, top.retention.air_entry_potential);
        assert_relative_eq!(profile.layers()[1].depth, 0.3, epsilon = 1e-12);
    }

    #[test]
    fn initial_content_interpolates_available_water() {
        let mut layer = manual_layer(0.2, 0.03, 1.0);
        layer.initial_available_fraction = 0.25;
        let profile = SoilProfile::initialize(&[layer], Overrides::all(), 5.0).unwrap();
        assert_relative_eq!(profile.layers()[0].water_content(), 0.15, epsilon = 1e-12);
        assert!(profile.layers()[0].water_potential() < 0.0);
    }

    #[test]
    fn texture_estimates_stay_ordered() {
        let layer = LayerParams {
            thickness: 0.2,
            cum_depth: Some(0.2),
            clay: 3.0,
            sand: 92.0,
            organic_matter: None,
            bulk_density: None,
            field_capacity: None,
            wilting_point: None,
            root_density: 0.0,
            root_fraction: 0.0,
            kl: 0.0,
            initial_available_fraction: 0.5,
        };
        let profile = SoilProfile::initialize(&[layer], Overrides::default(), 5.0).unwrap();
        let l = &profile.layers()[0];
        assert_abs_diff_eq!(l.organic_matter, 1.906, epsilon = 1e-9);
        assert!(l.wilting_point < l.field_capacity);
        assert!(l.field_capacity < l.porosity());
        assert_abs_diff_eq!(l.wilting_point_potential, -1500.0, epsilon = 1e-6);
        assert_abs_diff_eq!(l.field_capacity_potential, -0.35088 * 3.0 - 28.947, epsilon = 1e-9);
    }

    #[test]
    fn rejects_inverted_limits() {
        let mut layer = manual_layer(0.1, 0.05, 1.0);
        layer.wilting_point = Some(0.35);
        let err = SoilProfile::initialize(&[layer], Overrides::all(), 5.0).unwrap_err();
        assert!(matches!(err, ModelError::WiltingPointNotBelowFieldCapacity { layer: 0, .. }));

        let mut layer = manual_layer(0.1, 0.05, 1.0);
        layer.wilting_point = Some(0.30);
        assert!(SoilProfile::initialize(&[layer], Overrides::all(), 5.0).is_err());
    }

    #[test]
    fn rejects_non_positive_porosity() {
        let mut layer = manual_layer(0.1, 0.05, 1.0);
        layer.bulk_density = Some(2.8);
        let err = SoilProfile::initialize(&[layer], Overrides::all(), 5.0).unwrap_err();
        assert!(matches!(err, ModelError::NonPositivePorosity { .. }));
        assert!(err.is_configuration());
    }

    #[test]
    fn rejects_extraction_rate_outside_unit_range() {
        for kl in [1.5, -0.05] {
            let layer = manual_layer(0.1, kl, 1.0);
            let err = SoilProfile::initialize(&[layer], Overrides::all(), 5.0).unwrap_err();
            assert!(matches!(err, ModelError::InvalidParameter { ref name, .. } if name == "kl"));
        }
        let full = manual_layer(0.1, 1.0, 1.0);
        assert!(SoilProfile::initialize(&[full], Overrides::all(), 5.0).is_ok());
    }

    #[test]
    fn rejects_missing_manual_value() {
        let mut layer = manual_layer(0.1, 0.05, 1.0);
        layer.field_capacity = None;
        assert!(SoilProfile::initialize(&[layer], Overrides::all(), 5.0).is_err());
    }

    #[test]
    fn advance_removes_uptake() {
        let mut profile = two_layer_profile();
        let before = profile.water_potentials();
        profile.advance(&DVector::from_vec(vec![2.0, 4.0])).unwrap();

        // 2 mm out of a 0.1 m layer is 0.02 m3/m3
        assert_relative_eq!(profile.layers()[0].water_content(), 0.28, epsilon = 1e-12);
        assert_relative_eq!(profile.layers()[1].water_content(), 0.28, epsilon = 1e-12);
        assert!(profile.water_potentials()[0] < before[0]);
    }

    #[test]
    fn advance_leaves_state_on_error() {
        let mut profile = two_layer_profile();
        assert!(profile.advance(&DVector::from_vec(vec![1.0])).is_err());

        // Draining layer 2 below zero content is a domain error
        let err = profile.advance(&DVector::from_vec(vec![1.0, 100.0])).unwrap_err();
        assert!(!err.is_configuration());
        assert_relative_eq!(profile.layers()[0].water_content(), 0.30);
    }

    #[test]
    fn profile_means() {
        let profile = two_layer_profile();
        assert_relative_eq!(profile.mean_field_capacity(), 0.30, epsilon = 1e-12);
        assert_abs_diff_eq!(profile.mean_field_capacity_potential(), -33.0, epsilon = 1e-9);
        assert!(profile.mean_wilting_point_potential() < -33.0);
    }
}
