use thiserror::Error;

// Errors raised while building or stepping a water uptake scenario
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("layer {layer}: wilting point {wilting_point} must be less than field capacity {field_capacity}")]
    WiltingPointNotBelowFieldCapacity {
        layer: usize,
        wilting_point: f64,
        field_capacity: f64,
    },

    #[error("layer {layer}: field capacity {field_capacity} must be less than porosity {porosity}")]
    FieldCapacityNotBelowPorosity {
        layer: usize,
        field_capacity: f64,
        porosity: f64,
    },

    #[error("layer {layer}: porosity must be positive, got {porosity}")]
    NonPositivePorosity { layer: usize, porosity: f64 },

    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("expected {expected} layer values, got {found}")]
    LayerCountMismatch { expected: usize, found: usize },

    #[error("invalid simulation horizon: {0}")]
    InvalidHorizon(String),

    #[error("{operation} is undefined for {value}")]
    Domain { operation: &'static str, value: f64 },

    #[error("{model} requires positive potential transpiration, got {potential}")]
    NonPositiveDemand { model: &'static str, potential: f64 },
}

impl ModelError {
    /// Configuration errors abort a scenario before its first day.
    pub fn is_configuration(&self) -> bool {
        !matches!(
            self,
            ModelError::Domain { .. } | ModelError::NonPositiveDemand { .. }
        )
    }

    pub(crate) fn invalid(name: &str, reason: impl Into<String>) -> Self {
        ModelError::InvalidParameter {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

// Errors raised while loading a scenario file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read scenario file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse scenario TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error(transparent)]
    Model(#[from] ModelError),
}
