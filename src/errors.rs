use thiserror::Error;

use crate::physics::cities;
use crate::sim::integrator::IntegrationError;

/// Everything that can go wrong between reading the form and drawing a plot.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("Cross-sectional area must be a positive number (got {0:?})")]
    InvalidArea(String),

    #[error("Unknown city {0:?}: no air density on record")]
    UnknownCity(String),

    #[error("Unknown drag model {0:?}: expected \"linear\" or \"quadratic\"")]
    UnknownModel(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Integration failed: {0}")]
    Integration(#[from] IntegrationError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Settings error: {0}")]
    Config(#[from] ::config::ConfigError),
}

impl SimError {
    /// True for errors caused by what the user typed, as opposed to failures
    /// during model setup or integration.
    pub fn is_input_error(&self) -> bool {
        matches!(self, SimError::InvalidArea(_))
    }

    /// Dialog title for this error category.
    pub fn title(&self) -> &'static str {
        if self.is_input_error() {
            "Input error"
        } else {
            "Simulation error"
        }
    }

    /// Follow-up line for the command-line report, if the error has one.
    pub fn hint(&self) -> Option<String> {
        match self {
            SimError::UnknownCity(_) => Some(format!(
                "Known cities: {}",
                cities().collect::<Vec<_>>().join(", ")
            )),
            SimError::Integration(IntegrationError::TooManySteps { .. }) => Some(
                "Raise max_steps (FREEFALL_MAX_STEPS) for very large areas or small masses".into(),
            ),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, SimError>;
