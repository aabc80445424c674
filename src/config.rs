use ::config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::errors::{Result, SimError};
use crate::sim::integrator::Tolerances;

// ---------------------------------------------------------------------------
// Simulation settings
// ---------------------------------------------------------------------------

/// Fixed run settings. Everything the form does not ask for lives here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    pub mass: f64,           // kg
    pub t_max: f64,          // s, span is [0, t_max]
    pub n_points: usize,     // samples on the output grid
    pub initial_height: f64, // m, used by the energy view
    pub rtol: f64,
    pub atol: f64,
    pub max_steps: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            mass: 1.0,
            t_max: 100.0,
            n_points: 1000,
            initial_height: 100.0,
            rtol: 1e-6,
            atol: 1e-9,
            max_steps: 100_000,
        }
    }
}

impl SimConfig {
    const CONFIG_FILENAME: &'static str = "freefall";
    const ENV_PREFIX: &'static str = "FREEFALL";

    /// Defaults, then `freefall.toml` in the working directory if present,
    /// then `FREEFALL_*` environment variables.
    pub fn load() -> Result<Self> {
        let defaults = SimConfig::default();
        let settings = Config::builder()
            .set_default("mass", defaults.mass)?
            .set_default("t_max", defaults.t_max)?
            .set_default("n_points", defaults.n_points as u64)?
            .set_default("initial_height", defaults.initial_height)?
            .set_default("rtol", defaults.rtol)?
            .set_default("atol", defaults.atol)?
            .set_default("max_steps", defaults.max_steps as u64)?
            .add_source(File::with_name(Self::CONFIG_FILENAME).required(false))
            .add_source(Environment::with_prefix(Self::ENV_PREFIX).try_parsing(true))
            .build()?;

        let loaded: SimConfig = settings.try_deserialize()?;
        loaded.validate()?;
        if loaded != defaults {
            info!(?loaded, "using non-default simulation settings");
        }
        Ok(loaded)
    }

    /// Like [`SimConfig::load`], but falls back to defaults on any error.
    pub fn load_or_default() -> Self {
        SimConfig::load().unwrap_or_else(|e| {
            warn!("Failed to load settings, using defaults. {}", e);
            SimConfig::default()
        })
    }

    pub fn validate(&self) -> Result<()> {
        let positive = |name: &str, v: f64| {
            if v.is_finite() && v > 0.0 {
                Ok(())
            } else {
                Err(SimError::InvalidConfig(format!("{} must be positive, got {}", name, v)))
            }
        };
        positive("mass", self.mass)?;
        positive("t_max", self.t_max)?;
        positive("rtol", self.rtol)?;
        positive("atol", self.atol)?;
        if self.n_points < 2 {
            return Err(SimError::InvalidConfig(format!(
                "n_points must be at least 2, got {}",
                self.n_points
            )));
        }
        if self.max_steps == 0 {
            return Err(SimError::InvalidConfig("max_steps must be non-zero".into()));
        }
        if !self.initial_height.is_finite() {
            return Err(SimError::InvalidConfig("initial_height must be finite".into()));
        }
        Ok(())
    }

    pub fn tolerances(&self) -> Tolerances {
        Tolerances::new(self.rtol, self.atol)
    }
}
